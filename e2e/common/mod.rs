//! Shared helpers for the end-to-end suites.
#![allow(dead_code)]

use crimp::stream::Direction;
use crimp::{Codec, Status, Stream};

/// Every built-in codec name, covering all three backend kinds: native
/// streaming (zlib, deflate), buffer-only (lz4, zstd, store), and
/// splice-only (gzip, brotli).
pub const ALL_CODECS: &[&str] = &["zlib", "deflate", "gzip", "lz4", "zstd", "brotli", "store"];

/// One representative codec per backend kind, for the slower suites.
pub const SHAPE_CODECS: &[&str] = &["zlib", "store", "brotli"];

pub fn codec(name: &str) -> &'static Codec {
    crimp::get_codec(name).unwrap_or_else(|| panic!("codec {name} should be registered"))
}

/// Deterministic 2725 bytes of filler prose.
pub fn lorem() -> Vec<u8> {
    const BASE: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis \
nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute \
irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla \
pariatur. Excepteur sint occaecat cupidatat non proident, sunt in culpa qui officia \
deserunt mollit anim id est laborum. ";
    let out: Vec<u8> = BASE.bytes().cycle().take(2725).collect();
    assert_eq!(out.len(), 2725);
    out
}

/// Deterministic pseudo-random bytes (xorshift64*).
pub fn random_bytes(len: usize, mut seed: u64) -> Vec<u8> {
    seed = seed.wrapping_mul(2685821657736338717).max(1);
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        seed ^= seed >> 12;
        seed ^= seed << 25;
        seed ^= seed >> 27;
        let word = seed.wrapping_mul(2685821657736338717);
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.truncate(len);
    out
}

/// One-shot compress into a worst-case-sized buffer.
pub fn compress(codec: &'static Codec, input: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; codec.max_compressed_size(input.len()).expect("max size")];
    let n = codec
        .compress(&mut out, input, None)
        .unwrap_or_else(|e| panic!("{} compress failed: {e}", codec.name()));
    out.truncate(n);
    out
}

/// One-shot decompress into an exactly-sized buffer.
pub fn decompress(codec: &'static Codec, compressed: &[u8], expected_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; expected_len.max(1)];
    let n = codec
        .decompress(&mut out, compressed, None)
        .unwrap_or_else(|e| panic!("{} decompress failed: {e}", codec.name()));
    out.truncate(n);
    out
}

/// Drive a compression stream over `input` in windows of `chunk` bytes,
/// collecting the compressed output.
pub fn stream_compress(codec: &'static Codec, input: &[u8], chunk: usize) -> Vec<u8> {
    let mut stream = Stream::new(codec, Direction::Compress, None).expect("stream");
    let mut out = Vec::new();
    let mut tmp = [0u8; 256];

    for window in input.chunks(chunk.max(1)) {
        let mut pos = 0;
        loop {
            let p = stream.process(&window[pos..], &mut tmp).expect("process");
            pos += p.bytes_read;
            out.extend_from_slice(&tmp[..p.bytes_written]);
            if p.status != Status::Processing && pos == window.len() {
                break;
            }
        }
    }

    loop {
        let p = stream.finish(&[], &mut tmp).expect("finish");
        out.extend_from_slice(&tmp[..p.bytes_written]);
        if p.status != Status::Processing {
            break;
        }
    }

    out
}

/// Drive a decompression stream over `input` in windows of `chunk` bytes,
/// collecting the decompressed output.
pub fn stream_decompress(codec: &'static Codec, input: &[u8], chunk: usize) -> Vec<u8> {
    let mut stream = Stream::new(codec, Direction::Decompress, None).expect("stream");
    let mut out = Vec::new();
    let mut tmp = [0u8; 256];
    let mut ended = false;

    for window in input.chunks(chunk.max(1)) {
        let mut pos = 0;
        loop {
            let p = stream.process(&window[pos..], &mut tmp).expect("process");
            pos += p.bytes_read;
            out.extend_from_slice(&tmp[..p.bytes_written]);
            if p.status == Status::EndOfStream {
                ended = true;
                break;
            }
            if p.status != Status::Processing && pos == window.len() {
                break;
            }
        }
        if ended {
            break;
        }
    }

    if !ended {
        loop {
            let p = stream.finish(&[], &mut tmp).expect("finish");
            out.extend_from_slice(&tmp[..p.bytes_written]);
            if p.status != Status::Processing {
                break;
            }
        }
    }

    out
}
