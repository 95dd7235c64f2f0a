//! E2E: one-shot buffer↔buffer operations across every built-in codec.
//!
//! Covers the round-trip and max-size laws over arbitrary inputs up to
//! 4 KiB, plus the concrete single-byte and 2725-byte-lorem scenarios,
//! for codecs spanning all three backend shapes.

mod common;

use common::{codec, compress, decompress, lorem, random_bytes, ALL_CODECS};
use crimp::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip law
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn round_trip_arbitrary_inputs() {
    for name in ALL_CODECS {
        let c = codec(name);
        for (len, seed) in [(0usize, 1u64), (1, 2), (17, 3), (512, 4), (4096, 5)] {
            let input = random_bytes(len, seed);
            let packed = compress(c, &input);
            let out = decompress(c, &packed, input.len());
            assert_eq!(out, input, "{name} round trip failed for len {len}");
        }
    }
}

#[test]
fn round_trip_compressible_input() {
    let input = lorem();
    for name in ALL_CODECS {
        let c = codec(name);
        let packed = compress(c, &input);
        let out = decompress(c, &packed, input.len());
        assert_eq!(out, input, "{name} lorem round trip failed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Max-size law
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn compressed_size_never_exceeds_max() {
    for name in ALL_CODECS {
        let c = codec(name);
        for len in [0usize, 1, 100, 4096] {
            let input = random_bytes(len, len as u64 + 7);
            let max = c.max_compressed_size(len).expect("max size");
            let packed = compress(c, &input);
            assert!(
                packed.len() <= max,
                "{name}: compressed {} bytes exceeds bound {max} for input {len}",
                packed.len()
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario: single byte
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn single_byte_round_trip() {
    for name in ALL_CODECS {
        let c = codec(name);
        let packed = compress(c, &[0x5A]);
        let out = decompress(c, &packed, 1);
        assert_eq!(out, [0x5A], "{name} single byte round trip failed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario: lorem into an exact and an undersized buffer
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn lorem_decompresses_into_exact_buffer() {
    let input = lorem();
    for name in ALL_CODECS {
        let c = codec(name);
        let packed = compress(c, &input);

        let mut out = vec![0u8; 2725];
        let n = c
            .decompress(&mut out, &packed, None)
            .unwrap_or_else(|e| panic!("{name}: exact-size decompress failed: {e}"));
        assert_eq!(n, 2725, "{name}: wrong decompressed size");
        assert_eq!(out, input, "{name}: decompressed bytes differ");
    }
}

#[test]
fn lorem_into_undersized_buffer_fails() {
    let input = lorem();
    for name in ALL_CODECS {
        let c = codec(name);
        let packed = compress(c, &input);

        let mut out = vec![0u8; 2724];
        let res = c.decompress(&mut out, &packed, None);
        assert!(
            res.is_err(),
            "{name}: decompress into a one-byte-short buffer must fail, got {res:?}"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Size queries and growing-buffer decompress
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn self_describing_codecs_report_uncompressed_size() {
    let input = lorem();
    for name in ["lz4", "zstd", "store"] {
        let c = codec(name);
        let packed = compress(c, &input);
        assert_eq!(
            c.uncompressed_size(&packed).expect("size query"),
            input.len(),
            "{name} reported a wrong uncompressed size"
        );
    }
}

#[test]
fn decompress_to_buffer_without_known_size() {
    let input = lorem();
    for name in ALL_CODECS {
        let c = codec(name);
        let packed = compress(c, &input);
        let out = c
            .decompress_to_buffer(&packed, None)
            .unwrap_or_else(|e| panic!("{name}: decompress_to_buffer failed: {e}"));
        assert_eq!(out, input, "{name}: growing decompress differs");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Degenerate buffers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn decompress_into_empty_buffer_is_invalid() {
    let c = codec("store");
    let packed = compress(c, b"abc");
    let mut out = [0u8; 0];
    assert_eq!(
        c.decompress(&mut out, &packed, None),
        Err(Error::InvalidBuffer)
    );
}

#[test]
fn compress_into_tiny_buffer_fails() {
    let input = lorem();
    for name in ALL_CODECS {
        let c = codec(name);
        let mut out = [0u8; 2];
        let res = c.compress(&mut out, &input, None);
        assert!(
            res.is_err(),
            "{name}: compressing 2725 bytes into 2 must fail, got {res:?}"
        );
    }
}
