//! E2E: the splice surface — custom source/sink callbacks, chunked reads,
//! and the input/output byte limits.

mod common;

use std::io::{self, Read, Write};

use common::{codec, compress, decompress, lorem, SHAPE_CODECS};
use crimp::splice_custom;
use crimp::stream::Direction;

/// A reader that serves at most `max_per_read` bytes per call and counts
/// what it hands out.
struct ChunkedReader<'a> {
    data: &'a [u8],
    pos: usize,
    max_per_read: usize,
}

impl<'a> ChunkedReader<'a> {
    fn new(data: &'a [u8], max_per_read: usize) -> ChunkedReader<'a> {
        ChunkedReader {
            data,
            pos: 0,
            max_per_read,
        }
    }

    fn consumed(&self) -> usize {
        self.pos
    }
}

impl Read for ChunkedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf
            .len()
            .min(self.max_per_read)
            .min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Splice equivalence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn chunked_splice_matches_oneshot_compress() {
    let input = lorem();
    for name in SHAPE_CODECS {
        let c = codec(name);
        let oneshot = compress(c, &input);

        for max_per_read in [1usize, 13, 600, 10_000] {
            let mut src = ChunkedReader::new(&input, max_per_read);
            let mut spliced = Vec::new();
            splice_custom(c, Direction::Compress, &mut spliced, &mut src, 0, None)
                .unwrap_or_else(|e| panic!("{name}: splice compress failed: {e}"));
            assert_eq!(src.consumed(), input.len(), "{name}: input not fully read");

            // Chunking the source must not change the compressed bytes.
            assert_eq!(
                spliced, oneshot,
                "{name}: splice output differs from one-shot at read size {max_per_read}"
            );
        }
    }
}

#[test]
fn splice_decompress_round_trip() {
    let input = lorem();
    for name in SHAPE_CODECS {
        let c = codec(name);
        let packed = compress(c, &input);

        let mut src = ChunkedReader::new(&packed, 37);
        let mut out = Vec::new();
        splice_custom(c, Direction::Decompress, &mut out, &mut src, 0, None)
            .unwrap_or_else(|e| panic!("{name}: splice decompress failed: {e}"));
        assert_eq!(out, input, "{name}: splice decompress differs");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario: byte limits
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn compress_limit_consumes_exactly_that_much_input() {
    let input = lorem();
    let limit = 777;

    for name in SHAPE_CODECS {
        let c = codec(name);
        let mut src = ChunkedReader::new(&input, 64);
        let mut packed = Vec::new();
        splice_custom(c, Direction::Compress, &mut packed, &mut src, limit, None)
            .unwrap_or_else(|e| panic!("{name}: limited splice compress failed: {e}"));
        assert_eq!(
            src.consumed(),
            limit,
            "{name}: limited compress must consume exactly the limit"
        );

        // What was produced is a complete stream over the first `limit`
        // bytes.
        let out = decompress(c, &packed, limit);
        assert_eq!(out, &input[..limit], "{name}: limited compress content differs");
    }
}

#[test]
fn decompress_limit_produces_exactly_that_much_output() {
    let input = lorem();
    let limit = 500;

    for name in SHAPE_CODECS {
        let c = codec(name);
        let packed = compress(c, &input);

        let mut src = ChunkedReader::new(&packed, 80);
        let mut out = Vec::new();
        splice_custom(c, Direction::Decompress, &mut out, &mut src, limit, None)
            .unwrap_or_else(|e| panic!("{name}: limited splice decompress failed: {e}"));
        assert_eq!(out.len(), limit, "{name}: limited decompress length");
        assert_eq!(out, &input[..limit], "{name}: limited decompress content");
    }
}

#[test]
fn decompress_limit_beyond_stream_end_stops_at_the_end() {
    let input = lorem();
    let c = codec("store");
    let packed = compress(c, &input);

    let mut src = ChunkedReader::new(&packed, 512);
    let mut out = Vec::new();
    splice_custom(c, Direction::Decompress, &mut out, &mut src, input.len() * 4, None)
        .expect("splice decompress");
    assert_eq!(out, input);
}

// ─────────────────────────────────────────────────────────────────────────────
// File-handle splice
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn splice_between_real_files() {
    let input = lorem();
    let dir = tempfile::tempdir().expect("tempdir");
    let plain = dir.path().join("plain");
    let packed = dir.path().join("packed");
    let restored = dir.path().join("restored");

    std::fs::write(&plain, &input).expect("write input");

    for name in SHAPE_CODECS {
        let c = codec(name);

        let mut src = std::fs::File::open(&plain).expect("open");
        let mut dst = std::fs::File::create(&packed).expect("create");
        crimp::splice(c, Direction::Compress, &mut dst, &mut src, 0, None)
            .unwrap_or_else(|e| panic!("{name}: file splice compress failed: {e}"));
        dst.flush().expect("flush");
        drop(dst);

        let mut src = std::fs::File::open(&packed).expect("open");
        let mut dst = std::fs::File::create(&restored).expect("create");
        crimp::splice(c, Direction::Decompress, &mut dst, &mut src, 0, None)
            .unwrap_or_else(|e| panic!("{name}: file splice decompress failed: {e}"));
        drop(dst);

        let round = std::fs::read(&restored).expect("read restored");
        assert_eq!(round, input, "{name}: file splice round trip differs");
    }
}
