//! E2E: mid-stream flush on a flush-capable codec.
//!
//! The midpoint scenario: compress a prefix, flush, and verify that what
//! has been produced so far already decodes to exactly the prefix; then
//! compress the remainder, finish, and verify the whole.

mod common;

use common::{codec, lorem, stream_decompress};
use crimp::stream::Direction;
use crimp::{Status, Stream};

fn pump(stream: &mut Stream, out: &mut Vec<u8>, mut step: impl FnMut(&mut Stream, &mut [u8]) -> crimp::Result<crimp::Progress>) {
    let mut tmp = [0u8; 512];
    loop {
        let p = step(stream, &mut tmp).expect("stream step");
        out.extend_from_slice(&tmp[..p.bytes_written]);
        if p.status != Status::Processing {
            break;
        }
    }
}

/// Decode a flushed-but-unfinished stream: process only, never finish (a
/// truncated stream cannot be finished).
fn decode_prefix(c: &'static crimp::Codec, data: &[u8]) -> Vec<u8> {
    let mut stream = Stream::new(c, Direction::Decompress, None).expect("stream");
    let mut out = Vec::new();
    let mut tmp = [0u8; 512];
    let mut pos = 0;
    loop {
        let p = stream.process(&data[pos..], &mut tmp).expect("process");
        pos += p.bytes_read;
        out.extend_from_slice(&tmp[..p.bytes_written]);
        if p.status != Status::Processing && pos == data.len() {
            break;
        }
        if p.status == Status::EndOfStream {
            break;
        }
    }
    out
}

#[test]
fn flush_midpoint_yields_a_decodable_prefix() {
    let input = lorem();
    let split = 1000;

    for name in ["zlib", "deflate"] {
        let c = codec(name);
        let mut stream = Stream::new(c, Direction::Compress, None).expect("stream");
        let mut produced = Vec::new();

        // Prefix, then flush.
        let mut pos = 0;
        pump(&mut stream, &mut produced, |s, tmp| {
            let p = s.process(&input[pos..split], tmp)?;
            pos += p.bytes_read;
            Ok(p)
        });
        assert_eq!(pos, split, "{name}: prefix not fully consumed");
        pump(&mut stream, &mut produced, |s, tmp| s.flush(&[], tmp));

        // Everything flushed so far must decode to exactly the prefix.
        let decoded = decode_prefix(c, &produced);
        assert_eq!(
            decoded,
            &input[..split],
            "{name}: flushed prefix does not decode to the prefix"
        );

        // Remainder, then finish; the whole stream must decode to the whole
        // input.
        let mut pos = split;
        pump(&mut stream, &mut produced, |s, tmp| {
            let p = s.process(&input[pos..], tmp)?;
            pos += p.bytes_read;
            Ok(p)
        });
        pump(&mut stream, &mut produced, |s, tmp| s.finish(&[], tmp));

        let decoded = stream_decompress(c, &produced, 128);
        assert_eq!(decoded, input, "{name}: final stream does not decode fully");
    }
}

#[test]
fn repeated_flushes_are_harmless() {
    let input = lorem();
    let c = codec("zlib");
    let mut stream = Stream::new(c, Direction::Compress, None).expect("stream");
    let mut produced = Vec::new();

    for window in input.chunks(500) {
        let mut pos = 0;
        pump(&mut stream, &mut produced, |s, tmp| {
            let p = s.process(&window[pos..], tmp)?;
            pos += p.bytes_read;
            Ok(p)
        });
        pump(&mut stream, &mut produced, |s, tmp| s.flush(&[], tmp));
    }
    pump(&mut stream, &mut produced, |s, tmp| s.finish(&[], tmp));

    let decoded = stream_decompress(c, &produced, 4096);
    assert_eq!(decoded, input);
}
