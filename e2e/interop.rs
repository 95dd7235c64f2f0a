//! E2E: cross-plugin interop on one codec name.
//!
//! The `store` codec is published twice: by the `store` plugin (buffer
//! shape, priority 60) and by the `relay` plugin (splice shape, priority
//! 40).  Anything one of them compresses, the other must decompress, in
//! every shape.

mod common;

use common::{compress, decompress, lorem, stream_compress, stream_decompress};
use crimp::Codec;

fn providers() -> (&'static Codec, &'static Codec) {
    let preferred = crimp::get_codec("store").expect("store resolves");
    let shadowed = crimp::get_codec("relay:store").expect("relay:store resolves");
    assert_ne!(preferred.plugin_name(), shadowed.plugin_name());
    (preferred, shadowed)
}

#[test]
fn both_providers_emit_identical_bytes() {
    let input = lorem();
    let (a, b) = providers();
    assert_eq!(
        compress(a, &input),
        compress(b, &input),
        "the two store implementations must agree on the wire format"
    );
}

#[test]
fn one_shot_output_crosses_plugins() {
    let input = lorem();
    let (a, b) = providers();

    let packed_by_a = compress(a, &input);
    assert_eq!(decompress(b, &packed_by_a, input.len()), input);

    let packed_by_b = compress(b, &input);
    assert_eq!(decompress(a, &packed_by_b, input.len()), input);
}

#[test]
fn streamed_output_crosses_plugins() {
    let input = lorem();
    let (a, b) = providers();

    // a: buffered stream synthesis; b: splice-bridge synthesis.
    let packed_by_a = stream_compress(a, &input, 100);
    assert_eq!(stream_decompress(b, &packed_by_a, 64), input);

    let packed_by_b = stream_compress(b, &input, 100);
    assert_eq!(stream_decompress(a, &packed_by_b, 64), input);
}

#[test]
fn max_size_bounds_agree() {
    let (a, b) = providers();
    for len in [0usize, 1, 1000] {
        let bound_a = a.max_compressed_size(len).expect("max");
        let bound_b = b.max_compressed_size(len).expect("max");
        assert_eq!(bound_a, bound_b, "len {len}");
    }
}
