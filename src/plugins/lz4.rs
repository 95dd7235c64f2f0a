//! The `lz4` plugin: raw LZ4 blocks through the buffer shape.
//!
//! Raw blocks do not record their decompressed length, so the codec opts
//! into the size wrap: the core prefixes compressed buffers with a varint
//! of the uncompressed length and strips it again before decompression.

use crate::codec::{Codec, CodecImpl, CodecInfo};
use crate::options::Options;
use crate::plugin::PluginRegistration;
use crate::status::{Error, Result};

pub(crate) static REGISTRATION: PluginRegistration = PluginRegistration {
    name: "lz4",
    manifest: MANIFEST,
    init_codec,
};

const MANIFEST: &str = "\
license = MIT
[lz4]
extension = lz4
";

fn init_codec(codec: &Codec) -> Result<CodecImpl> {
    if codec.name() != "lz4" {
        return Err(Error::UnableToLoad);
    }
    let mut imp = CodecImpl::new(
        CodecInfo::WRAP_SIZE | CodecInfo::KNOWS_UNCOMPRESSED_SIZE,
        max_compressed_size,
    );
    imp.compress_buffer = Some(compress_buffer);
    // The block encoder is bounds-checked either way, so it also satisfies
    // the worst-case-sized fast-path contract.
    imp.compress_buffer_unsafe = Some(compress_buffer);
    imp.decompress_buffer = Some(decompress_buffer);
    Ok(imp)
}

fn max_compressed_size(_codec: &'static Codec, n: usize) -> usize {
    lz4_flex::block::get_maximum_output_size(n)
}

fn compress_buffer(
    _codec: &'static Codec,
    dst: &mut [u8],
    src: &[u8],
    _opts: Option<&Options>,
) -> Result<usize> {
    lz4_flex::block::compress_into(src, dst).map_err(|_| Error::BufferFull)
}

fn decompress_buffer(
    _codec: &'static Codec,
    dst: &mut [u8],
    src: &[u8],
    _opts: Option<&Options>,
) -> Result<usize> {
    lz4_flex::block::decompress_into(src, dst).map_err(|e| match e {
        lz4_flex::block::DecompressError::OutputTooSmall { .. } => Error::BufferFull,
        _ => Error::InvalidBuffer,
    })
}
