//! The `store` plugin: identity transform through the buffer shape.
//!
//! Useful in its own right for containers that want uncompressed members,
//! and as the high-priority half of the two-plugin pair (with `relay`)
//! publishing the `store` codec name.

use crate::codec::{Codec, CodecImpl, CodecInfo};
use crate::options::Options;
use crate::plugin::PluginRegistration;
use crate::status::{Error, Result};

pub(crate) static REGISTRATION: PluginRegistration = PluginRegistration {
    name: "store",
    manifest: MANIFEST,
    init_codec,
};

const MANIFEST: &str = "\
license = MIT
[store]
priority = 60
extension = store
";

fn init_codec(codec: &Codec) -> Result<CodecImpl> {
    if codec.name() != "store" {
        return Err(Error::UnableToLoad);
    }
    let mut imp = CodecImpl::new(CodecInfo::KNOWS_UNCOMPRESSED_SIZE, max_compressed_size);
    imp.compress_buffer = Some(copy_buffer);
    imp.decompress_buffer = Some(copy_buffer);
    imp.get_uncompressed_size = Some(get_uncompressed_size);
    Ok(imp)
}

fn max_compressed_size(_codec: &'static Codec, n: usize) -> usize {
    n
}

fn get_uncompressed_size(_codec: &'static Codec, src: &[u8]) -> usize {
    src.len()
}

fn copy_buffer(
    _codec: &'static Codec,
    dst: &mut [u8],
    src: &[u8],
    _opts: Option<&Options>,
) -> Result<usize> {
    if dst.len() < src.len() {
        return Err(Error::BufferFull);
    }
    dst[..src.len()].copy_from_slice(src);
    Ok(src.len())
}
