//! The `zstd` plugin: one-shot buffer shape.  Zstandard frames carry the
//! content size in their header, so the codec reports decompressed sizes
//! without a core-managed wrap.

use crate::codec::{Codec, CodecImpl, CodecInfo};
use crate::options::{self, OptionInfo, OptionKind, OptionValue, Options};
use crate::plugin::PluginRegistration;
use crate::status::{Error, Result};

pub(crate) static REGISTRATION: PluginRegistration = PluginRegistration {
    name: "zstd",
    manifest: MANIFEST,
    init_codec,
};

const MANIFEST: &str = "\
license = BSD-3-Clause
[zstd]
priority = 55
extension = zst
";

const OPT_LEVEL: usize = 0;

static OPTIONS: &[OptionInfo] = &[OptionInfo {
    name: "level",
    kind: OptionKind::RangeInt {
        min: 1,
        max: 22,
        modulus: 0,
        allow_zero: true,
    },
    default: OptionValue::Int(3),
}];

fn init_codec(codec: &Codec) -> Result<CodecImpl> {
    if codec.name() != "zstd" {
        return Err(Error::UnableToLoad);
    }
    let mut imp = CodecImpl::new(CodecInfo::KNOWS_UNCOMPRESSED_SIZE, max_compressed_size);
    imp.options = OPTIONS;
    imp.compress_buffer = Some(compress_buffer);
    imp.decompress_buffer = Some(decompress_buffer);
    imp.get_uncompressed_size = Some(get_uncompressed_size);
    Ok(imp)
}

fn max_compressed_size(_codec: &'static Codec, n: usize) -> usize {
    zstd::zstd_safe::compress_bound(n)
}

fn compress_buffer(
    codec: &'static Codec,
    dst: &mut [u8],
    src: &[u8],
    opts: Option<&Options>,
) -> Result<usize> {
    let level = options::get_int_at(opts, codec, OPT_LEVEL);
    zstd::bulk::compress_to_buffer(src, dst, level).map_err(|_| Error::BufferFull)
}

fn decompress_buffer(
    _codec: &'static Codec,
    dst: &mut [u8],
    src: &[u8],
    _opts: Option<&Options>,
) -> Result<usize> {
    // Report an undersized destination as such before handing the buffer to
    // the backend, whose error does not distinguish the cause.
    if let Ok(Some(content_size)) = zstd::zstd_safe::get_frame_content_size(src) {
        if content_size > dst.len() as u64 {
            return Err(Error::BufferFull);
        }
    }
    zstd::bulk::decompress_to_buffer(src, dst).map_err(|_| Error::InvalidBuffer)
}

fn get_uncompressed_size(_codec: &'static Codec, src: &[u8]) -> usize {
    match zstd::zstd_safe::get_frame_content_size(src) {
        Ok(Some(n)) if n <= usize::MAX as u64 => n as usize,
        _ => 0,
    }
}
