//! The `brotli` plugin: splice-only.
//!
//! The backend exposes one-shot reader→writer entry points and nothing
//! else, which makes this the codec that exercises the splice→stream
//! bridge whenever a caller wants incremental behavior.

use std::io::{Read, Write};

use brotli::enc::backward_references::{BrotliEncoderMode, BrotliEncoderParams};

use crate::codec::{Codec, CodecImpl, CodecInfo};
use crate::options::{self, OptionInfo, OptionKind, OptionValue, Options};
use crate::plugin::PluginRegistration;
use crate::status::{from_io_error, Error, Result};
use crate::stream::Direction;

pub(crate) static REGISTRATION: PluginRegistration = PluginRegistration {
    name: "brotli",
    manifest: MANIFEST,
    init_codec,
};

const MANIFEST: &str = "\
license = MIT; BSD-3-Clause
[brotli]
extension = br
";

const OPT_QUALITY: usize = 0;
const OPT_WINDOW: usize = 1;
const OPT_MODE: usize = 2;

const MODE_GENERIC: i32 = 0;
const MODE_TEXT: i32 = 1;
const MODE_FONT: i32 = 2;

static OPTIONS: &[OptionInfo] = &[
    OptionInfo {
        name: "quality",
        kind: OptionKind::RangeInt {
            min: 0,
            max: 11,
            modulus: 0,
            allow_zero: true,
        },
        default: OptionValue::Int(6),
    },
    OptionInfo {
        name: "window",
        kind: OptionKind::RangeInt {
            min: 10,
            max: 24,
            modulus: 0,
            allow_zero: false,
        },
        default: OptionValue::Int(22),
    },
    OptionInfo {
        name: "mode",
        kind: OptionKind::EnumString {
            values: &[
                ("generic", MODE_GENERIC),
                ("text", MODE_TEXT),
                ("font", MODE_FONT),
            ],
        },
        default: OptionValue::Int(MODE_GENERIC),
    },
];

fn init_codec(codec: &Codec) -> Result<CodecImpl> {
    if codec.name() != "brotli" {
        return Err(Error::UnableToLoad);
    }
    let mut imp = CodecImpl::new(CodecInfo::NONE, max_compressed_size);
    imp.options = OPTIONS;
    imp.splice = Some(splice);
    Ok(imp)
}

fn max_compressed_size(_codec: &'static Codec, n: usize) -> usize {
    n + (n >> 2) + 10240
}

fn splice(
    codec: &'static Codec,
    opts: Option<&Options>,
    direction: Direction,
    src: &mut dyn Read,
    dst: &mut dyn Write,
) -> Result<()> {
    match direction {
        Direction::Compress => {
            let mut params = BrotliEncoderParams::default();
            params.quality = options::get_int_at(opts, codec, OPT_QUALITY);
            params.lgwin = options::get_int_at(opts, codec, OPT_WINDOW);
            params.mode = match options::get_int_at(opts, codec, OPT_MODE) {
                MODE_TEXT => BrotliEncoderMode::BROTLI_MODE_TEXT,
                MODE_FONT => BrotliEncoderMode::BROTLI_MODE_FONT,
                _ => BrotliEncoderMode::BROTLI_MODE_GENERIC,
            };
            brotli::BrotliCompress(&mut &mut *src, &mut &mut *dst, &params)
                .map(|_| ())
                .map_err(|e| from_io_error(&e))
        }
        Direction::Decompress => brotli::BrotliDecompress(&mut &mut *src, &mut &mut *dst)
            .map_err(|e| from_io_error(&e)),
    }
}
