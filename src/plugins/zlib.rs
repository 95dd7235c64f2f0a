//! The `zlib` plugin: `zlib` and `deflate` as native streams (with flush
//! support), `gzip` as a one-shot splice over the gzip wrapper types.

use std::io::{self, Read, Write};

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};

use crate::codec::{Codec, CodecImpl, CodecInfo};
use crate::options::{self, OptionInfo, OptionKind, OptionValue, Options};
use crate::plugin::PluginRegistration;
use crate::status::{from_io_error, Error, Result, Status};
use crate::stream::{Direction, IoWindow, NativeStream, Operation};

pub(crate) static REGISTRATION: PluginRegistration = PluginRegistration {
    name: "zlib",
    manifest: MANIFEST,
    init_codec,
};

const MANIFEST: &str = "\
license = Zlib
[zlib]
priority = 50
extension = zz
[deflate]
priority = 50
[gzip]
priority = 50
extension = gz
";

const OPT_LEVEL: usize = 0;

static OPTIONS: &[OptionInfo] = &[OptionInfo {
    name: "level",
    kind: OptionKind::RangeInt {
        min: 0,
        max: 9,
        modulus: 0,
        allow_zero: true,
    },
    default: OptionValue::Int(6),
}];

fn init_codec(codec: &Codec) -> Result<CodecImpl> {
    match codec.name() {
        "zlib" | "deflate" => {
            let mut imp = CodecImpl::new(
                CodecInfo::CAN_FLUSH | CodecInfo::NATIVE_STREAMING,
                max_compressed_size,
            );
            imp.options = OPTIONS;
            imp.create_stream = Some(create_stream);
            Ok(imp)
        }
        "gzip" => {
            let mut imp = CodecImpl::new(CodecInfo::NONE, gzip_max_compressed_size);
            imp.options = OPTIONS;
            imp.splice = Some(gzip_splice);
            Ok(imp)
        }
        _ => Err(Error::UnableToLoad),
    }
}

fn level(codec: &Codec, opts: Option<&Options>) -> Compression {
    Compression::new(options::get_int_at(opts, codec, OPT_LEVEL).clamp(0, 9) as u32)
}

fn max_compressed_size(_codec: &'static Codec, n: usize) -> usize {
    // deflateBound-style worst case plus the zlib wrapper.
    n + (n >> 12) + (n >> 14) + (n >> 25) + 13
}

fn gzip_max_compressed_size(codec: &'static Codec, n: usize) -> usize {
    max_compressed_size(codec, n) + 18
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming shape (zlib / deflate)
// ─────────────────────────────────────────────────────────────────────────────

enum ZlibState {
    Compress(Compress),
    Decompress(Decompress),
}

struct ZlibStream {
    state: ZlibState,
}

fn create_stream(
    codec: &'static Codec,
    direction: Direction,
    opts: Option<&Options>,
) -> Result<Box<dyn NativeStream>> {
    let zlib_header = codec.name() == "zlib";
    let state = match direction {
        Direction::Compress => ZlibState::Compress(Compress::new(level(codec, opts), zlib_header)),
        Direction::Decompress => ZlibState::Decompress(Decompress::new(zlib_header)),
    };
    Ok(Box::new(ZlibStream { state }))
}

impl NativeStream for ZlibStream {
    fn process(&mut self, io: &mut IoWindow<'_>, operation: Operation) -> Result<Status> {
        match &mut self.state {
            ZlibState::Compress(ctx) => {
                let flush = match operation {
                    Operation::Process => FlushCompress::None,
                    Operation::Flush => FlushCompress::Sync,
                    Operation::Finish => FlushCompress::Finish,
                    Operation::Terminate => return Ok(Status::Ok),
                };
                let in_before = ctx.total_in();
                let out_before = ctx.total_out();
                let (input, output) = io.input_output();
                let state = ctx
                    .compress(input, output, flush)
                    .map_err(|_| Error::Failed)?;
                io.consume((ctx.total_in() - in_before) as usize);
                io.produce((ctx.total_out() - out_before) as usize);

                Ok(match operation {
                    Operation::Finish => {
                        if state == flate2::Status::StreamEnd {
                            Status::Ok
                        } else {
                            Status::Processing
                        }
                    }
                    Operation::Flush => {
                        // A sync flush is complete once the backend stops
                        // while output space remains.
                        if io.avail_in() == 0 && io.avail_out() > 0 {
                            Status::Ok
                        } else {
                            Status::Processing
                        }
                    }
                    _ => {
                        if io.avail_in() == 0 {
                            Status::Ok
                        } else {
                            Status::Processing
                        }
                    }
                })
            }
            ZlibState::Decompress(ctx) => {
                let flush = match operation {
                    Operation::Finish => FlushDecompress::Finish,
                    _ => FlushDecompress::None,
                };
                let in_before = ctx.total_in();
                let out_before = ctx.total_out();
                let (input, output) = io.input_output();
                let state = ctx
                    .decompress(input, output, flush)
                    .map_err(|_| Error::InvalidBuffer)?;
                let consumed = (ctx.total_in() - in_before) as usize;
                let produced = (ctx.total_out() - out_before) as usize;
                io.consume(consumed);
                io.produce(produced);

                if state == flate2::Status::StreamEnd {
                    return Ok(Status::EndOfStream);
                }
                if io.avail_out() == 0 {
                    return Ok(Status::Processing);
                }
                if io.avail_in() == 0 {
                    // Finishing a stream that never reached its end marker
                    // means the input was truncated.
                    if operation == Operation::Finish && consumed == 0 && produced == 0 {
                        return Err(Error::BufferEmpty);
                    }
                    return Ok(Status::Ok);
                }
                Ok(Status::Processing)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Splice shape (gzip)
// ─────────────────────────────────────────────────────────────────────────────

fn gzip_splice(
    codec: &'static Codec,
    opts: Option<&Options>,
    direction: Direction,
    src: &mut dyn Read,
    dst: &mut dyn Write,
) -> Result<()> {
    match direction {
        Direction::Compress => {
            let mut encoder = flate2::read::GzEncoder::new(src, level(codec, opts));
            io::copy(&mut encoder, &mut &mut *dst)
                .map(|_| ())
                .map_err(|e| from_io_error(&e))
        }
        Direction::Decompress => {
            let mut decoder = flate2::read::GzDecoder::new(src);
            io::copy(&mut decoder, &mut &mut *dst)
                .map(|_| ())
                .map_err(|e| from_io_error(&e))
        }
    }
}
