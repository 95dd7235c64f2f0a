//! The splice surface: compress or decompress from a source directly to a
//! sink.
//!
//! Three paths, cheapest first: a plugin's native splice entry point
//! (wrapped in byte-limit adapters when a limit is given), a synthesized
//! stream pumped through a bounded buffer, and finally whole-buffer
//! accumulation for plugins with nothing but buffer entry points.
//!
//! The `size` argument limits *input* bytes when compressing and *output*
//! bytes when decompressing; `0` means "everything".

use std::io::{self, Read, Write};

use crate::buffer::Buffer;
use crate::codec::{Codec, CodecInfo};
use crate::options::Options;
use crate::status::{from_io_error, to_io_error, Error, Result, Status};
use crate::stream::{Direction, Stream};

/// Chunk size for the bounded-buffer streaming path.
const SPLICE_BUF_SIZE: usize = 512;

/// Transfer between two handles (typically files).
pub fn splice<R: Read, W: Write>(
    codec: &'static Codec,
    direction: Direction,
    dst: &mut W,
    src: &mut R,
    size: usize,
    options: Option<&Options>,
) -> Result<()> {
    splice_custom(codec, direction, dst, src, size, options)
}

/// Transfer between caller-supplied source and sink callbacks.
pub fn splice_custom(
    codec: &'static Codec,
    direction: Direction,
    dst: &mut dyn Write,
    src: &mut dyn Read,
    size: usize,
    options: Option<&Options>,
) -> Result<()> {
    let imp = codec.implementation()?;

    if let Some(native) = imp.splice {
        if size == 0 {
            return native(codec, options, direction, src, dst);
        }
        match direction {
            Direction::Compress => {
                let mut limited = LimitedReader {
                    inner: src,
                    remaining: size,
                };
                native(codec, options, direction, &mut limited, dst)
            }
            Direction::Decompress => {
                let mut limited = LimitedWriter {
                    inner: dst,
                    remaining: size,
                    limit_hit: false,
                };
                let res = native(codec, options, direction, src, &mut limited);
                // Reaching the output limit aborts the plugin from inside
                // its writer; that is success, not failure.
                match res {
                    Err(_) if limited.limit_hit => Ok(()),
                    other => other,
                }
            }
        }
    } else if imp.create_stream.is_some() {
        splice_stream(codec, direction, dst, src, size, options)
    } else {
        splice_buffer(codec, direction, dst, src, size, options)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Byte-limit adapters for the native-splice path
// ─────────────────────────────────────────────────────────────────────────────

struct LimitedReader<'a> {
    inner: &'a mut dyn Read,
    remaining: usize,
}

impl Read for LimitedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let cap = buf.len().min(self.remaining);
        let n = self.inner.read(&mut buf[..cap])?;
        self.remaining -= n;
        Ok(n)
    }
}

struct LimitedWriter<'a> {
    inner: &'a mut dyn Write,
    remaining: usize,
    limit_hit: bool,
}

impl Write for LimitedWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            self.limit_hit = true;
            return Err(to_io_error(Error::BufferFull));
        }
        let cap = data.len().min(self.remaining);
        let n = self.inner.write(&data[..cap])?;
        self.remaining -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming path
// ─────────────────────────────────────────────────────────────────────────────

fn splice_stream(
    codec: &'static Codec,
    direction: Direction,
    dst: &mut dyn Write,
    src: &mut dyn Read,
    size: usize,
    options: Option<&Options>,
) -> Result<()> {
    let limit_input = direction == Direction::Compress && size != 0;
    let limit_output = direction == Direction::Decompress && size != 0;

    let mut stream = Stream::new(codec, direction, options.cloned())?;
    let mut in_buf = [0u8; SPLICE_BUF_SIZE];
    let mut out_buf = [0u8; SPLICE_BUF_SIZE];
    let mut eof = false;
    let mut done = false;

    while !done {
        let want = if limit_input {
            (size - stream.total_in()).min(SPLICE_BUF_SIZE)
        } else {
            SPLICE_BUF_SIZE
        };
        let filled = if want == 0 {
            0
        } else {
            src.read(&mut in_buf[..want]).map_err(|e| from_io_error(&e))?
        };
        if filled == 0 {
            eof = true;
        }
        let mut chunk_pos = 0usize;

        loop {
            let progress = if eof {
                stream.finish(&in_buf[chunk_pos..filled], &mut out_buf)?
            } else {
                stream.process(&in_buf[chunk_pos..filled], &mut out_buf)?
            };
            chunk_pos += progress.bytes_read;

            let mut produced = progress.bytes_written;
            if limit_output && stream.total_out() > size {
                let overrun = stream.total_out() - size;
                produced = produced.saturating_sub(overrun);
                done = true;
            }
            if produced != 0 {
                dst.write_all(&out_buf[..produced])
                    .map_err(|e| from_io_error(&e))?;
            }

            match progress.status {
                Status::Processing => {
                    if done {
                        break;
                    }
                }
                Status::Ok => {
                    if eof {
                        done = true;
                    }
                    break;
                }
                Status::EndOfStream => {
                    done = true;
                    break;
                }
            }
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Whole-buffer path
// ─────────────────────────────────────────────────────────────────────────────

fn splice_buffer(
    codec: &'static Codec,
    direction: Direction,
    dst: &mut dyn Write,
    src: &mut dyn Read,
    size: usize,
    options: Option<&Options>,
) -> Result<()> {
    let limit_input = direction == Direction::Compress && size != 0;
    let limit_output = direction == Direction::Decompress && size != 0;

    // Pull the entire source (or exactly `size` bytes when limiting input)
    // into memory.
    let mut buffer = Buffer::new();
    loop {
        let request = if limit_input {
            size - buffer.len()
        } else {
            SPLICE_BUF_SIZE
        };
        if request == 0 {
            break;
        }
        let old = buffer.len();
        buffer.set_len(old + request);
        let n = src
            .read(&mut buffer.as_mut_slice()[old..])
            .map_err(|e| from_io_error(&e))?;
        buffer.set_len(old + n);
        if n == 0 {
            break;
        }
    }
    let data = buffer.as_slice();

    let out: Vec<u8> = match direction {
        Direction::Compress => {
            let worst = codec.max_compressed_size(data.len())?;
            let mut v = vec![0u8; worst];
            let n = codec.compress(&mut v, data, options)?;
            v.truncate(n);
            v
        }
        Direction::Decompress => {
            let info = codec.info()?;
            if info.contains(CodecInfo::KNOWS_UNCOMPRESSED_SIZE)
                || info.contains(CodecInfo::WRAP_SIZE)
            {
                let out_size = codec.uncompressed_size(data)?;
                if out_size == 0 {
                    Vec::new()
                } else {
                    let mut v = vec![0u8; out_size];
                    codec.decompress(&mut v, data, options)?;
                    v
                }
            } else {
                codec.decompress_to_buffer(data, options)?
            }
        }
    };

    let out_slice = if limit_output && out.len() > size {
        &out[..size]
    } else {
        &out[..]
    };
    dst.write_all(out_slice).map_err(|e| from_io_error(&e))?;

    Ok(())
}
