//! Stream synthesis over buffer-only codecs.
//!
//! When a plugin provides nothing but one-shot buffer entry points, the
//! stream accumulates every input window; `process` is a cheap no-op beyond
//! the copy.  `finish` runs the whole-buffer conversion once and then drains
//! the result across successive calls, reporting `Processing` until the
//! caller has taken every byte.

use crate::buffer::Buffer;
use crate::codec::{Codec, CodecInfo};
use crate::options::Options;
use crate::status::{Result, Status};
use crate::stream::{Direction, IoWindow, Operation};

pub(crate) struct BufferedStream {
    codec: &'static Codec,
    direction: Direction,
    options: Option<Options>,
    input: Buffer,
    output: Option<Vec<u8>>,
    drained: usize,
}

impl BufferedStream {
    pub(crate) fn new(
        codec: &'static Codec,
        direction: Direction,
        options: Option<Options>,
    ) -> BufferedStream {
        BufferedStream {
            codec,
            direction,
            options,
            input: Buffer::new(),
            output: None,
            drained: 0,
        }
    }

    fn absorb(&mut self, io: &mut IoWindow<'_>) {
        let n = io.avail_in();
        if n != 0 {
            self.input.append(io.input());
            io.consume(n);
        }
    }

    fn convert(&mut self) -> Result<Vec<u8>> {
        let data = self.input.as_slice();
        match self.direction {
            Direction::Compress => {
                let worst = self.codec.max_compressed_size(data.len())?;
                let mut out = vec![0u8; worst];
                let n = self.codec.compress(&mut out, data, self.options.as_ref())?;
                out.truncate(n);
                Ok(out)
            }
            Direction::Decompress => {
                let imp = self.codec.implementation()?;
                if imp.info.contains(CodecInfo::KNOWS_UNCOMPRESSED_SIZE)
                    || imp.info.contains(CodecInfo::WRAP_SIZE)
                {
                    let size = self.codec.uncompressed_size(data)?;
                    let mut out = vec![0u8; size];
                    if size != 0 {
                        self.codec
                            .decompress(&mut out, data, self.options.as_ref())?;
                    }
                    Ok(out)
                } else {
                    self.codec
                        .decompress_to_buffer(data, self.options.as_ref())
                }
            }
        }
    }

    pub(crate) fn drive(&mut self, io: &mut IoWindow<'_>, operation: Operation) -> Result<Status> {
        match operation {
            Operation::Process | Operation::Flush => {
                self.absorb(io);
                Ok(Status::Ok)
            }
            Operation::Finish => {
                if self.output.is_none() {
                    self.absorb(io);
                    let out = self.convert()?;
                    self.input.clear();
                    self.output = Some(out);
                    self.drained = 0;
                }
                let out = match &self.output {
                    Some(out) => out,
                    None => return Ok(Status::Ok),
                };
                let n = io.write(&out[self.drained..]);
                self.drained += n;
                if self.drained < out.len() {
                    Ok(Status::Processing)
                } else {
                    Ok(Status::Ok)
                }
            }
            Operation::Terminate => Ok(Status::Ok),
        }
    }
}
