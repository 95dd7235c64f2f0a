//! Incremental push streams and the stream state machine.
//!
//! A [`Stream`] accepts input and produces output one window at a time:
//! before each call the caller supplies the remaining input and a free
//! output slice, and the call reports a [`Status`] plus how much of each was
//! used.  Running totals are kept so callers can also detect progress by
//! differencing [`Stream::total_in`] / [`Stream::total_out`].
//!
//! The state machine accepts operations in escalating order — process,
//! flush, finish — and will internally *catch up*: a `finish` on a stream
//! that still has buffered input first runs the outstanding process (and a
//! flush step, skipped when the codec cannot flush) before the backend sees
//! the finish.  Once `Finished`, every further operation is a state error.
//!
//! Three backends satisfy the calls, depending on what the plugin provides:
//! a native streaming state, a worker-thread bridge over a one-shot splice
//! function, or whole-buffer accumulation over the buffer entry points.

mod bridge;
mod buffered;

use crate::codec::{Codec, CodecInfo};
use crate::options::Options;
use crate::status::{Error, Result, Status};

// ─────────────────────────────────────────────────────────────────────────────
// Public vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a stream (or splice) compresses or decompresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Compress,
    Decompress,
}

/// The operations the state machine understands, in escalation order.
///
/// `Terminate` is only ever delivered to a splice-bridge worker when its
/// stream is dropped mid-flight; plugins with other shapes never see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    Process = 1,
    Flush = 2,
    Finish = 3,
    Terminate = 4,
}

fn next_operation(op: Operation) -> Operation {
    match op {
        Operation::Process => Operation::Flush,
        Operation::Flush => Operation::Finish,
        Operation::Finish | Operation::Terminate => Operation::Terminate,
    }
}

/// Lifecycle state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StreamState {
    Idle,
    Running,
    Flushing,
    Finishing,
    /// Terminal: every further operation returns [`Error::State`].
    Finished,
}

/// Outcome of one stream call: the reported status plus how many bytes of
/// the supplied windows were consumed and produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub status: Status,
    pub bytes_read: usize,
    pub bytes_written: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// I/O window
// ─────────────────────────────────────────────────────────────────────────────

/// The per-call input/output window handed to stream backends.
///
/// Backends consume from the front of the input and produce into the front
/// of the output, advancing both cursors.
pub struct IoWindow<'io> {
    next_in: &'io [u8],
    next_out: &'io mut [u8],
    in_pos: usize,
    out_pos: usize,
}

impl<'io> IoWindow<'io> {
    pub fn new(next_in: &'io [u8], next_out: &'io mut [u8]) -> IoWindow<'io> {
        IoWindow {
            next_in,
            next_out,
            in_pos: 0,
            out_pos: 0,
        }
    }

    /// Bytes of input not yet consumed.
    #[inline]
    pub fn avail_in(&self) -> usize {
        self.next_in.len() - self.in_pos
    }

    /// Bytes of output space not yet produced into.
    #[inline]
    pub fn avail_out(&self) -> usize {
        self.next_out.len() - self.out_pos
    }

    /// The unconsumed input.
    #[inline]
    pub fn input(&self) -> &[u8] {
        &self.next_in[self.in_pos..]
    }

    /// Mark `n` bytes of input as consumed.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.avail_in());
        self.in_pos += n;
    }

    /// The free output space.
    #[inline]
    pub fn output(&mut self) -> &mut [u8] {
        &mut self.next_out[self.out_pos..]
    }

    /// The unconsumed input and free output space, borrowed simultaneously.
    #[inline]
    pub fn input_output(&mut self) -> (&[u8], &mut [u8]) {
        (&self.next_in[self.in_pos..], &mut self.next_out[self.out_pos..])
    }

    /// Mark `n` bytes of output as produced.
    #[inline]
    pub fn produce(&mut self, n: usize) {
        debug_assert!(n <= self.avail_out());
        self.out_pos += n;
    }

    /// Copy as much of `data` as fits into the output, returning the number
    /// of bytes copied.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.avail_out());
        self.next_out[self.out_pos..self.out_pos + n].copy_from_slice(&data[..n]);
        self.out_pos += n;
        n
    }

    /// Input bytes consumed so far in this call.
    #[inline]
    pub fn bytes_read(&self) -> usize {
        self.in_pos
    }

    /// Output bytes produced so far in this call.
    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.out_pos
    }
}

/// A plugin's native streaming state.
///
/// `process` consumes input from and produces output into `io`, honoring
/// `operation`, and reports progress:
/// [`Ok`](Status::Ok) when all input for this step is consumed (for
/// `Finish`, when the trailer is fully written),
/// [`Processing`](Status::Processing) when another call is needed, and
/// [`EndOfStream`](Status::EndOfStream) when a decompressed stream's end was
/// reached.
pub trait NativeStream: Send {
    fn process(&mut self, io: &mut IoWindow<'_>, operation: Operation) -> Result<Status>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream
// ─────────────────────────────────────────────────────────────────────────────

enum Backend {
    Native(Box<dyn NativeStream>),
    Bridge(bridge::SpliceBridge),
    Buffered(buffered::BufferedStream),
}

impl Backend {
    fn drive(&mut self, io: &mut IoWindow<'_>, operation: Operation) -> Result<Status> {
        match self {
            Backend::Native(s) => s.process(io, operation),
            Backend::Bridge(b) => b.exchange(operation, io),
            Backend::Buffered(b) => b.drive(io, operation),
        }
    }
}

/// An incremental compression or decompression stream.
pub struct Stream {
    codec: &'static Codec,
    direction: Direction,
    state: StreamState,
    total_in: usize,
    total_out: usize,
    backend: Backend,
    // Kept alive for the lifetime of the stream; backends hold their own
    // copy where they need one.
    #[allow(dead_code)]
    options: Option<Options>,
}

impl Stream {
    /// Create a stream over `codec`, synthesizing the streaming shape when
    /// the plugin provides only splice or buffer entry points.
    pub fn new(
        codec: &'static Codec,
        direction: Direction,
        options: Option<Options>,
    ) -> Result<Stream> {
        let imp = codec.implementation()?;

        let backend = if let Some(create) = imp.create_stream {
            Backend::Native(create(codec, direction, options.as_ref())?)
        } else if imp.splice.is_some() {
            Backend::Bridge(bridge::SpliceBridge::spawn(codec, direction, options.clone())?)
        } else if imp.compress_buffer.is_some()
            || imp.compress_buffer_unsafe.is_some()
            || imp.decompress_buffer.is_some()
        {
            Backend::Buffered(buffered::BufferedStream::new(
                codec,
                direction,
                options.clone(),
            ))
        } else {
            return Err(Error::UnableToLoad);
        };

        Ok(Stream {
            codec,
            direction,
            state: StreamState::Idle,
            total_in: 0,
            total_out: 0,
            backend,
            options,
        })
    }

    #[inline]
    pub fn codec(&self) -> &'static Codec {
        self.codec
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Total input bytes consumed over the stream's lifetime.
    #[inline]
    pub fn total_in(&self) -> usize {
        self.total_in
    }

    /// Total output bytes produced over the stream's lifetime.
    #[inline]
    pub fn total_out(&self) -> usize {
        self.total_out
    }

    /// Consume input and produce output.
    ///
    /// Returns [`Ok`](Status::Ok) when all supplied input was consumed,
    /// [`Processing`](Status::Processing) when the output window filled up
    /// first (present a fresh window and call again), and
    /// [`EndOfStream`](Status::EndOfStream) when decompression reached the
    /// end of the compressed stream.
    pub fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        self.process_internal(input, output, Operation::Process)
    }

    /// Push buffered data out of the backend without ending the stream.
    /// Fails with [`Error::InvalidOperation`] on codecs that cannot flush.
    pub fn flush(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        self.process_internal(input, output, Operation::Flush)
    }

    /// Finish the stream, draining any trailer the codec emits.  Call
    /// repeatedly while [`Processing`](Status::Processing) is reported.
    pub fn finish(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        self.process_internal(input, output, Operation::Finish)
    }

    fn process_internal(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        operation: Operation,
    ) -> Result<Progress> {
        let info = self.codec.implementation()?.info;

        // Flush is optional; refuse it up front on codecs that cannot.
        if operation == Operation::Flush && !info.contains(CodecInfo::CAN_FLUSH) {
            return Err(Error::InvalidOperation);
        }

        // An operation may not be issued once the stream has progressed past
        // its level.
        let violated = match operation {
            Operation::Process => self.state > StreamState::Running,
            Operation::Flush => self.state > StreamState::Flushing,
            Operation::Finish => self.state > StreamState::Finishing,
            Operation::Terminate => true,
        };
        if violated {
            return Err(Error::State);
        }

        // Catch-up start point: a stream mid-flush resumes flushing, a
        // stream mid-finish resumes finishing.
        let mut current = match self.state {
            StreamState::Idle | StreamState::Running => Operation::Process,
            StreamState::Flushing => Operation::Flush,
            StreamState::Finishing => Operation::Finish,
            StreamState::Finished => Operation::Terminate,
        };
        if current > operation {
            return Err(Error::State);
        }

        // Some backends refuse to run at all when handed no output space,
        // before finding out whether they would produce any.  Substitute a
        // one-byte window; if the byte is actually written the call fails
        // with BufferFull (unrecoverable for this window).
        let mut sentinel = [0u8; 1];
        let real_output = !output.is_empty();
        let out_window: &mut [u8] = if real_output { output } else { &mut sentinel };
        let mut io = IoWindow::new(input, out_window);

        let mut res = Status::Ok;
        while current <= operation {
            match current {
                Operation::Process => {
                    if io.avail_in() == 0 && self.state == StreamState::Idle {
                        res = Status::Ok;
                    } else {
                        self.state = StreamState::Running;
                        res = self.backend.drive(&mut io, current)?;
                    }
                    self.state = match res {
                        Status::Ok => StreamState::Idle,
                        Status::Processing => StreamState::Running,
                        Status::EndOfStream => StreamState::Finished,
                    };
                }
                Operation::Flush => {
                    self.state = StreamState::Flushing;
                    if current == operation {
                        if info.contains(CodecInfo::CAN_FLUSH) {
                            res = self.backend.drive(&mut io, current)?;
                        } else {
                            // Unreachable: refused above when requested
                            // directly, and an internal flush step never
                            // lands here with current == operation.
                            res = Status::Ok;
                        }
                    }
                    // An internal flush step on a non-flushable codec is
                    // skipped: res keeps the prior step's Ok.
                    self.state = match res {
                        Status::Ok => StreamState::Idle,
                        Status::Processing => StreamState::Flushing,
                        Status::EndOfStream => StreamState::Finished,
                    };
                }
                Operation::Finish => {
                    self.state = StreamState::Finishing;
                    res = self.backend.drive(&mut io, current)?;
                    // Backends should report Ok from a finish, but
                    // EndOfStream is an easy mistake to make.
                    if res == Status::EndOfStream {
                        res = Status::Ok;
                    }
                    self.state = match res {
                        Status::Ok => StreamState::Finished,
                        Status::Processing => StreamState::Finishing,
                        Status::EndOfStream => StreamState::Finished,
                    };
                }
                Operation::Terminate => break,
            }

            if !real_output && io.bytes_written() != 0 {
                self.total_in += io.bytes_read();
                return Err(Error::BufferFull);
            }

            if res == Status::Processing {
                break;
            } else if res == Status::EndOfStream
                || (current == Operation::Finish && res == Status::Ok)
            {
                break;
            } else {
                // Status::Ok on an intermediate step: escalate.
                current = next_operation(current);
            }
        }

        self.total_in += io.bytes_read();
        let bytes_written = if real_output { io.bytes_written() } else { 0 };
        self.total_out += bytes_written;

        Ok(Progress {
            status: res,
            bytes_read: io.bytes_read(),
            bytes_written,
        })
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("codec", &self.codec.name())
            .field("direction", &self.direction)
            .field("state", &self.state)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_escalation_order() {
        assert!(Operation::Process < Operation::Flush);
        assert!(Operation::Flush < Operation::Finish);
        assert!(Operation::Finish < Operation::Terminate);
        assert_eq!(next_operation(Operation::Process), Operation::Flush);
        assert_eq!(next_operation(Operation::Terminate), Operation::Terminate);
    }

    #[test]
    fn state_ordering_matches_levels() {
        assert!(StreamState::Idle < StreamState::Running);
        assert!(StreamState::Running < StreamState::Flushing);
        assert!(StreamState::Flushing < StreamState::Finishing);
        assert!(StreamState::Finishing < StreamState::Finished);
    }

    #[test]
    fn io_window_accounting() {
        let input = [1u8, 2, 3, 4];
        let mut out_buf = [0u8; 3];
        let mut io = IoWindow::new(&input, &mut out_buf);

        assert_eq!(io.avail_in(), 4);
        io.consume(3);
        assert_eq!(io.input(), &[4]);

        assert_eq!(io.write(&[9, 9, 9, 9]), 3);
        assert_eq!(io.avail_out(), 0);
        assert_eq!(io.bytes_read(), 3);
        assert_eq!(io.bytes_written(), 3);
    }
}
