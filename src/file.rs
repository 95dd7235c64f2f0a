//! Stdio-like compressed file API.
//!
//! A [`File`] wraps an underlying handle and an internal stream (created
//! lazily on first use): reading always decompresses, writing always
//! compresses, and the two cannot be mixed on one file.  Operations lock
//! internally; [`File::lock`] hands out a guard exposing the same
//! operations so several calls can be grouped atomically.  The first
//! failure is sticky — it is cached and returned by every later call.

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::codec::Codec;
use crate::options::Options;
use crate::status::{Error, Result, Status};
use crate::stream::{Direction, Operation, Stream, StreamState};

/// Staging-buffer size for handle I/O.
const FILE_BUF_SIZE: usize = 64 * 1024;

enum Handle {
    Reader(Box<dyn Read + Send>),
    Writer(Box<dyn Write + Send>),
}

struct FileInner {
    codec: &'static Codec,
    options: Option<Options>,
    handle: Handle,
    stream: Option<Stream>,
    error: Option<Error>,
    eof: bool,
    /// Compressed staging: source bytes on the read side, produced bytes on
    /// the write side.
    buf: Vec<u8>,
    buf_pos: usize,
    buf_len: usize,
    /// Read side: the handle is exhausted and the stream is being finished.
    finishing: bool,
    closed: bool,
}

/// A compressed file (or file-like handle).
pub struct File {
    inner: Mutex<FileInner>,
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File").finish_non_exhaustive()
    }
}

impl File {
    /// Open a file at `path`.  Mode `"r"` reads (decompresses), `"w"`
    /// creates and writes (compresses); a `b` suffix is accepted and
    /// ignored.
    pub fn open(
        codec: &'static Codec,
        path: impl AsRef<Path>,
        mode: &str,
        options: Option<Options>,
    ) -> Result<File> {
        codec.implementation()?;
        let handle = match mode {
            "r" | "rb" => Handle::Reader(Box::new(std::fs::File::open(path)?)),
            "w" | "wb" => Handle::Writer(Box::new(std::fs::File::create(path)?)),
            _ => return Err(Error::BadParam),
        };
        Ok(File::with_handle(codec, handle, options))
    }

    /// Adopt an existing reader; [`File::read`] decompresses from it.
    pub fn from_reader<R: Read + Send + 'static>(
        codec: &'static Codec,
        reader: R,
        options: Option<Options>,
    ) -> Result<File> {
        codec.implementation()?;
        Ok(File::with_handle(codec, Handle::Reader(Box::new(reader)), options))
    }

    /// Adopt an existing writer; [`File::write`] compresses into it.
    pub fn from_writer<W: Write + Send + 'static>(
        codec: &'static Codec,
        writer: W,
        options: Option<Options>,
    ) -> Result<File> {
        codec.implementation()?;
        Ok(File::with_handle(codec, Handle::Writer(Box::new(writer)), options))
    }

    fn with_handle(codec: &'static Codec, handle: Handle, options: Option<Options>) -> File {
        File {
            inner: Mutex::new(FileInner {
                codec,
                options,
                handle,
                stream: None,
                error: None,
                eof: false,
                buf: vec![0u8; FILE_BUF_SIZE],
                buf_pos: 0,
                buf_len: 0,
                finishing: false,
                closed: false,
            }),
        }
    }

    fn guard(&self) -> MutexGuard<'_, FileInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Acquire the file lock, returning a guard that exposes the same
    /// operations.  Use it to group several calls atomically.
    pub fn lock(&self) -> FileLock<'_> {
        FileLock(self.guard())
    }

    /// Read (decompress) up to `out.len()` bytes.  Returns the number of
    /// decompressed bytes written; `0` at end of stream.
    ///
    /// The number of compressed bytes consumed from the handle may be
    /// significantly more, or less, than the amount returned.
    pub fn read(&self, out: &mut [u8]) -> Result<usize> {
        self.guard().read(out)
    }

    /// Write (compress) all of `data`.  Output is typically buffered by the
    /// codec; use [`File::flush`] (flush-capable codecs only) or
    /// [`File::close`] to push it out.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.guard().write(data)
    }

    /// Flush buffered data through the codec and the underlying handle.
    /// Fails with [`Error::InvalidOperation`] on codecs that cannot flush.
    pub fn flush(&self) -> Result<()> {
        self.guard().flush()
    }

    /// Whether the end of the compressed stream has been reached.
    pub fn eof(&self) -> bool {
        self.guard().eof
    }

    /// The sticky failure, if any operation has failed.
    pub fn error(&self) -> Option<Error> {
        self.guard().error
    }

    /// Finish the stream and release the handle.  Preferred over dropping:
    /// finalization errors are reported instead of discarded.
    pub fn close(self) -> Result<()> {
        // Drop still runs afterwards; the closed flag makes it a no-op.
        self.guard().close()
    }
}

impl Drop for File {
    fn drop(&mut self) {
        // Best-effort finalization; errors are discarded, as with any Drop.
        let mut inner = self.guard();
        if !inner.closed {
            let _ = inner.close();
        }
    }
}

/// Guard over a locked [`File`], exposing the grouped operation set.
pub struct FileLock<'a>(MutexGuard<'a, FileInner>);

impl FileLock<'_> {
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        self.0.read(out)
    }

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.0.write(data)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.0.flush()
    }

    pub fn eof(&self) -> bool {
        self.0.eof
    }

    pub fn error(&self) -> Option<Error> {
        self.0.error
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inner operations
// ─────────────────────────────────────────────────────────────────────────────

impl FileInner {
    fn ensure_stream(&mut self, direction: Direction) -> Result<()> {
        match (&self.handle, direction) {
            (Handle::Reader(_), Direction::Compress) => return Err(Error::InvalidOperation),
            (Handle::Writer(_), Direction::Decompress) => return Err(Error::InvalidOperation),
            _ => {}
        }
        if self.stream.is_none() {
            self.stream = Some(Stream::new(self.codec, direction, self.options.clone())?);
        }
        Ok(())
    }

    fn fail(&mut self, e: Error) -> Error {
        self.error = Some(e);
        e
    }

    fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.ensure_stream(Direction::Decompress)?;

        let FileInner {
            handle,
            stream,
            buf,
            buf_pos,
            buf_len,
            finishing,
            eof,
            ..
        } = self;
        let stream = match stream.as_mut() {
            Some(s) => s,
            None => return Err(Error::Failed),
        };
        let reader = match handle {
            Handle::Reader(r) => r,
            Handle::Writer(_) => return Err(Error::InvalidOperation),
        };

        if stream.state() == StreamState::Finished {
            *eof = true;
            return Ok(0);
        }

        let mut out_pos = 0usize;
        let mut failure: Option<Error> = None;

        while out_pos < out.len() {
            if stream.state() == StreamState::Finished {
                *eof = true;
                break;
            }

            if *buf_pos == *buf_len && !*finishing {
                match reader.read(buf) {
                    Ok(n) => {
                        *buf_pos = 0;
                        *buf_len = n;
                        if n == 0 {
                            *finishing = true;
                        }
                    }
                    Err(_) => {
                        failure = Some(Error::Io);
                        break;
                    }
                }
            }

            let step = if *finishing {
                stream.finish(&[], &mut out[out_pos..])
            } else {
                stream.process(&buf[*buf_pos..*buf_len], &mut out[out_pos..])
            };
            let progress = match step {
                Ok(p) => p,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            *buf_pos += progress.bytes_read;
            out_pos += progress.bytes_written;

            match progress.status {
                Status::EndOfStream => {
                    *eof = true;
                    break;
                }
                Status::Ok if *finishing => {
                    *eof = true;
                    break;
                }
                _ => {}
            }
        }

        if let Some(e) = failure {
            return Err(self.fail(e));
        }
        Ok(out_pos)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.ensure_stream(Direction::Compress)?;
        self.drive_write(data, Operation::Process)
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.ensure_stream(Direction::Compress)?;
        self.drive_write(&[], Operation::Flush)?;
        if let Handle::Writer(w) = &mut self.handle {
            if w.flush().is_err() {
                return Err(self.fail(Error::Io));
            }
        }
        Ok(())
    }

    /// Run one compression operation over `data`, draining every produced
    /// block to the handle.
    fn drive_write(&mut self, data: &[u8], operation: Operation) -> Result<()> {
        let FileInner {
            handle,
            stream,
            buf,
            ..
        } = self;
        let stream = match stream.as_mut() {
            Some(s) => s,
            None => return Err(Error::Failed),
        };
        let writer = match handle {
            Handle::Writer(w) => w,
            Handle::Reader(_) => return Err(Error::InvalidOperation),
        };

        let mut in_pos = 0usize;
        let mut failure: Option<Error> = None;

        loop {
            let step = match operation {
                Operation::Process => stream.process(&data[in_pos..], buf),
                Operation::Flush => stream.flush(&data[in_pos..], buf),
                Operation::Finish => stream.finish(&data[in_pos..], buf),
                Operation::Terminate => Err(Error::InvalidOperation),
            };
            let progress = match step {
                Ok(p) => p,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            in_pos += progress.bytes_read;

            if progress.bytes_written != 0
                && writer.write_all(&buf[..progress.bytes_written]).is_err()
            {
                failure = Some(Error::Io);
                break;
            }

            if progress.status != Status::Processing {
                break;
            }
        }

        match failure {
            Some(e) => Err(self.fail(e)),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(e) = self.error {
            return Err(e);
        }

        // Compression streams carry buffered data until finished.  A file
        // that was never written still gets a (valid, empty) stream.
        if matches!(self.handle, Handle::Writer(_)) {
            self.ensure_stream(Direction::Compress)?;
            let needs_finish = self
                .stream
                .as_ref()
                .is_some_and(|s| s.state() != StreamState::Finished);
            if needs_finish {
                self.drive_write(&[], Operation::Finish)?;
            }
        }
        if let Handle::Writer(w) = &mut self.handle {
            if w.flush().is_err() {
                return Err(self.fail(Error::Io));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// std::io adapters
// ─────────────────────────────────────────────────────────────────────────────

/// A reading [`File`] is a `std::io::Read` over the decompressed bytes.
impl Read for &File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        File::read(self, buf).map_err(crate::status::to_io_error)
    }
}

/// A writing [`File`] is a `std::io::Write` over the uncompressed bytes.
impl Write for &File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        File::write(self, buf).map_err(crate::status::to_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        File::flush(self).map_err(crate::status::to_io_error)
    }
}
