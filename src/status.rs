//! Status and error codes shared by every surface of the library.
//!
//! Progress is reported through [`Status`]; failures through [`Error`].
//! Both carry stable integer codes: positive values indicate progress,
//! negative values indicate failure.  The split lets the rest of the crate
//! use `Result<Status>` and `?` while keeping the numeric contract intact
//! for embedders that need it.

use core::fmt;
use std::io;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

// ─────────────────────────────────────────────────────────────────────────────
// Status — progress codes (positive)
// ─────────────────────────────────────────────────────────────────────────────

/// Progress report from an operation that completed without failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    /// Operation completed.  For a stream call: all input was consumed.
    Ok = 1,
    /// Progress was made but the operation is not complete; present a fresh
    /// output window (or more input) and call again.
    Processing = 2,
    /// The producer is exhausted.  Decompression only; further calls on the
    /// same stream are a state error.
    EndOfStream = 3,
}

impl Status {
    /// Stable integer code for this status.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Processing => "PROCESSING",
            Status::EndOfStream => "END_OF_STREAM",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error — failure codes (negative)
// ─────────────────────────────────────────────────────────────────────────────

/// Failure report.  The first failure encountered at any layer is returned to
/// the caller unchanged; no layer retries or hides one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Error {
    /// Generic failure.
    Failed = -1,
    /// A plugin or codec could not be loaded or initialized.
    UnableToLoad = -2,
    /// An argument (such as an option key) was not recognized.
    BadParam = -3,
    /// An argument value was recognized but invalid.
    BadValue = -4,
    /// Memory could not be obtained.
    Memory = -5,
    /// The output buffer cannot hold the result.
    BufferFull = -6,
    /// The input buffer is empty or truncated.
    BufferEmpty = -7,
    /// The operation sequence was violated (e.g. process after finish).
    State = -8,
    /// The operation is not supported by this codec (e.g. flush without
    /// flush support).
    InvalidOperation = -9,
    /// The requested item does not exist.
    NotFound = -10,
    /// A buffer's contents are not what they were declared to be.
    InvalidBuffer = -11,
    /// An I/O operation on the underlying handle failed.
    Io = -12,
    /// A value was well-formed but outside the representable range.
    Range = -13,
}

impl Error {
    /// Stable integer code for this error.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Error::Failed => "FAILED",
            Error::UnableToLoad => "UNABLE_TO_LOAD",
            Error::BadParam => "BAD_PARAM",
            Error::BadValue => "BAD_VALUE",
            Error::Memory => "MEMORY",
            Error::BufferFull => "BUFFER_FULL",
            Error::BufferEmpty => "BUFFER_EMPTY",
            Error::State => "STATE",
            Error::InvalidOperation => "INVALID_OPERATION",
            Error::NotFound => "NOT_FOUND",
            Error::InvalidBuffer => "INVALID_BUFFER",
            Error::Io => "IO",
            Error::Range => "RANGE",
        }
    }

    /// Convert a raw integer code back to an [`Error`].  Returns `None` for
    /// non-error codes (zero and positive values included).
    pub fn from_code(code: i32) -> Option<Error> {
        match code {
            -1 => Some(Error::Failed),
            -2 => Some(Error::UnableToLoad),
            -3 => Some(Error::BadParam),
            -4 => Some(Error::BadValue),
            -5 => Some(Error::Memory),
            -6 => Some(Error::BufferFull),
            -7 => Some(Error::BufferEmpty),
            -8 => Some(Error::State),
            -9 => Some(Error::InvalidOperation),
            -10 => Some(Error::NotFound),
            -11 => Some(Error::InvalidBuffer),
            -12 => Some(Error::Io),
            -13 => Some(Error::Range),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(_: io::Error) -> Error {
        Error::Io
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// io::Error tunneling
//
// Plugin splice entry points use `std::io::Read`/`std::io::Write`, so crate
// errors crossing a plugin boundary ride inside an `io::Error` payload and
// are recovered on the way out.
// ─────────────────────────────────────────────────────────────────────────────

/// Wrap a crate error so it can travel through a plugin's `io` plumbing.
pub(crate) fn to_io_error(e: Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// Recover a crate error from an `io::Error`, walking the source chain.
/// Anything that did not originate in this crate maps to [`Error::Io`].
pub(crate) fn from_io_error(e: &io::Error) -> Error {
    let mut source: Option<&(dyn std::error::Error + 'static)> = e.get_ref().map(|r| r as _);
    while let Some(s) = source {
        if let Some(err) = s.downcast_ref::<Error>() {
            return *err;
        }
        source = s.source();
    }
    Error::Io
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Status::Ok.code(), 1);
        assert_eq!(Status::Processing.code(), 2);
        assert_eq!(Status::EndOfStream.code(), 3);
        assert_eq!(Error::Failed.code(), -1);
        assert_eq!(Error::BufferFull.code(), -6);
        assert_eq!(Error::State.code(), -8);
        assert_eq!(Error::Range.code(), -13);
    }

    #[test]
    fn from_code_round_trips() {
        for code in -13..=-1 {
            let e = Error::from_code(code).expect("every negative code maps");
            assert_eq!(e.code(), code);
        }
        assert!(Error::from_code(0).is_none());
        assert!(Error::from_code(1).is_none());
        assert!(Error::from_code(-14).is_none());
    }

    #[test]
    fn io_error_tunnel_round_trips() {
        let e = to_io_error(Error::BufferFull);
        assert_eq!(from_io_error(&e), Error::BufferFull);

        let plain = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        assert_eq!(from_io_error(&plain), Error::Io);
    }

    #[test]
    fn display_matches_names() {
        assert_eq!(Error::InvalidOperation.to_string(), "INVALID_OPERATION");
        assert_eq!(Status::EndOfStream.to_string(), "END_OF_STREAM");
    }
}
