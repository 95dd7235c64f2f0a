//! Codec descriptors, the plugin-facing implementation table, and the
//! buffer↔buffer shape synthesis.
//!
//! A [`Codec`] is created while its plugin's manifest is parsed and interned
//! in the global context for the lifetime of the process.  Its
//! [`CodecImpl`] — the set of entry points the plugin actually provides — is
//! filled in lazily by a one-shot, mutex-serialized initialization.  The
//! one-shot buffer operations below work against *any* non-empty subset of
//! entry points: native buffer functions are used directly, a native splice
//! is driven over in-memory source/sink adapters, and as a last resort a
//! stream is synthesized and driven to completion.

use std::io::{self, Read, Write};
use std::sync::{Mutex, OnceLock};

use log::warn;

use crate::options::{OptionInfo, Options};
use crate::plugin::PluginRegistration;
use crate::status::{to_io_error, Error, Result, Status};
use crate::stream::{Direction, NativeStream, Stream};

// ─────────────────────────────────────────────────────────────────────────────
// Capability word
// ─────────────────────────────────────────────────────────────────────────────

/// Bitmask of codec capabilities, advertised by the plugin at init time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecInfo(u32);

impl CodecInfo {
    /// No capabilities.
    pub const NONE: CodecInfo = CodecInfo(0);
    /// The backend supports mid-stream flush.
    pub const CAN_FLUSH: CodecInfo = CodecInfo(1 << 0);
    /// The compressed stream self-describes its decompressed length.
    pub const KNOWS_UNCOMPRESSED_SIZE: CodecInfo = CodecInfo(1 << 1);
    /// The plugin has a true streaming implementation.
    pub const NATIVE_STREAMING: CodecInfo = CodecInfo(1 << 2);
    /// The core prefixes compressed data with a varint-encoded uncompressed
    /// length on the buffer path (and strips it on the way back).
    pub const WRAP_SIZE: CodecInfo = CodecInfo(1 << 3);
    /// Decompression is not safe on untrusted input.  Informational only.
    pub const DECOMPRESS_UNSAFE: CodecInfo = CodecInfo(1 << 4);

    #[inline]
    pub fn contains(self, other: CodecInfo) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for CodecInfo {
    type Output = CodecInfo;
    fn bitor(self, rhs: CodecInfo) -> CodecInfo {
        CodecInfo(self.0 | rhs.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Implementation table
// ─────────────────────────────────────────────────────────────────────────────

/// Create a native streaming state for one direction.
pub type CreateStreamFn =
    fn(&'static Codec, Direction, Option<&Options>) -> Result<Box<dyn NativeStream>>;

/// One-shot transfer from a source to a sink.  The function must consume the
/// source to end-of-stream (compress) or end-of-frame (decompress) and write
/// everything it produces before returning.
pub type SpliceFn = fn(
    &'static Codec,
    Option<&Options>,
    Direction,
    &mut dyn Read,
    &mut dyn Write,
) -> Result<()>;

/// One-shot buffer conversion.  Returns the number of bytes written to the
/// output slice.  Compression variants must honor the output slice length;
/// the `_unsafe` variant may instead assume the output is at least
/// `get_max_compressed_size` bytes.
pub type BufferFn = fn(&'static Codec, &mut [u8], &[u8], Option<&Options>) -> Result<usize>;

/// Peek the decompressed size from a compressed header; `0` when unknown.
pub type UncompressedSizeFn = fn(&'static Codec, &[u8]) -> usize;

/// Worst-case compressed size for the given input size.  Required.
pub type MaxCompressedSizeFn = fn(&'static Codec, usize) -> usize;

/// The set of entry points and capabilities one codec provides.
///
/// Plugins fill this out in their init entry point.  Any subset of the
/// optional entry points may be present, but at least one operation shape
/// must be.
pub struct CodecImpl {
    pub info: CodecInfo,
    /// Option schema; empty when the codec takes no options.
    pub options: &'static [OptionInfo],
    pub create_stream: Option<CreateStreamFn>,
    pub splice: Option<SpliceFn>,
    pub compress_buffer: Option<BufferFn>,
    pub compress_buffer_unsafe: Option<BufferFn>,
    pub decompress_buffer: Option<BufferFn>,
    pub get_uncompressed_size: Option<UncompressedSizeFn>,
    pub get_max_compressed_size: MaxCompressedSizeFn,
}

impl CodecImpl {
    /// A table with no optional entry points.  The plugin sets the fields for
    /// the shapes it supports.
    pub fn new(info: CodecInfo, get_max_compressed_size: MaxCompressedSizeFn) -> CodecImpl {
        CodecImpl {
            info,
            options: &[],
            create_stream: None,
            splice: None,
            compress_buffer: None,
            compress_buffer_unsafe: None,
            decompress_buffer: None,
            get_uncompressed_size: None,
            get_max_compressed_size,
        }
    }

    pub(crate) fn has_shape(&self) -> bool {
        self.create_stream.is_some()
            || self.splice.is_some()
            || self.compress_buffer.is_some()
            || self.compress_buffer_unsafe.is_some()
            || self.decompress_buffer.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec
// ─────────────────────────────────────────────────────────────────────────────

/// A named compression algorithm realization, owned by one plugin.
///
/// Codecs are interned in the global context and live for the process
/// lifetime; operational handles are `&'static Codec`.
pub struct Codec {
    name: String,
    priority: u32,
    extension: Option<String>,
    plugin_name: String,
    registration: Option<&'static PluginRegistration>,
    implementation: OnceLock<CodecImpl>,
}

/// Default codec priority when the manifest does not specify one.
pub const DEFAULT_PRIORITY: u32 = 50;

impl Codec {
    pub(crate) fn new(
        plugin_name: &str,
        name: &str,
        registration: Option<&'static PluginRegistration>,
    ) -> Codec {
        Codec {
            name: name.to_owned(),
            priority: DEFAULT_PRIORITY,
            extension: None,
            plugin_name: plugin_name.to_owned(),
            registration,
            implementation: OnceLock::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Name of the plugin that published this codec.
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub(crate) fn set_priority(&mut self, priority: u32) {
        self.priority = priority;
    }

    pub(crate) fn set_extension(&mut self, extension: &str) {
        self.extension = Some(extension.to_owned());
    }

    /// Whether this codec has completed its one-shot initialization.
    pub fn is_initialized(&self) -> bool {
        self.implementation.get().is_some()
    }

    /// The codec's implementation table, initializing it on first use.
    ///
    /// Initialization is serialized under a mutex and idempotent; a failed
    /// attempt is retried on the next call.
    pub fn implementation(&self) -> Result<&CodecImpl> {
        if let Some(imp) = self.implementation.get() {
            return Ok(imp);
        }

        static CODEC_INIT: Mutex<()> = Mutex::new(());
        let _guard = CODEC_INIT.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(imp) = self.implementation.get() {
            return Ok(imp);
        }

        let registration = match self.registration {
            Some(r) => r,
            None => {
                warn!(
                    "codec {}:{} has no registered plugin entry point",
                    self.plugin_name, self.name
                );
                return Err(Error::UnableToLoad);
            }
        };
        let imp = (registration.init_codec)(self)?;
        if !imp.has_shape() {
            warn!("plugin {} initialized codec {} with no entry points", self.plugin_name, self.name);
            return Err(Error::UnableToLoad);
        }
        Ok(self.implementation.get_or_init(|| imp))
    }

    /// Capability word.  Initializes the codec if necessary.
    pub fn info(&self) -> Result<CodecInfo> {
        Ok(self.implementation()?.info)
    }

    /// Option schema.  Initializes the codec if necessary.
    pub fn option_info(&self) -> Result<&'static [OptionInfo]> {
        Ok(self.implementation()?.options)
    }

    /// Create a stream over this codec, synthesizing the streaming shape if
    /// the plugin does not provide one natively.
    pub fn create_stream(
        &'static self,
        direction: Direction,
        options: Option<Options>,
    ) -> Result<Stream> {
        Stream::new(self, direction, options)
    }

    // ── size queries ─────────────────────────────────────────────────────────

    /// Worst-case compressed size for `uncompressed_size` bytes of input,
    /// including the varint prefix for size-wrapped codecs.
    pub fn max_compressed_size(&'static self, uncompressed_size: usize) -> Result<usize> {
        let imp = self.implementation()?;
        let base = (imp.get_max_compressed_size)(self, uncompressed_size);
        if imp.info.contains(CodecInfo::WRAP_SIZE) {
            Ok(varuint64_size(uncompressed_size as u64) + base)
        } else {
            Ok(base)
        }
    }

    /// Decompressed size declared by `compressed`, or `0` when the codec
    /// cannot tell.
    pub fn uncompressed_size(&'static self, compressed: &[u8]) -> Result<usize> {
        let imp = self.implementation()?;
        if let Some(f) = imp.get_uncompressed_size {
            return Ok(f(self, compressed));
        }
        if imp.info.contains(CodecInfo::WRAP_SIZE) {
            let (v, _) = read_varuint64(compressed).ok_or(Error::InvalidBuffer)?;
            if v > usize::MAX as u64 {
                return Err(Error::Range);
            }
            return Ok(v as usize);
        }
        Ok(0)
    }

    // ── one-shot buffer operations ───────────────────────────────────────────

    /// Compress `uncompressed` into `compressed`, returning the number of
    /// bytes written.
    pub fn compress(
        &'static self,
        compressed: &mut [u8],
        uncompressed: &[u8],
        options: Option<&Options>,
    ) -> Result<usize> {
        let imp = self.implementation()?;

        if imp.compress_buffer.is_some() || imp.compress_buffer_unsafe.is_some() {
            let raw_max = (imp.get_max_compressed_size)(self, uncompressed.len());

            let prefix = if imp.info.contains(CodecInfo::WRAP_SIZE) {
                write_varuint64(compressed, uncompressed.len() as u64).ok_or(Error::BufferFull)?
            } else {
                0
            };
            let window = &mut compressed[prefix..];

            let written = if window.len() >= raw_max {
                // The unsafe variant skips bounds checks and is preferred
                // when the window is known to cover the worst case.
                match (imp.compress_buffer_unsafe, imp.compress_buffer) {
                    (Some(f), _) => f(self, window, uncompressed, options)?,
                    (None, Some(f)) => f(self, window, uncompressed, options)?,
                    (None, None) => return Err(Error::Failed),
                }
            } else if let Some(f) = imp.compress_buffer {
                f(self, window, uncompressed, options)?
            } else {
                // Only the unsafe variant exists and the window is
                // undersized: stage through a worst-case scratch buffer.
                let f = match imp.compress_buffer_unsafe {
                    Some(f) => f,
                    None => return Err(Error::Failed),
                };
                let mut scratch = vec![0u8; raw_max];
                let n = f(self, &mut scratch, uncompressed, options)?;
                if n > window.len() {
                    return Err(Error::BufferFull);
                }
                window[..n].copy_from_slice(&scratch[..n]);
                n
            };
            Ok(prefix + written)
        } else if let Some(splice) = imp.splice {
            let mut source = SliceSource {
                data: uncompressed,
                pos: 0,
            };
            let mut sink = SliceSink {
                out: compressed,
                pos: 0,
            };
            splice(self, options, Direction::Compress, &mut source, &mut sink)?;
            Ok(sink.pos)
        } else {
            self.drive_stream(Direction::Compress, compressed, uncompressed, options)
        }
    }

    /// Decompress `compressed` into `decompressed`, returning the number of
    /// bytes written.
    pub fn decompress(
        &'static self,
        decompressed: &mut [u8],
        compressed: &[u8],
        options: Option<&Options>,
    ) -> Result<usize> {
        let imp = self.implementation()?;
        if decompressed.is_empty() {
            return Err(Error::InvalidBuffer);
        }

        if let Some(f) = imp.decompress_buffer {
            if imp.info.contains(CodecInfo::WRAP_SIZE) {
                let (declared, consumed) =
                    read_varuint64(compressed).ok_or(Error::InvalidBuffer)?;
                if declared > usize::MAX as u64 {
                    return Err(Error::Range);
                }
                let declared = declared as usize;
                if decompressed.len() < declared {
                    return Err(Error::BufferFull);
                }
                let n = f(
                    self,
                    &mut decompressed[..declared],
                    &compressed[consumed..],
                    options,
                )?;
                if n != declared {
                    return Err(Error::InvalidBuffer);
                }
                Ok(declared)
            } else {
                f(self, decompressed, compressed, options)
            }
        } else {
            self.drive_stream(Direction::Decompress, decompressed, compressed, options)
        }
    }

    /// Decompress into a newly allocated buffer when the output size is not
    /// known in advance.  Starts from a guess proportional to the input size,
    /// doubling on [`Error::BufferFull`]; an [`Error::Range`] from the codec
    /// (an allocation its API cannot express) switches to halving.
    pub fn decompress_to_buffer(
        &'static self,
        compressed: &[u8],
        options: Option<&Options>,
    ) -> Result<Vec<u8>> {
        let base = crate::buffer::npot(compressed.len().max(1)) << 3;
        let mut alloc = base;
        let mut try_smaller = false;

        loop {
            if try_smaller {
                alloc >>= 1;
                if alloc <= 1 {
                    return Err(Error::Range);
                }
            } else {
                alloc <<= 1;
            }

            // One less than a power of two, for codec APIs that take signed
            // buffer sizes.
            let mut data = vec![0u8; alloc - 1];
            match self.decompress(&mut data, compressed, options) {
                Ok(n) => {
                    data.truncate(n);
                    return Ok(data);
                }
                Err(Error::BufferFull) if !try_smaller => continue,
                Err(Error::BufferFull) => {
                    // Too big for the codec's API yet too small for the
                    // data; nothing left to try.
                    return Err(Error::BufferFull);
                }
                Err(Error::Range) => {
                    try_smaller = true;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn drive_stream(
        &'static self,
        direction: Direction,
        output: &mut [u8],
        input: &[u8],
        options: Option<&Options>,
    ) -> Result<usize> {
        let mut stream = Stream::new(self, direction, options.cloned())?;
        let mut in_pos = 0usize;
        let mut out_pos = 0usize;

        let mut status;
        loop {
            let p = stream.process(&input[in_pos..], &mut output[out_pos..])?;
            in_pos += p.bytes_read;
            out_pos += p.bytes_written;
            status = p.status;
            if p.status != Status::Processing {
                break;
            }
            // A Processing report without any progress means the output
            // window is exhausted.
            if p.bytes_read == 0 && p.bytes_written == 0 {
                return Err(Error::BufferFull);
            }
        }

        if status == Status::EndOfStream {
            return Ok(stream.total_out());
        }

        loop {
            let p = stream.finish(&input[in_pos..], &mut output[out_pos..])?;
            in_pos += p.bytes_read;
            out_pos += p.bytes_written;
            if p.status != Status::Processing {
                break;
            }
            if p.bytes_read == 0 && p.bytes_written == 0 {
                return Err(Error::BufferFull);
            }
        }

        Ok(stream.total_out())
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("name", &self.name)
            .field("plugin", &self.plugin_name)
            .field("priority", &self.priority)
            .field("extension", &self.extension)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory splice adapters for the buffer path
// ─────────────────────────────────────────────────────────────────────────────

struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Read for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len() - self.pos;
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct SliceSink<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl Write for SliceSink<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let available = self.out.len() - self.pos;
        if data.len() > available {
            return Err(to_io_error(Error::BufferFull));
        }
        self.out[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Size-wrap varint
//
// Variable-length unsigned 64-bit integer, big-endian, continuation bit in
// the MSB of every byte but the last.  The 1–8 byte forms carry 7 data bits
// per byte; when the top 8 bits of the value are nonzero the 9-byte form is
// used instead: eight continuation-tagged bytes of the high 56 bits followed
// by one raw byte of the low 8 bits.
// ─────────────────────────────────────────────────────────────────────────────

/// Decode a varint from the front of `p`.  Returns the value and the number
/// of bytes consumed, or `None` if `p` is truncated.
pub(crate) fn read_varuint64(p: &[u8]) -> Option<(u64, usize)> {
    let mut n: u64 = 0;
    let mut i = 0usize;

    while i < 8 && i < p.len() && p[i] > 0x7F {
        n = (n << 7) | u64::from(p[i] & 0x7F);
        i += 1;
    }

    if i == p.len() {
        return None;
    }
    if i == 8 {
        n = (n << 8) | u64::from(p[i]);
    } else {
        n = (n << 7) | u64::from(p[i]);
    }

    Some((n, i + 1))
}

/// Encode `v` into the front of `p`.  Returns the number of bytes written,
/// or `None` if `p` is too small.
pub(crate) fn write_varuint64(p: &mut [u8], v: u64) -> Option<usize> {
    if v & 0xFF00_0000_0000_0000 != 0 {
        if p.len() < 9 {
            return None;
        }
        p[8] = v as u8;
        let mut rest = v >> 8;
        for i in (0..8).rev() {
            p[i] = ((rest & 0x7F) as u8) | 0x80;
            rest >>= 7;
        }
        return Some(9);
    }

    let mut buf = [0u8; 10];
    let mut i = 0usize;
    let mut rest = v;
    buf[i] = (rest & 0x7F) as u8;
    i += 1;
    rest >>= 7;
    while rest > 0 {
        buf[i] = ((rest & 0x7F) as u8) | 0x80;
        i += 1;
        rest >>= 7;
    }

    if i > p.len() {
        return None;
    }
    for j in 0..i {
        p[j] = buf[i - j - 1];
    }
    Some(i)
}

/// Encoded size of `v` in bytes (1–9).
pub(crate) fn varuint64_size(v: u64) -> usize {
    if v & 0xFF00_0000_0000_0000 != 0 {
        return 9;
    }
    let mut required = 1;
    let mut shift = 7;
    while shift < 64 {
        if v < (1u64 << shift) {
            break;
        }
        required += 1;
        shift += 7;
    }
    required
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(v: u64) -> (usize, u64) {
        let mut buf = [0u8; 9];
        let written = write_varuint64(&mut buf, v).expect("buffer is large enough");
        assert_eq!(written, varuint64_size(v), "size() disagrees for {v}");
        let (decoded, consumed) = read_varuint64(&buf[..written]).expect("decodes");
        assert_eq!(consumed, written);
        (written, decoded)
    }

    #[test]
    fn varint_small_values() {
        assert_eq!(round_trip(0), (1, 0));
        assert_eq!(round_trip(0x7F), (1, 0x7F));
        assert_eq!(round_trip(0x80), (2, 0x80));
        assert_eq!(round_trip(16384), (3, 16384));
    }

    #[test]
    fn varint_eight_byte_boundary() {
        // Largest value of the 8-byte (7-bit-per-byte) form.
        let below = (1u64 << 56) - 1;
        assert_eq!(round_trip(below), (8, below));

        // First value that needs the 9-byte form.
        let at = 1u64 << 56;
        assert_eq!(round_trip(at), (9, at));
    }

    #[test]
    fn varint_max_value() {
        assert_eq!(round_trip(u64::MAX), (9, u64::MAX));
    }

    #[test]
    fn varint_truncated_input() {
        let mut buf = [0u8; 9];
        let written = write_varuint64(&mut buf, 1u64 << 40).expect("fits");
        for cut in 0..written {
            assert!(read_varuint64(&buf[..cut]).is_none(), "cut at {cut}");
        }
    }

    #[test]
    fn varint_undersized_output() {
        let mut one = [0u8; 1];
        assert!(write_varuint64(&mut one, 0x80).is_none());
        let mut eight = [0u8; 8];
        assert!(write_varuint64(&mut eight, 1u64 << 56).is_none());
    }

    #[test]
    fn codec_info_bit_ops() {
        let info = CodecInfo::CAN_FLUSH | CodecInfo::WRAP_SIZE;
        assert!(info.contains(CodecInfo::CAN_FLUSH));
        assert!(info.contains(CodecInfo::WRAP_SIZE));
        assert!(!info.contains(CodecInfo::NATIVE_STREAMING));
        assert!(info.contains(CodecInfo::NONE));
    }
}
