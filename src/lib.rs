//! One compression API over many codec backends.
//!
//! Crimp presents four operation shapes — buffer↔buffer, incremental
//! stream, splice (source/sink), and stdio-like file — over plugins that
//! natively implement any non-empty subset of them.  Whatever shape a
//! plugin is missing is synthesized from the shapes it has: a one-shot
//! buffer call can be served by driving a stream, a stream can be served by
//! suspending a one-shot splice function on a worker thread, and so on.
//!
//! ```no_run
//! let codec = crimp::get_codec("zstd").expect("zstd is built in");
//! let input = b"example input";
//!
//! let mut compressed = vec![0u8; codec.max_compressed_size(input.len()).unwrap()];
//! let n = codec.compress(&mut compressed, input, None).unwrap();
//! compressed.truncate(n);
//!
//! let mut out = vec![0u8; input.len()];
//! let n = codec.decompress(&mut out, &compressed, None).unwrap();
//! assert_eq!(&out[..n], input);
//! ```

pub mod buffer;
pub mod codec;
pub mod context;
pub mod file;
pub mod ini;
pub mod options;
pub mod plugin;
mod plugins;
pub mod splice;
pub mod status;
pub mod stream;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the common entry points
// ─────────────────────────────────────────────────────────────────────────────

/// Status and error codes.
pub use status::{Error, Result, Status};

/// Codec handles and the plugin-facing implementation table.
pub use codec::{Codec, CodecImpl, CodecInfo};

/// Registry lookups against the default context.
pub use context::{
    foreach_codec, foreach_plugin, get_codec, get_codec_from_extension, get_plugin, Context,
};

/// Typed codec options.
pub use options::{OptionInfo, OptionKind, OptionValue, Options};

/// Plugin descriptors and the static registration entry.
pub use plugin::{Plugin, PluginRegistration};

/// Incremental streams.
pub use stream::{Direction, IoWindow, NativeStream, Operation, Progress, Stream, StreamState};

/// Source→sink transfer.
pub use splice::{splice, splice_custom};

/// Stdio-like compressed files.
pub use file::{File, FileLock};

/// Growable byte buffer used by the synthesis paths.
pub use buffer::Buffer;

// ─────────────────────────────────────────────────────────────────────────────
// Version
// ─────────────────────────────────────────────────────────────────────────────

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 5;
pub const VERSION_RELEASE: u32 = 0;

/// Library version as a single number (e.g. 500 for 0.5.0).
pub fn version_number() -> u32 {
    VERSION_MAJOR * 100 * 100 + VERSION_MINOR * 100 + VERSION_RELEASE
}

/// Library version string.
pub fn version_string() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
