//! Built-in plugins.
//!
//! Each module publishes one plugin: an embedded manifest plus an init
//! entry point that fills out a [`CodecImpl`](crate::codec::CodecImpl) for
//! the codec names the manifest declares.  The built-ins deliberately cover
//! every native operation shape: `zlib` is truly streaming, `lz4` and
//! `zstd` are buffer-only, `brotli` is splice-only, and `store`/`relay`
//! publish the same codec name in two shapes at two priorities.

pub(crate) mod brotli;
pub(crate) mod lz4;
pub(crate) mod relay;
pub(crate) mod store;
pub(crate) mod zlib;
pub(crate) mod zstd;

use crate::plugin::PluginRegistration;

/// Every statically linked plugin, in registration order.
pub(crate) static BUILTIN: &[PluginRegistration] = &[
    zlib::REGISTRATION,
    lz4::REGISTRATION,
    zstd::REGISTRATION,
    brotli::REGISTRATION,
    store::REGISTRATION,
    relay::REGISTRATION,
];

/// Resolve a plugin name to its registered entry point, if any.
pub(crate) fn find_registration(name: &str) -> Option<&'static PluginRegistration> {
    BUILTIN.iter().find(|r| r.name == name)
}
