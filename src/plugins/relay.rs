//! The `relay` plugin: identity transform through the splice shape.
//!
//! Publishes the `store` codec name at a lower priority than the `store`
//! plugin, so the priority map prefers the buffer implementation while
//! `"relay:store"` remains reachable by qualified lookup.  The two produce
//! byte-identical output, which is what makes cross-plugin interop on one
//! codec name testable.

use std::io::{self, Read, Write};

use crate::codec::{Codec, CodecImpl, CodecInfo};
use crate::options::Options;
use crate::plugin::PluginRegistration;
use crate::status::{from_io_error, Error, Result};
use crate::stream::Direction;

pub(crate) static REGISTRATION: PluginRegistration = PluginRegistration {
    name: "relay",
    manifest: MANIFEST,
    init_codec,
};

const MANIFEST: &str = "\
license = MIT
[store]
priority = 40
";

fn init_codec(codec: &Codec) -> Result<CodecImpl> {
    if codec.name() != "store" {
        return Err(Error::UnableToLoad);
    }
    let mut imp = CodecImpl::new(CodecInfo::NONE, max_compressed_size);
    imp.splice = Some(splice);
    Ok(imp)
}

fn max_compressed_size(_codec: &'static Codec, n: usize) -> usize {
    n
}

fn splice(
    _codec: &'static Codec,
    _opts: Option<&Options>,
    _direction: Direction,
    src: &mut dyn Read,
    dst: &mut dyn Write,
) -> Result<()> {
    io::copy(&mut &mut *src, &mut &mut *dst)
        .map(|_| ())
        .map_err(|e| from_io_error(&e))
}
