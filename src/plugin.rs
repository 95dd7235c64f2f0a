//! Plugins: discoverable code units that publish one or more codecs.
//!
//! A plugin's entry point comes from a statically linked registry of
//! [`PluginRegistration`] values rather than a shared library.  Manifest
//! parsing is unchanged: built-in plugins embed their manifest text, and
//! directories on the search path may carry manifests for any registered
//! plugin name.  A manifest naming a plugin with no registered entry point
//! still registers its codecs; they fail with
//! [`UnableToLoad`](crate::Error::UnableToLoad) on first use, the moral
//! equivalent of a missing shared library.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codec::Codec;
use crate::status::Result;

/// Entry point filled out by a plugin for each of its codecs.
///
/// The function inspects [`Codec::name`] (manifests may declare several
/// codecs per plugin) and returns the implementation table for it, or
/// [`UnableToLoad`](crate::Error::UnableToLoad) for names it does not
/// recognize.  It must not mutate any state visible across codecs.
pub type InitCodecFn = fn(&Codec) -> Result<crate::codec::CodecImpl>;

/// A statically linked plugin: its name, embedded manifest, and codec init
/// entry point.
#[derive(Clone, Copy)]
pub struct PluginRegistration {
    pub name: &'static str,
    pub manifest: &'static str,
    pub init_codec: InitCodecFn,
}

/// A discoverable, lazily initialized provider of codecs.
pub struct Plugin {
    name: String,
    directory: PathBuf,
    licenses: Vec<String>,
    codecs: BTreeMap<String, Codec>,
    registration: Option<&'static PluginRegistration>,
}

impl Plugin {
    pub(crate) fn new(
        name: &str,
        directory: &Path,
        registration: Option<&'static PluginRegistration>,
    ) -> Plugin {
        Plugin {
            name: name.to_owned(),
            directory: directory.to_owned(),
            licenses: Vec::new(),
            codecs: BTreeMap::new(),
            registration,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the plugin's manifest was found in.  Built-in plugins use a
    /// synthetic `<built-in>` path.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// License tags declared by the manifest.
    pub fn licenses(&self) -> &[String] {
        &self.licenses
    }

    pub(crate) fn set_licenses(&mut self, tags: Vec<String>) {
        self.licenses = tags;
    }

    pub(crate) fn registration(&self) -> Option<&'static PluginRegistration> {
        self.registration
    }

    pub(crate) fn add_codec(&mut self, codec: Codec) {
        self.codecs.entry(codec.name().to_owned()).or_insert(codec);
    }

    pub(crate) fn codec_mut(&mut self, name: &str) -> Option<&mut Codec> {
        self.codecs.get_mut(name)
    }

    /// Raw lookup without initialization.
    pub(crate) fn codec(&self, name: &str) -> Option<&Codec> {
        self.codecs.get(name)
    }

    /// Look up one of this plugin's own codecs by name, initializing it.
    ///
    /// This reaches codecs shadowed by a higher-priority plugin in the
    /// global codec map.
    pub fn get_codec(&self, name: &str) -> Option<&Codec> {
        let codec = self.codecs.get(name)?;
        codec.implementation().ok()?;
        Some(codec)
    }

    /// Invoke `f` for every codec this plugin provides, including codecs
    /// shadowed by other plugins.  Codecs are not initialized.
    pub fn foreach_codec(&self, f: &mut dyn FnMut(&Codec)) {
        for codec in self.codecs.values() {
            f(codec);
        }
    }

    pub(crate) fn codecs(&self) -> impl Iterator<Item = &Codec> {
        self.codecs.values()
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("codecs", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}
