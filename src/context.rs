//! The registry: a process-wide context mapping plugin names, codec names
//! and file extensions to interned codec descriptors.
//!
//! The default context is created on first access.  It registers every
//! built-in plugin from its embedded manifest, then scans the directories on
//! the `CRIMP_PLUGINS` search path (read exactly once; compile-time default
//! otherwise) for subdirectories carrying a `crimp.ini` manifest.  When two
//! plugins publish a codec under the same name, the codec map points at the
//! higher-priority one; the shadowed codec stays reachable through a
//! qualified `"plugin:codec"` lookup.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::codec::Codec;
use crate::ini::{self, IniEvent};
use crate::plugin::Plugin;
use crate::plugins;

/// Name of the manifest file looked for in each plugin directory.
pub const MANIFEST_FILE_NAME: &str = "crimp.ini";

/// Environment variable holding the plugin search path.
pub const SEARCH_PATH_ENV: &str = "CRIMP_PLUGINS";

#[cfg(not(windows))]
const DEFAULT_SEARCH_PATH: &str = "/usr/local/lib/crimp/plugins:/usr/lib/crimp/plugins";
#[cfg(windows)]
const DEFAULT_SEARCH_PATH: &str = "";

#[cfg(not(windows))]
const SEARCH_PATH_SEPARATOR: char = ':';
#[cfg(windows)]
const SEARCH_PATH_SEPARATOR: char = ';';

/// Resolution entry: which plugin currently provides a codec name (or an
/// extension), and at what priority.
struct CodecRef {
    plugin: String,
    codec: String,
    priority: u32,
}

/// Registry of plugins, codecs and extensions.
pub struct Context {
    plugins: BTreeMap<String, Plugin>,
    codecs: BTreeMap<String, CodecRef>,
    extensions: BTreeMap<String, CodecRef>,
}

impl Context {
    /// The process-wide default context, built on first call.
    pub fn global() -> &'static Context {
        static DEFAULT: OnceLock<Context> = OnceLock::new();
        DEFAULT.get_or_init(|| {
            let env = std::env::var(SEARCH_PATH_ENV).ok();
            Context::build(env.as_deref().unwrap_or(DEFAULT_SEARCH_PATH))
        })
    }

    /// Build a context over an explicit search path instead of the
    /// environment.  Intended for embedding and tests; codecs from a
    /// non-default context support registry operations only.
    pub fn with_search_path(search_path: &str) -> Context {
        Context::build(search_path)
    }

    fn build(search_path: &str) -> Context {
        let mut ctx = Context {
            plugins: BTreeMap::new(),
            codecs: BTreeMap::new(),
            extensions: BTreeMap::new(),
        };

        for registration in plugins::BUILTIN {
            let mut plugin = Plugin::new(
                registration.name,
                Path::new("<built-in>"),
                Some(registration),
            );
            match parse_manifest(&mut plugin, registration.manifest) {
                Ok(()) => ctx.install(plugin),
                Err(e) => warn!("built-in plugin {} has a bad manifest: {e}", registration.name),
            }
        }

        for dir in split_search_path(search_path) {
            ctx.scan_directory(Path::new(&dir));
        }

        ctx
    }

    fn scan_directory(&mut self, dir: &Path) {
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_dir() {
                continue;
            }
            let manifest_path = entry.path().join(MANIFEST_FILE_NAME);
            let text = match std::fs::read_to_string(&manifest_path) {
                Ok(t) => t,
                Err(_) => continue,
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let registration = plugins::find_registration(&name);
            if registration.is_none() {
                debug!("plugin {name} has a manifest but no registered entry point");
            }

            let mut plugin = Plugin::new(&name, entry.path(), registration);
            match parse_manifest(&mut plugin, &text) {
                Ok(()) => self.install(plugin),
                Err(e) => warn!("ignoring {}: {e}", manifest_path.display()),
            }
        }
    }

    /// Register a plugin and its codecs.  The first registration of a name
    /// wins; later ones are dropped.
    fn install(&mut self, plugin: Plugin) {
        if self.plugins.contains_key(plugin.name()) {
            debug!("duplicate plugin {} ignored", plugin.name());
            return;
        }

        for codec in plugin.codecs() {
            self.add_codec_ref(plugin.name(), codec);
        }
        debug!("registered plugin {}", plugin.name());
        self.plugins.insert(plugin.name().to_owned(), plugin);
    }

    /// Point the codec map (and extension map) at `codec` unless an entry
    /// with strictly higher priority is already present.
    fn add_codec_ref(&mut self, plugin_name: &str, codec: &Codec) {
        let make_ref = || CodecRef {
            plugin: plugin_name.to_owned(),
            codec: codec.name().to_owned(),
            priority: codec.priority(),
        };

        match self.codecs.entry(codec.name().to_owned()) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(make_ref());
            }
            std::collections::btree_map::Entry::Occupied(mut e) => {
                if codec.priority() > e.get().priority {
                    e.insert(make_ref());
                }
            }
        }

        if let Some(extension) = codec.extension() {
            match self.extensions.entry(extension.to_owned()) {
                std::collections::btree_map::Entry::Vacant(e) => {
                    e.insert(make_ref());
                }
                std::collections::btree_map::Entry::Occupied(mut e) => {
                    if codec.priority() > e.get().priority {
                        e.insert(make_ref());
                    }
                }
            }
        }
    }

    fn resolve<'a>(&'a self, r: &CodecRef) -> Option<&'a Codec> {
        self.plugins.get(&r.plugin)?.codec(&r.codec)
    }

    /// Look up a codec by name and initialize it.
    ///
    /// A name of the form `"plugin:codec"` bypasses the priority map and
    /// selects the named plugin's implementation.
    pub fn get_codec(&self, name: &str) -> Option<&Codec> {
        if let Some((plugin_name, codec_name)) = name.split_once(':') {
            return self.plugins.get(plugin_name)?.get_codec(codec_name);
        }

        let codec = self.resolve(self.codecs.get(name)?)?;
        codec.implementation().ok()?;
        Some(codec)
    }

    /// Look up the preferred codec for a file extension (no dot) and
    /// initialize it.
    pub fn get_codec_from_extension(&self, extension: &str) -> Option<&Codec> {
        let codec = self.resolve(self.extensions.get(extension)?)?;
        codec.implementation().ok()?;
        Some(codec)
    }

    /// Look up a plugin by name.
    pub fn get_plugin(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    /// Invoke `f` for every registered plugin.  Plugins are not initialized.
    pub fn foreach_plugin(&self, f: &mut dyn FnMut(&Plugin)) {
        for plugin in self.plugins.values() {
            f(plugin);
        }
    }

    /// Invoke `f` for the highest-priority provider of every codec name.
    /// Codecs are not initialized.  To see shadowed providers as well,
    /// iterate plugins and use [`Plugin::foreach_codec`].
    pub fn foreach_codec(&self, f: &mut dyn FnMut(&Codec)) {
        for r in self.codecs.values() {
            if let Some(codec) = self.resolve(r) {
                f(codec);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default-context conveniences
// ─────────────────────────────────────────────────────────────────────────────

/// Look up a codec by (optionally `"plugin:"`-qualified) name in the default
/// context.
pub fn get_codec(name: &str) -> Option<&'static Codec> {
    Context::global().get_codec(name)
}

/// Look up the preferred codec for a file extension in the default context.
pub fn get_codec_from_extension(extension: &str) -> Option<&'static Codec> {
    Context::global().get_codec_from_extension(extension)
}

/// Look up a plugin by name in the default context.
pub fn get_plugin(name: &str) -> Option<&'static Plugin> {
    Context::global().get_plugin(name)
}

/// Iterate every plugin in the default context.
pub fn foreach_plugin(f: &mut dyn FnMut(&Plugin)) {
    Context::global().foreach_plugin(f)
}

/// Iterate the preferred provider of every codec in the default context.
pub fn foreach_codec(f: &mut dyn FnMut(&Codec)) {
    Context::global().foreach_codec(f)
}

// ─────────────────────────────────────────────────────────────────────────────
// Search-path and manifest parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Split a search-path value into directories.  Entries may be double-quoted
/// and may use backslash escapes; empty entries are dropped.
fn split_search_path(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;

    for ch in raw.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
        } else if quoted {
            match ch {
                '"' => quoted = false,
                '\\' => escaped = true,
                _ => current.push(ch),
            }
        } else {
            match ch {
                c if c == SEARCH_PATH_SEPARATOR => {
                    if !current.is_empty() {
                        out.push(std::mem::take(&mut current));
                    }
                }
                '\\' => escaped = true,
                '"' => quoted = true,
                _ => current.push(ch),
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Populate `plugin` from manifest text: each section declares a codec;
/// recognized keys are `license`, `priority` and `extension`.  Unknown keys
/// are ignored.
fn parse_manifest(plugin: &mut Plugin, text: &str) -> Result<(), ini::IniError> {
    let registration = plugin.registration();
    let plugin_name = plugin.name().to_owned();

    ini::parse(text, &mut |event| {
        match event {
            IniEvent::Section(name) => {
                plugin.add_codec(Codec::new(&plugin_name, name, registration));
            }
            IniEvent::Pair { section, key, value } => {
                if key.eq_ignore_ascii_case("license") {
                    plugin.set_licenses(
                        value
                            .split(';')
                            .map(|t| t.trim().to_owned())
                            .filter(|t| !t.is_empty())
                            .collect(),
                    );
                } else if let Some(codec_name) = section {
                    if key.eq_ignore_ascii_case("priority") {
                        if let Ok(priority) = value.parse::<u32>() {
                            if let Some(codec) = plugin.codec_mut(codec_name) {
                                codec.set_priority(priority);
                            }
                        }
                    } else if key.eq_ignore_ascii_case("extension") {
                        if let Some(codec) = plugin.codec_mut(codec_name) {
                            codec.set_extension(value);
                        }
                    }
                    // Unknown keys are ignored.
                }
            }
        }
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_splits_on_separator() {
        let sep = SEARCH_PATH_SEPARATOR;
        let raw = format!("/a/b{sep}{sep}/c/d");
        assert_eq!(split_search_path(&raw), vec!["/a/b", "/c/d"]);
    }

    #[test]
    fn search_path_quoting_and_escapes() {
        let sep = SEARCH_PATH_SEPARATOR;
        let raw = format!("\"/with{sep}sep\"{sep}/plain");
        assert_eq!(
            split_search_path(&raw),
            vec![format!("/with{sep}sep"), "/plain".to_owned()]
        );
        assert_eq!(split_search_path("\\\"x"), vec!["\"x"]);
    }

    #[test]
    fn manifest_populates_plugin() {
        let mut plugin = Plugin::new("p", Path::new("/tmp/p"), None);
        parse_manifest(
            &mut plugin,
            "[alpha]\npriority = 70\nextension = alp\nlicense = MIT; Apache-2.0\n[beta]\n",
        )
        .unwrap();

        let alpha = plugin.codec("alpha").unwrap();
        assert_eq!(alpha.priority(), 70);
        assert_eq!(alpha.extension(), Some("alp"));
        let beta = plugin.codec("beta").unwrap();
        assert_eq!(beta.priority(), crate::codec::DEFAULT_PRIORITY);
        assert_eq!(plugin.licenses(), &["MIT".to_owned(), "Apache-2.0".to_owned()]);
    }

    #[test]
    fn unknown_manifest_keys_are_ignored() {
        let mut plugin = Plugin::new("p", Path::new("/tmp/p"), None);
        parse_manifest(&mut plugin, "[c]\nfrobnicate = yes\npriority = 10\n").unwrap();
        assert_eq!(plugin.codec("c").unwrap().priority(), 10);
    }
}
