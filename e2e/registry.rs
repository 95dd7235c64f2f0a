//! E2E: codec/plugin resolution — name and extension lookup, qualified
//! names, priority disambiguation, manifest discovery, and option parsing.

mod common;

use std::collections::BTreeSet;

use crimp::{Context, Error, Options};

// ─────────────────────────────────────────────────────────────────────────────
// Name and extension resolution
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn builtin_codecs_resolve_by_name() {
    for name in common::ALL_CODECS {
        let c = crimp::get_codec(name).unwrap_or_else(|| panic!("{name} must resolve"));
        assert_eq!(c.name(), *name);
        assert!(c.is_initialized(), "{name}: lookup must initialize");
    }
}

#[test]
fn unknown_names_do_not_resolve() {
    assert!(crimp::get_codec("no-such-codec").is_none());
    assert!(crimp::get_codec("no-such-plugin:zlib").is_none());
    assert!(crimp::get_codec_from_extension("xyzzy").is_none());
}

#[test]
fn extensions_resolve_to_their_codecs() {
    for (ext, name) in [("zz", "zlib"), ("gz", "gzip"), ("lz4", "lz4"), ("zst", "zstd"), ("br", "brotli")] {
        let c = crimp::get_codec_from_extension(ext)
            .unwrap_or_else(|| panic!("extension {ext} must resolve"));
        assert_eq!(c.name(), name, "extension {ext}");
    }
}

#[test]
fn qualified_lookup_bypasses_the_priority_map() {
    let preferred = crimp::get_codec("store").expect("store resolves");
    assert_eq!(
        preferred.plugin_name(),
        "store",
        "the higher-priority provider must win the plain lookup"
    );
    assert_eq!(preferred.priority(), 60);

    let shadowed = crimp::get_codec("relay:store").expect("relay:store resolves");
    assert_eq!(shadowed.plugin_name(), "relay");
    assert_eq!(shadowed.priority(), 40);
}

#[test]
fn plugin_listing_includes_shadowed_codecs() {
    let relay = crimp::get_plugin("relay").expect("relay plugin");
    let mut names = Vec::new();
    relay.foreach_codec(&mut |c| names.push(c.name().to_owned()));
    assert_eq!(names, vec!["store".to_owned()]);
}

#[test]
fn foreach_codec_lists_each_name_once() {
    let mut names = Vec::new();
    crimp::foreach_codec(&mut |c| names.push(c.name().to_owned()));
    let unique: BTreeSet<_> = names.iter().cloned().collect();
    assert_eq!(unique.len(), names.len(), "duplicate codec names in listing");
    for expected in common::ALL_CODECS {
        assert!(unique.contains(*expected), "{expected} missing from listing");
    }
}

#[test]
fn plugins_carry_license_tags() {
    let zlib = crimp::get_plugin("zlib").expect("zlib plugin");
    assert_eq!(zlib.licenses(), &["Zlib".to_owned()]);
    let brotli = crimp::get_plugin("brotli").expect("brotli plugin");
    assert_eq!(
        brotli.licenses(),
        &["MIT".to_owned(), "BSD-3-Clause".to_owned()]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory discovery
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn manifest_directories_register_plugins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plugin_dir = dir.path().join("acme");
    std::fs::create_dir(&plugin_dir).expect("mkdir");
    std::fs::write(
        plugin_dir.join("crimp.ini"),
        "[acme9]\npriority = 90\nextension = a9\nlicense = Proprietary\n",
    )
    .expect("write manifest");

    // A stray file (not a directory) must be skipped.
    std::fs::write(dir.path().join("not-a-plugin"), "junk").expect("write file");
    // A subdirectory without a manifest must be skipped.
    std::fs::create_dir(dir.path().join("empty")).expect("mkdir");

    let ctx = Context::with_search_path(dir.path().to_str().expect("utf-8 path"));

    let acme = ctx.get_plugin("acme").expect("acme registered");
    assert_eq!(acme.licenses(), &["Proprietary".to_owned()]);
    assert!(ctx.get_plugin("empty").is_none());
    assert!(ctx.get_plugin("not-a-plugin").is_none());

    // The codec is registered and listed, but has no entry point, so a
    // resolving lookup (which initializes) fails.
    let mut names = Vec::new();
    ctx.foreach_codec(&mut |c| names.push(c.name().to_owned()));
    assert!(names.contains(&"acme9".to_owned()));
    assert!(ctx.get_codec("acme9").is_none(), "init must fail without an entry point");
    assert!(ctx.get_codec_from_extension("a9").is_none());
}

#[test]
fn first_plugin_registration_wins() {
    let dir_a = tempfile::tempdir().expect("tempdir");
    let dir_b = tempfile::tempdir().expect("tempdir");
    for (dir, priority) in [(&dir_a, 70), (&dir_b, 80)] {
        let plugin_dir = dir.path().join("dup");
        std::fs::create_dir(&plugin_dir).expect("mkdir");
        std::fs::write(
            plugin_dir.join("crimp.ini"),
            format!("[dupcodec]\npriority = {priority}\n"),
        )
        .expect("write manifest");
    }

    let sep = if cfg!(windows) { ';' } else { ':' };
    let path = format!(
        "{}{sep}{}",
        dir_a.path().display(),
        dir_b.path().display()
    );
    let ctx = Context::with_search_path(&path);

    let mut found = None;
    ctx.foreach_codec(&mut |c| {
        if c.name() == "dupcodec" {
            found = Some(c.priority());
        }
    });
    assert_eq!(found, Some(70), "the first registration must win");
}

#[test]
fn builtins_shadow_same_named_directory_plugins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plugin_dir = dir.path().join("zlib");
    std::fs::create_dir(&plugin_dir).expect("mkdir");
    std::fs::write(plugin_dir.join("crimp.ini"), "[zlib]\npriority = 99\n").expect("write");

    let ctx = Context::with_search_path(dir.path().to_str().expect("utf-8 path"));
    let zlib = ctx.get_plugin("zlib").expect("zlib");
    // The built-in registration came first; the directory copy is ignored.
    assert_eq!(zlib.directory().to_string_lossy(), "<built-in>");
}

// ─────────────────────────────────────────────────────────────────────────────
// Options against real codec schemas
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn options_parse_and_validate() {
    let zstd = crimp::get_codec("zstd").expect("zstd");
    let mut opts = Options::new(zstd).expect("options");

    assert_eq!(opts.get_int("level"), Some(3), "schema default");
    opts.parse_option("level", "19").expect("parse level");
    assert_eq!(opts.get_int("level"), Some(19));
    assert_eq!(opts.get_int("LEVEL"), Some(19), "keys are case-insensitive");

    assert_eq!(opts.parse_option("level", "97"), Err(Error::BadValue));
    assert_eq!(opts.parse_option("level", "fast"), Err(Error::BadValue));
    assert_eq!(opts.parse_option("threads", "4"), Err(Error::BadParam));
}

#[test]
fn options_flow_into_compression() {
    let input = common::lorem();
    let zstd = crimp::get_codec("zstd").expect("zstd");

    let mut fast = Options::new(zstd).expect("options");
    fast.set_int("level", 1).expect("set");
    let mut best = Options::new(zstd).expect("options");
    best.set_int("level", 19).expect("set");

    let mut buf = vec![0u8; zstd.max_compressed_size(input.len()).expect("max")];
    let fast_len = zstd.compress(&mut buf, &input, Some(&fast)).expect("compress");
    let best_len = zstd.compress(&mut buf, &input, Some(&best)).expect("compress");
    assert!(
        best_len <= fast_len,
        "higher level should not compress worse ({best_len} vs {fast_len})"
    );

    // Both still round-trip.
    let packed = {
        let mut b = vec![0u8; zstd.max_compressed_size(input.len()).expect("max")];
        let n = zstd.compress(&mut b, &input, Some(&best)).expect("compress");
        b.truncate(n);
        b
    };
    let mut out = vec![0u8; input.len()];
    let n = zstd.decompress(&mut out, &packed, Some(&best)).expect("decompress");
    assert_eq!(&out[..n], &input[..]);
}

#[test]
fn enum_string_options_map_to_backing_values() {
    let brotli = crimp::get_codec("brotli").expect("brotli");
    let mut opts = Options::new(brotli).expect("options");

    assert_eq!(opts.get_string("mode"), Some("generic"), "schema default");
    opts.parse_option("mode", "TEXT").expect("parse mode");
    assert_eq!(opts.get_string("mode"), Some("text"));
    assert_eq!(opts.parse_option("mode", "pictures"), Err(Error::BadValue));
}

#[test]
fn codecs_without_options_reject_every_key() {
    let lz4 = crimp::get_codec("lz4").expect("lz4");
    let mut opts = Options::new(lz4).expect("options");
    assert_eq!(opts.parse_option("level", "1"), Err(Error::BadParam));
}
