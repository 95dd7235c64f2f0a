//! Binary entry point for the `crimp` command-line tool.
//!
//! A thin front end over the splice surface: `compress` and `decompress`
//! move whole files through a codec chosen by name or by file extension,
//! and `list` prints the registered plugins and codecs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _};
use clap::{Parser, Subcommand};

use crimp::stream::Direction;
use crimp::{Codec, Options};

#[derive(Parser)]
#[command(name = "crimp", version, about = "Compress and decompress files through any registered codec")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a file.
    Compress {
        /// Codec name (may be qualified as plugin:codec).  Defaults to the
        /// codec matching the output extension.
        #[arg(short, long)]
        codec: Option<String>,
        /// Codec options as key=value pairs.
        #[arg(short, long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
        /// Input file.
        input: PathBuf,
        /// Output file.  Defaults to the input path plus the codec's
        /// extension.
        output: Option<PathBuf>,
    },
    /// Decompress a file.
    Decompress {
        /// Codec name (may be qualified as plugin:codec).  Defaults to the
        /// codec matching the input extension.
        #[arg(short, long)]
        codec: Option<String>,
        /// Codec options as key=value pairs.
        #[arg(short, long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
        /// Input file.
        input: PathBuf,
        /// Output file.  Defaults to the input path with its extension
        /// stripped.
        output: Option<PathBuf>,
    },
    /// List registered plugins and their codecs.
    List,
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Command::Compress {
            codec,
            options,
            input,
            output,
        } => {
            let codec = resolve_codec(codec.as_deref(), output.as_deref())
                .context("cannot determine a codec; pass --codec")?;
            let output = match output {
                Some(path) => path,
                None => default_compressed_path(&input, codec)?,
            };
            run(codec, Direction::Compress, &input, &output, &options)
        }
        Command::Decompress {
            codec,
            options,
            input,
            output,
        } => {
            let codec = resolve_codec(codec.as_deref(), Some(&input))
                .context("cannot determine a codec; pass --codec")?;
            let output = match output {
                Some(path) => path,
                None => stripped_path(&input)?,
            };
            run(codec, Direction::Decompress, &input, &output, &options)
        }
        Command::List => {
            list();
            Ok(())
        }
    }
}

/// Pick a codec from an explicit name, else from a path's extension.
fn resolve_codec(name: Option<&str>, path: Option<&Path>) -> anyhow::Result<&'static Codec> {
    if let Some(name) = name {
        return crimp::get_codec(name).ok_or_else(|| anyhow!("unknown codec {name:?}"));
    }
    let ext = path
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("no file extension to infer a codec from"))?;
    crimp::get_codec_from_extension(ext)
        .ok_or_else(|| anyhow!("no codec registered for extension {ext:?}"))
}

fn default_compressed_path(input: &Path, codec: &'static Codec) -> anyhow::Result<PathBuf> {
    let ext = codec
        .extension()
        .ok_or_else(|| anyhow!("codec {} has no extension; pass an output path", codec.name()))?;
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    Ok(PathBuf::from(name))
}

fn stripped_path(input: &Path) -> anyhow::Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("cannot derive an output name from {}; pass one", input.display()))?;
    if input.extension().is_none() {
        bail!(
            "{} has no extension to strip; pass an output path",
            input.display()
        );
    }
    Ok(input.with_file_name(stem))
}

fn parse_options(codec: &'static Codec, pairs: &[String]) -> anyhow::Result<Option<Options>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut opts = Options::new(codec).map_err(|e| anyhow!("codec options unavailable: {e}"))?;
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("malformed option {pair:?}; expected KEY=VALUE"))?;
        opts.parse_option(key, value)
            .map_err(|e| anyhow!("option {key:?}: {e}"))?;
    }
    Ok(Some(opts))
}

fn run(
    codec: &'static Codec,
    direction: Direction,
    input: &Path,
    output: &Path,
    option_pairs: &[String],
) -> anyhow::Result<()> {
    let options = parse_options(codec, option_pairs)?;
    let mut src = fs::File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut dst =
        fs::File::create(output).with_context(|| format!("creating {}", output.display()))?;

    crimp::splice(codec, direction, &mut dst, &mut src, 0, options.as_ref())
        .map_err(|e| anyhow!("{}: {e}", codec.name()))?;
    Ok(())
}

fn list() {
    crimp::foreach_plugin(&mut |plugin| {
        let licenses = plugin.licenses().join(", ");
        if licenses.is_empty() {
            println!("{}", plugin.name());
        } else {
            println!("{} ({licenses})", plugin.name());
        }
        plugin.foreach_codec(&mut |codec| {
            let ext = codec
                .extension()
                .map(|e| format!(" [.{e}]"))
                .unwrap_or_default();
            println!("  {}{ext} (priority {})", codec.name(), codec.priority());
        });
    });
}
