//! Typed, schema-validated codec options.
//!
//! Every codec publishes a static [`OptionInfo`] table through its
//! implementation; an [`Options`] value is a dense array of values sized to
//! that table, populated with the schema defaults on creation.  Keys are
//! matched case-insensitively.  String values parse into typed values with
//! validation, including size suffixes (`K`/`M`/`G`, optionally followed by
//! `i` and/or `B`) and the usual spellings of booleans.

use std::borrow::Cow;

use crate::codec::Codec;
use crate::status::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

/// Constraint kind of a single option.
#[derive(Debug, Clone, Copy)]
pub enum OptionKind {
    Bool,
    String,
    Int,
    Size,
    /// A string drawn from a fixed set, each mapping to a backing integer.
    EnumString { values: &'static [(&'static str, i32)] },
    /// An integer drawn from a fixed set.
    EnumInt { values: &'static [i32] },
    /// An integer in `min..=max`; `modulus` (when nonzero) must divide the
    /// value; `allow_zero` admits zero regardless of the range.
    RangeInt {
        min: i32,
        max: i32,
        modulus: i32,
        allow_zero: bool,
    },
    /// Same as [`OptionKind::RangeInt`] over `usize`.
    RangeSize {
        min: usize,
        max: usize,
        modulus: usize,
        allow_zero: bool,
    },
}

/// One entry in a codec's option schema.
#[derive(Debug, Clone)]
pub struct OptionInfo {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: OptionValue,
}

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i32),
    Size(usize),
    String(Cow<'static, str>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// A set of option values for one codec.
#[derive(Debug, Clone)]
pub struct Options {
    codec: &'static Codec,
    values: Vec<OptionValue>,
}

impl Options {
    /// Create options for `codec`, populated with the schema defaults.
    ///
    /// Initializes the codec if it has not been initialized yet.  A codec
    /// with an empty schema yields an empty (but valid) set; every setter on
    /// it fails with [`Error::BadParam`].
    pub fn new(codec: &'static Codec) -> Result<Options> {
        let schema = codec.implementation()?.options;
        Ok(Options {
            codec,
            values: schema.iter().map(|o| o.default.clone()).collect(),
        })
    }

    #[inline]
    pub fn codec(&self) -> &'static Codec {
        self.codec
    }

    fn schema(&self) -> &'static [OptionInfo] {
        // The codec was initialized in `new`; a failure here cannot occur.
        self.codec
            .implementation()
            .map(|imp| imp.options)
            .unwrap_or(&[])
    }

    fn find(&self, key: &str) -> Option<usize> {
        self.schema()
            .iter()
            .position(|o| o.name.eq_ignore_ascii_case(key))
    }

    // ── getters ──────────────────────────────────────────────────────────────

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.find(key).and_then(|i| self.get_bool_at(i))
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.find(key).and_then(|i| self.get_int_at(i))
    }

    pub fn get_size(&self, key: &str) -> Option<usize> {
        self.find(key).and_then(|i| self.get_size_at(i))
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(move |i| self.get_string_at(i))
    }

    pub fn get_bool_at(&self, idx: usize) -> Option<bool> {
        match self.values.get(idx)? {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int_at(&self, idx: usize) -> Option<i32> {
        match self.values.get(idx)? {
            OptionValue::Int(v) => Some(*v),
            OptionValue::Bool(v) => Some(*v as i32),
            _ => None,
        }
    }

    pub fn get_size_at(&self, idx: usize) -> Option<usize> {
        match self.values.get(idx)? {
            OptionValue::Size(v) => Some(*v),
            _ => None,
        }
    }

    /// Retrieve a string value.  An `EnumString` option reports the name of
    /// its current value; values of other kinds are not serialized.
    pub fn get_string_at(&self, idx: usize) -> Option<&str> {
        let info = self.schema().get(idx)?;
        match (&info.kind, self.values.get(idx)?) {
            (OptionKind::String, OptionValue::String(s)) => Some(s.as_ref()),
            (OptionKind::EnumString { values }, OptionValue::Int(v)) => values
                .iter()
                .find(|(_, backing)| backing == v)
                .map(|(name, _)| *name),
            _ => None,
        }
    }

    // ── setters ──────────────────────────────────────────────────────────────

    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        let idx = self.find(key).ok_or(Error::BadParam)?;
        self.set_bool_at(idx, value)
    }

    pub fn set_int(&mut self, key: &str, value: i32) -> Result<()> {
        let idx = self.find(key).ok_or(Error::BadParam)?;
        self.set_int_at(idx, value)
    }

    pub fn set_size(&mut self, key: &str, value: usize) -> Result<()> {
        let idx = self.find(key).ok_or(Error::BadParam)?;
        self.set_size_at(idx, value)
    }

    pub fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        let idx = self.find(key).ok_or(Error::BadParam)?;
        self.set_string_at(idx, value)
    }

    pub fn set_bool_at(&mut self, idx: usize, value: bool) -> Result<()> {
        let info = self.schema().get(idx).ok_or(Error::BadParam)?;
        match info.kind {
            OptionKind::Bool => {
                self.values[idx] = OptionValue::Bool(value);
                Ok(())
            }
            _ => Err(Error::BadValue),
        }
    }

    pub fn set_int_at(&mut self, idx: usize, value: i32) -> Result<()> {
        let info = self.schema().get(idx).ok_or(Error::BadParam)?;
        match info.kind {
            OptionKind::Int => {
                self.values[idx] = OptionValue::Int(value);
                Ok(())
            }
            OptionKind::RangeInt {
                min,
                max,
                modulus,
                allow_zero,
            } => {
                if value == 0 && allow_zero {
                    self.values[idx] = OptionValue::Int(0);
                    return Ok(());
                }
                if value < min || value > max {
                    return Err(Error::BadValue);
                }
                if modulus != 0 && value % modulus != 0 {
                    return Err(Error::BadValue);
                }
                self.values[idx] = OptionValue::Int(value);
                Ok(())
            }
            OptionKind::EnumInt { values } => {
                if values.contains(&value) {
                    self.values[idx] = OptionValue::Int(value);
                    Ok(())
                } else {
                    Err(Error::BadValue)
                }
            }
            _ => Err(Error::BadValue),
        }
    }

    pub fn set_size_at(&mut self, idx: usize, value: usize) -> Result<()> {
        let info = self.schema().get(idx).ok_or(Error::BadParam)?;
        match info.kind {
            OptionKind::Size => {
                self.values[idx] = OptionValue::Size(value);
                Ok(())
            }
            OptionKind::RangeSize {
                min,
                max,
                modulus,
                allow_zero,
            } => {
                if value == 0 && allow_zero {
                    self.values[idx] = OptionValue::Size(0);
                    return Ok(());
                }
                if value < min || value > max {
                    return Err(Error::BadValue);
                }
                if modulus != 0 && value % modulus != 0 {
                    return Err(Error::BadValue);
                }
                self.values[idx] = OptionValue::Size(value);
                Ok(())
            }
            _ => Err(Error::BadValue),
        }
    }

    pub fn set_string_at(&mut self, idx: usize, value: &str) -> Result<()> {
        let info = self.schema().get(idx).ok_or(Error::BadParam)?;
        match info.kind {
            OptionKind::String => {
                self.values[idx] = OptionValue::String(Cow::Owned(value.to_owned()));
                Ok(())
            }
            OptionKind::EnumString { values } => {
                for (name, backing) in values {
                    if name.eq_ignore_ascii_case(value) {
                        self.values[idx] = OptionValue::Int(*backing);
                        return Ok(());
                    }
                }
                Err(Error::BadValue)
            }
            _ => Err(Error::BadValue),
        }
    }

    /// Parse a single `key = value` pair of strings into a typed value.
    ///
    /// Unknown keys fail with [`Error::BadParam`]; malformed values with
    /// [`Error::BadValue`]; well-formed values outside the representable
    /// range with [`Error::Range`].
    pub fn parse_option(&mut self, key: &str, value: &str) -> Result<()> {
        let idx = self.find(key).ok_or(Error::BadParam)?;
        let info = &self.schema()[idx];

        match info.kind {
            OptionKind::Int | OptionKind::EnumInt { .. } | OptionKind::RangeInt { .. } => {
                self.set_int_at(idx, parse_int(value)?)
            }
            OptionKind::Size | OptionKind::RangeSize { .. } => {
                self.set_size_at(idx, parse_size(value)?)
            }
            OptionKind::String | OptionKind::EnumString { .. } => self.set_string_at(idx, value),
            OptionKind::Bool => self.set_bool_at(idx, parse_bool(value)?),
        }
    }

    /// Parse a sequence of `key = value` pairs; stops at the first failure.
    pub fn parse_all<'a, I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in pairs {
            self.parse_option(key, value)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin-side accessors
//
// Shape entry points receive `Option<&Options>`; these helpers fall back to
// the schema default when the caller passed no options.
// ─────────────────────────────────────────────────────────────────────────────

fn default_at(codec: &Codec, idx: usize) -> Option<OptionValue> {
    let schema = codec.implementation().ok()?.options;
    schema.get(idx).map(|o| o.default.clone())
}

/// Integer value of the option at `idx`, or the schema default.
pub fn get_int_at(options: Option<&Options>, codec: &Codec, idx: usize) -> i32 {
    if let Some(opts) = options {
        if let Some(v) = opts.get_int_at(idx) {
            return v;
        }
    }
    match default_at(codec, idx) {
        Some(OptionValue::Int(v)) => v,
        Some(OptionValue::Bool(v)) => v as i32,
        _ => -1,
    }
}

/// Boolean value of the option at `idx`, or the schema default.
pub fn get_bool_at(options: Option<&Options>, codec: &Codec, idx: usize) -> bool {
    if let Some(opts) = options {
        if let Some(v) = opts.get_bool_at(idx) {
            return v;
        }
    }
    matches!(default_at(codec, idx), Some(OptionValue::Bool(true)))
}

/// Size value of the option at `idx`, or the schema default.
pub fn get_size_at(options: Option<&Options>, codec: &Codec, idx: usize) -> usize {
    if let Some(opts) = options {
        if let Some(v) = opts.get_size_at(idx) {
            return v;
        }
    }
    match default_at(codec, idx) {
        Some(OptionValue::Size(v)) => v,
        _ => 0,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// String parsing
// ─────────────────────────────────────────────────────────────────────────────

fn parse_int(value: &str) -> Result<i32> {
    let t = value.trim();
    let (neg, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let parsed: i64 = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| Error::BadValue)?
    } else {
        digits.parse::<i64>().map_err(|_| Error::BadValue)?
    };
    let signed = if neg { -parsed } else { parsed };
    if signed > i32::MAX as i64 || signed < i32::MIN as i64 {
        return Err(Error::Range);
    }
    Ok(signed as i32)
}

/// Parse `N`, `Nk`, `NM`, `NGiB`, etc. into a size in bytes.
fn parse_size(value: &str) -> Result<usize> {
    let t = value.trim();
    let digits_end = t.find(|c: char| !c.is_ascii_digit()).unwrap_or(t.len());
    if digits_end == 0 {
        return Err(Error::BadValue);
    }
    let magnitude: u64 = t[..digits_end].parse().map_err(|_| Error::BadValue)?;
    let mut rest = t[digits_end..].chars().peekable();

    let mut result = magnitude;
    if let Some(&suffix) = rest.peek() {
        let shift = match suffix {
            'k' | 'K' => 10,
            'm' | 'M' => 20,
            'g' | 'G' => 30,
            _ => return Err(Error::BadValue),
        };
        rest.next();
        result = magnitude.checked_shl(shift).ok_or(Error::Range)?;
        if magnitude != 0 && result >> shift != magnitude {
            return Err(Error::Range);
        }

        let mut require_b = false;
        if rest.peek() == Some(&'i') || rest.peek() == Some(&'I') {
            rest.next();
            require_b = true;
        }
        if rest.peek() == Some(&'b') || rest.peek() == Some(&'B') {
            rest.next();
        } else if require_b {
            return Err(Error::BadValue);
        }
    }
    if rest.next().is_some() {
        return Err(Error::BadValue);
    }

    if result > usize::MAX as u64 {
        return Err(Error::Range);
    }
    Ok(result as usize)
}

fn parse_bool(value: &str) -> Result<bool> {
    const TRUE_WORDS: &[&str] = &["true", "yes", "on", "t", "y", "1"];
    const FALSE_WORDS: &[&str] = &["false", "no", "off", "f", "n", "0"];

    if TRUE_WORDS.iter().any(|w| w.eq_ignore_ascii_case(value)) {
        Ok(true)
    } else if FALSE_WORDS.iter().any(|w| w.eq_ignore_ascii_case(value)) {
        Ok(false)
    } else {
        Err(Error::BadValue)
    }
}

#[cfg(test)]
mod schema_tests {
    use super::*;
    use crate::codec::{Codec, CodecImpl, CodecInfo};
    use crate::plugin::PluginRegistration;
    use crate::status::Result;

    static TEST_REGISTRATION: PluginRegistration = PluginRegistration {
        name: "opt-test",
        manifest: "",
        init_codec,
    };

    static SCHEMA: &[OptionInfo] = &[
        OptionInfo {
            name: "checked",
            kind: OptionKind::Bool,
            default: OptionValue::Bool(false),
        },
        OptionInfo {
            name: "label",
            kind: OptionKind::String,
            default: OptionValue::String(std::borrow::Cow::Borrowed("plain")),
        },
        OptionInfo {
            name: "stepped",
            kind: OptionKind::RangeInt {
                min: 4,
                max: 64,
                modulus: 4,
                allow_zero: true,
            },
            default: OptionValue::Int(8),
        },
        OptionInfo {
            name: "block",
            kind: OptionKind::RangeSize {
                min: 1024,
                max: 1 << 20,
                modulus: 1024,
                allow_zero: false,
            },
            default: OptionValue::Size(4096),
        },
        OptionInfo {
            name: "family",
            kind: OptionKind::EnumString {
                values: &[("alpha", 10), ("beta", 20)],
            },
            default: OptionValue::Int(10),
        },
        OptionInfo {
            name: "codepage",
            kind: OptionKind::EnumInt {
                values: &[437, 850, 1252],
            },
            default: OptionValue::Int(437),
        },
    ];

    fn copy(_c: &'static Codec, dst: &mut [u8], src: &[u8], _o: Option<&Options>) -> Result<usize> {
        dst[..src.len()].copy_from_slice(src);
        Ok(src.len())
    }

    fn init_codec(_codec: &Codec) -> Result<CodecImpl> {
        let mut imp = CodecImpl::new(CodecInfo::NONE, |_, n| n);
        imp.options = SCHEMA;
        imp.compress_buffer = Some(copy);
        imp.decompress_buffer = Some(copy);
        Ok(imp)
    }

    fn test_codec() -> &'static Codec {
        Box::leak(Box::new(Codec::new(
            "opt-test",
            "opt-test",
            Some(&TEST_REGISTRATION),
        )))
    }

    #[test]
    fn defaults_come_from_the_schema() {
        let opts = Options::new(test_codec()).unwrap();
        assert_eq!(opts.get_bool("checked"), Some(false));
        assert_eq!(opts.get_string("label"), Some("plain"));
        assert_eq!(opts.get_int("stepped"), Some(8));
        assert_eq!(opts.get_size("block"), Some(4096));
        assert_eq!(opts.get_string("family"), Some("alpha"));
        assert_eq!(opts.get_int("codepage"), Some(437));
    }

    #[test]
    fn range_int_honors_bounds_modulus_and_zero() {
        let mut opts = Options::new(test_codec()).unwrap();
        opts.set_int("stepped", 16).unwrap();
        assert_eq!(opts.get_int("stepped"), Some(16));
        assert_eq!(opts.set_int("stepped", 2), Err(Error::BadValue));
        assert_eq!(opts.set_int("stepped", 65), Err(Error::BadValue));
        assert_eq!(opts.set_int("stepped", 18), Err(Error::BadValue), "modulus");
        opts.set_int("stepped", 0).unwrap();
        assert_eq!(opts.get_int("stepped"), Some(0), "allow_zero");
    }

    #[test]
    fn range_size_honors_bounds_and_suffix_parsing() {
        let mut opts = Options::new(test_codec()).unwrap();
        opts.parse_option("block", "64K").unwrap();
        assert_eq!(opts.get_size("block"), Some(64 * 1024));
        assert_eq!(opts.parse_option("block", "0"), Err(Error::BadValue));
        assert_eq!(opts.parse_option("block", "1500"), Err(Error::BadValue), "modulus");
        assert_eq!(opts.parse_option("block", "2M"), Err(Error::BadValue), "above max");
    }

    #[test]
    fn enum_int_accepts_only_listed_values() {
        let mut opts = Options::new(test_codec()).unwrap();
        opts.parse_option("codepage", "850").unwrap();
        assert_eq!(opts.get_int("codepage"), Some(850));
        assert_eq!(opts.set_int("codepage", 851), Err(Error::BadValue));
    }

    #[test]
    fn enum_string_maps_names_case_insensitively() {
        let mut opts = Options::new(test_codec()).unwrap();
        opts.set_string("family", "BETA").unwrap();
        assert_eq!(opts.get_int("family"), Some(20));
        assert_eq!(opts.get_string("family"), Some("beta"));
        assert_eq!(opts.set_string("family", "gamma"), Err(Error::BadValue));
    }

    #[test]
    fn type_mismatches_are_bad_values() {
        let mut opts = Options::new(test_codec()).unwrap();
        assert_eq!(opts.set_int("checked", 1), Err(Error::BadValue));
        assert_eq!(opts.set_bool("stepped", true), Err(Error::BadValue));
        assert_eq!(opts.set_string("block", "big"), Err(Error::BadValue));
    }

    #[test]
    fn unknown_keys_are_bad_params() {
        let mut opts = Options::new(test_codec()).unwrap();
        assert_eq!(opts.set_int("missing", 1), Err(Error::BadParam));
        assert_eq!(opts.parse_option("missing", "1"), Err(Error::BadParam));
    }

    #[test]
    fn plugin_side_accessors_fall_back_to_defaults() {
        let codec = test_codec();
        assert_eq!(get_int_at(None, codec, 2), 8);
        assert_eq!(get_bool_at(None, codec, 0), false);
        assert_eq!(get_size_at(None, codec, 3), 4096);

        let mut opts = Options::new(codec).unwrap();
        opts.set_int("stepped", 32).unwrap();
        assert_eq!(get_int_at(Some(&opts), codec, 2), 32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_decimal_and_hex() {
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int("-7").unwrap(), -7);
        assert_eq!(parse_int("0x10").unwrap(), 16);
        assert_eq!(parse_int("4294967296"), Err(Error::Range));
        assert_eq!(parse_int("nope"), Err(Error::BadValue));
    }

    #[test]
    fn parse_size_suffixes() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("4K").unwrap(), 4096);
        assert_eq!(parse_size("4KiB").unwrap(), 4096);
        assert_eq!(parse_size("2m").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("1x"), Err(Error::BadValue));
        assert_eq!(parse_size("1KQ"), Err(Error::BadValue));
        assert_eq!(parse_size(""), Err(Error::BadValue));
    }

    #[test]
    fn parse_bool_words() {
        for word in ["true", "YES", "On", "t", "y", "1"] {
            assert_eq!(parse_bool(word).unwrap(), true, "{word}");
        }
        for word in ["false", "NO", "Off", "f", "n", "0"] {
            assert_eq!(parse_bool(word).unwrap(), false, "{word}");
        }
        assert_eq!(parse_bool("maybe"), Err(Error::BadValue));
    }
}
