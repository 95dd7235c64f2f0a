//! Restricted INI parser for plugin manifests.
//!
//! The dialect is deliberately small: `[section]` headers, `key = value`
//! pairs, `#` comments, and backslash escapes for `n`, `t`, `r`, `"`, `\`,
//! `[`, `]` and `=`.  Section names are codec names; keys and values are
//! reported through a caller-supplied callback as they are parsed.

use core::fmt;

/// One parse event.
#[derive(Debug, PartialEq, Eq)]
pub enum IniEvent<'a> {
    /// A `[section]` header was opened.
    Section(&'a str),
    /// A `key = value` pair, within `section` if one is open.
    Pair {
        section: Option<&'a str>,
        key: &'a str,
        value: &'a str,
    },
}

/// Parse failure, with the 1-based line it occurred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IniError {
    InvalidEscape { line: usize },
    UnexpectedChar { line: usize },
    UnexpectedEof { line: usize },
}

impl fmt::Display for IniError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IniError::InvalidEscape { line } => write!(f, "invalid escape sequence on line {line}"),
            IniError::UnexpectedChar { line } => write!(f, "unexpected character on line {line}"),
            IniError::UnexpectedEof { line } => write!(f, "unexpected end of file on line {line}"),
        }
    }
}

impl std::error::Error for IniError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    None,
    Section,
    Key,
    Value,
}

/// Parse `text`, invoking `sink` for each section header and key/value pair.
///
/// The callback returns `true` to continue parsing or `false` to stop early
/// (which is not an error).
pub fn parse(text: &str, sink: &mut dyn FnMut(IniEvent<'_>) -> bool) -> Result<(), IniError> {
    let mut section: Option<String> = None;

    for (line_idx, line) in text.lines().enumerate() {
        let line_num = line_idx + 1;
        let mut state = LineState::None;
        let mut escaped = false;
        let mut current = String::new();
        let mut key = String::new();
        let mut section_done = false;

        for ch in line.chars() {
            if section_done {
                // Everything after a closed `[section]` header is ignored.
                break;
            }
            if escaped {
                let resolved = match ch {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '"' | '\\' | '[' | ']' | '=' => ch,
                    _ => return Err(IniError::InvalidEscape { line: line_num }),
                };
                current.push(resolved);
                escaped = false;
                continue;
            }
            if ch == '\\' {
                escaped = true;
                continue;
            }

            match state {
                LineState::None => {
                    if ch == '#' {
                        break;
                    } else if ch == '[' {
                        state = LineState::Section;
                    } else if ch.is_alphanumeric() || ch == '_' {
                        state = LineState::Key;
                        current.push(ch);
                    } else if !ch.is_whitespace() {
                        return Err(IniError::UnexpectedChar { line: line_num });
                    }
                }
                LineState::Section => {
                    if ch == ']' {
                        let name = current.trim().to_owned();
                        if !sink(IniEvent::Section(&name)) {
                            return Ok(());
                        }
                        section = Some(name);
                        current.clear();
                        state = LineState::None;
                        section_done = true;
                    } else {
                        current.push(ch);
                    }
                }
                LineState::Key => {
                    if ch == '=' {
                        key = current.trim().to_owned();
                        current.clear();
                        state = LineState::Value;
                    } else {
                        current.push(ch);
                    }
                }
                LineState::Value => {
                    if !current.is_empty() || !ch.is_whitespace() {
                        current.push(ch);
                    }
                }
            }
        }

        if escaped {
            return Err(IniError::UnexpectedEof { line: line_num });
        }
        match state {
            LineState::Value => {
                let value = current.trim_end().to_owned();
                if !sink(IniEvent::Pair {
                    section: section.as_deref(),
                    key: &key,
                    value: &value,
                }) {
                    return Ok(());
                }
            }
            LineState::None => {}
            LineState::Section | LineState::Key => {
                return Err(IniError::UnexpectedChar { line: line_num });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> Result<Vec<(Option<String>, String, String)>, IniError> {
        let mut out = Vec::new();
        parse(text, &mut |ev| {
            match ev {
                IniEvent::Section(name) => out.push((None, "[section]".to_owned(), name.to_owned())),
                IniEvent::Pair { section, key, value } => out.push((
                    section.map(str::to_owned),
                    key.to_owned(),
                    value.to_owned(),
                )),
            }
            true
        })?;
        Ok(out)
    }

    #[test]
    fn sections_and_pairs() {
        let events = collect("[lz4]\npriority = 60\nextension = lz4\n").unwrap();
        assert_eq!(events[0], (None, "[section]".to_owned(), "lz4".to_owned()));
        assert_eq!(
            events[1],
            (Some("lz4".to_owned()), "priority".to_owned(), "60".to_owned())
        );
        assert_eq!(
            events[2],
            (Some("lz4".to_owned()), "extension".to_owned(), "lz4".to_owned())
        );
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let events = collect("# a comment\n\n[c]\n# another\nkey = value\n").unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn escapes_resolve() {
        let events = collect("[s]\nkey = a\\nb\\tc\\\\d\\=e\n").unwrap();
        assert_eq!(events[1].2, "a\nb\tc\\d=e");
    }

    #[test]
    fn invalid_escape_is_an_error() {
        assert_eq!(
            collect("[s]\nkey = \\q\n"),
            Err(IniError::InvalidEscape { line: 2 })
        );
    }

    #[test]
    fn key_without_equals_is_an_error() {
        assert_eq!(collect("[s]\norphan\n"), Err(IniError::UnexpectedChar { line: 2 }));
    }

    #[test]
    fn unterminated_section_is_an_error() {
        assert_eq!(collect("[oops\n"), Err(IniError::UnexpectedChar { line: 1 }));
    }

    #[test]
    fn values_keep_interior_whitespace() {
        let events = collect("[s]\nkey = two  words \n").unwrap();
        assert_eq!(events[1].2, "two  words");
    }

    #[test]
    fn multiple_sections_switch_context() {
        let events = collect("[a]\nx = 1\n[b]\nx = 2\n").unwrap();
        assert_eq!(events[1].0.as_deref(), Some("a"));
        assert_eq!(events[3].0.as_deref(), Some("b"));
    }
}
