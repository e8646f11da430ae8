//! scanf-style pattern scanner for response lines.
//!
//! The modem's responses are short formatted lines (`+CREG: 0,1`,
//! `2, CONNECT OK`). This module extracts their fields against a pattern
//! with `%d` (signed integer) and `%s` (non-whitespace run) conversions,
//! both accepting an optional width (`%2s`). A space in the pattern matches
//! any run of whitespace in the input, including none. `%%` matches a
//! literal percent sign.

/// A single field captured from a response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// Field captured by a `%d` conversion.
    Int(i64),
    /// Field captured by a `%s` conversion.
    Text(String),
}

impl Capture {
    /// Returns the integer value if this field was captured by `%d`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Capture::Int(value) => Some(*value),
            Capture::Text(_) => None,
        }
    }

    /// Returns the text if this field was captured by `%s`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Capture::Int(_) => None,
            Capture::Text(text) => Some(text),
        }
    }
}

/// Matches `input` against `pattern` with sscanf semantics: returns the
/// fields captured before the first mismatch. Callers compare the count
/// against the arity they expect. Trailing input beyond the pattern is
/// ignored.
pub fn scan(input: &str, pattern: &str) -> Vec<Capture> {
    let (captures, _) = run(input, pattern);
    captures
}

/// Like [`scan`], but succeeds only when the entire pattern was consumed.
///
/// Use this where a trailing literal is load-bearing: `%d, CLOSE OK` must
/// not accept `4, CLOSED`, even though both yield one capture under plain
/// sscanf rules.
pub fn scan_all(input: &str, pattern: &str) -> Option<Vec<Capture>> {
    let (captures, complete) = run(input, pattern);
    complete.then_some(captures)
}

fn run(input: &str, pattern: &str) -> (Vec<Capture>, bool) {
    let mut captures = Vec::new();
    let input = input.as_bytes();
    let mut pos = 0usize;
    let mut pat = pattern.as_bytes().iter().peekable();

    while let Some(&p) = pat.next() {
        match p {
            b' ' => {
                while pos < input.len() && input[pos].is_ascii_whitespace() {
                    pos += 1;
                }
            }
            b'%' => {
                // Optional width prefix, then the conversion character.
                let mut width = 0usize;
                while let Some(&&d) = pat.peek() {
                    if d.is_ascii_digit() {
                        width = width * 10 + (d - b'0') as usize;
                        pat.next();
                    } else {
                        break;
                    }
                }
                let limit = if width == 0 { usize::MAX } else { width };
                match pat.next() {
                    Some(b'd') => {
                        while pos < input.len() && input[pos].is_ascii_whitespace() {
                            pos += 1;
                        }
                        let start = pos;
                        let mut taken = 0usize;
                        if pos < input.len()
                            && (input[pos] == b'-' || input[pos] == b'+')
                            && taken < limit
                        {
                            pos += 1;
                            taken += 1;
                        }
                        let digits_start = pos;
                        while pos < input.len() && input[pos].is_ascii_digit() && taken < limit {
                            pos += 1;
                            taken += 1;
                        }
                        if pos == digits_start {
                            return (captures, false);
                        }
                        let text = std::str::from_utf8(&input[start..pos]).unwrap_or("");
                        match text.parse::<i64>() {
                            Ok(value) => captures.push(Capture::Int(value)),
                            Err(_) => return (captures, false),
                        }
                    }
                    Some(b's') => {
                        while pos < input.len() && input[pos].is_ascii_whitespace() {
                            pos += 1;
                        }
                        let start = pos;
                        let mut taken = 0usize;
                        while pos < input.len()
                            && !input[pos].is_ascii_whitespace()
                            && taken < limit
                        {
                            pos += 1;
                            taken += 1;
                        }
                        if pos == start {
                            return (captures, false);
                        }
                        let text = String::from_utf8_lossy(&input[start..pos]).into_owned();
                        captures.push(Capture::Text(text));
                    }
                    Some(b'%') => {
                        if pos < input.len() && input[pos] == b'%' {
                            pos += 1;
                        } else {
                            return (captures, false);
                        }
                    }
                    _ => return (captures, false),
                }
            }
            literal => {
                if pos < input.len() && input[pos] == literal {
                    pos += 1;
                } else {
                    return (captures, false);
                }
            }
        }
    }

    (captures, true)
}
