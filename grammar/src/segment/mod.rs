use std::borrow::Cow;
use std::fmt;

use crate::error::TokenizeError;

/// Longest run of value characters kept in one segment; longer runs continue
/// in the next segment.
pub const MAX_RUN_LENGTH: usize = 256;

/// Prefix used by [`Segment::marked`] to tell quoted strings from bare runs.
pub const QUOTE_MARKER: char = '"';

/// One tokenized unit of an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Identifier, number or decimal: a run of `[A-Za-z0-9._]`.
    Run(String),
    /// Contents of a `"..."` string, quotes removed.
    Quoted(String),
    /// Any other single character, blanks included.
    Symbol(char),
}

impl Segment {
    pub fn is_quoted(&self) -> bool {
        matches!(self, Segment::Quoted(_))
    }

    /// A lone blank or tab.
    pub fn is_blank(&self) -> bool {
        matches!(self, Segment::Symbol(' ' | '\t'))
    }

    /// The segment text without any quote marker.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Segment::Run(s) | Segment::Quoted(s) => Cow::Borrowed(s),
            Segment::Symbol(c) => Cow::Owned(c.to_string()),
        }
    }

    /// The segment text, with quoted strings prefixed by [`QUOTE_MARKER`].
    pub fn marked(&self) -> Cow<'_, str> {
        match self {
            Segment::Quoted(s) => Cow::Owned(format!("{}{}", QUOTE_MARKER, s)),
            other => other.text(),
        }
    }

    /// Number of characters a literal node can step through, 0 for quoted strings.
    pub fn literal_len(&self) -> usize {
        match self {
            Segment::Run(s) => s.len(),
            Segment::Quoted(_) => 0,
            Segment::Symbol(_) => 1,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marked())
    }
}

/// Characters that form identifier/number/decimal runs.
pub fn is_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '_'
}

/// Characters an identifier may start with, also the placeholder-name alphabet.
pub fn is_strict_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Split a line into segments: value runs, quoted strings and single characters.
///
/// variable = 5     => `variable`, ` `, `=`, ` `, `5`
/// CallFunc(4,2)    => `CallFunc`, `(`, `4`, `,`, `2`, `)`
pub fn tokenize(line: &str) -> Result<Vec<Segment>, TokenizeError> {
    let mut segments = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if is_value_char(c) {
            let mut run = String::from(c);
            while let Some(&(_, next)) = chars.peek() {
                if !is_value_char(next) {
                    break;
                }
                // Value characters are ASCII, so byte length is character count
                if run.len() == MAX_RUN_LENGTH {
                    segments.push(Segment::Run(std::mem::take(&mut run)));
                }
                run.push(next);
                chars.next();
            }
            segments.push(Segment::Run(run));
        } else if c == '"' {
            let body = start + 1;
            let Some(len) = line[body..].find('"') else {
                return Err(TokenizeError {
                    span: start..line.len(),
                });
            };
            let close = body + len;
            segments.push(Segment::Quoted(line[body..close].to_string()));
            while chars.next_if(|&(idx, _)| idx <= close).is_some() {}
        } else {
            segments.push(Segment::Symbol(c));
        }
    }

    Ok(segments)
}
