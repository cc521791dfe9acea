//! Composite format string validation (`{0}`, `{1,-8}`, `{2:yyyy}`).
//!
//! Braces are doubled to be taken literally. The scanner peels `{{` and `}}`
//! pairs strictly from left to right, so `{{0}` reads as a literal `{`, the
//! text `0` and then a stray `}`.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// Placeholder found in a format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatItem {
    /// Argument index.
    pub index: usize,
    /// Field width from `{index,alignment}`; negative means left-aligned.
    pub alignment: Option<i32>,
    /// Text after `:`, passed through without interpretation.
    pub subformat: Option<String>,
    /// Byte offset of the opening brace.
    pub position: usize,
}

/// Why a format string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErrorKind {
    /// `{` without a matching `}` before the end of input.
    UnterminatedPlaceholder,
    /// `}` that is neither doubled nor closing a placeholder.
    UnmatchedClosingBrace,
    /// `{}` with nothing inside.
    EmptyPlaceholder,
    /// The placeholder does not start with a decimal index.
    InvalidIndex,
    /// `,` not followed by a signed decimal width.
    InvalidAlignment,
}

impl fmt::Display for FormatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FormatErrorKind::UnterminatedPlaceholder => "unterminated placeholder",
            FormatErrorKind::UnmatchedClosingBrace => "unmatched closing brace",
            FormatErrorKind::EmptyPlaceholder => "empty placeholder",
            FormatErrorKind::InvalidIndex => "invalid placeholder index",
            FormatErrorKind::InvalidAlignment => "invalid placeholder alignment",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at byte {position}")]
pub struct FormatError {
    pub kind: FormatErrorKind,
    pub position: usize,
}

/// Scan result for one message string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatValidator {
    items: Vec<FormatItem>,
    outcome: Result<(), FormatError>,
}

impl FormatValidator {
    /// Scans `text`; absent or empty input is valid and has no placeholders.
    pub fn new(text: Option<&str>) -> Self {
        let mut scanner = Scanner {
            bytes: text.unwrap_or_default().as_bytes(),
            source: text.unwrap_or_default(),
            pos: 0,
            items: Vec::new(),
        };
        let outcome = scanner.run();
        Self {
            items: scanner.items,
            outcome,
        }
    }

    /// Returns `true` when `text` is a valid format string with at least one placeholder.
    pub fn is_format_string(text: Option<&str>) -> bool {
        let validator = Self::new(text);
        validator.contains_format() && validator.validate().is_ok()
    }

    pub fn contains_format(&self) -> bool {
        !self.items.is_empty()
    }

    /// Placeholders in order of appearance, up to the first error.
    pub fn format_items(&self) -> &[FormatItem] {
        &self.items
    }

    pub fn placeholder_indices(&self) -> BTreeSet<usize> {
        self.items.iter().map(|item| item.index).collect()
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        self.outcome
    }
}

struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    items: Vec<FormatItem>,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn run(&mut self) -> Result<(), FormatError> {
        while let Some(byte) = self.peek() {
            match byte {
                b'{' if self.bytes.get(self.pos + 1) == Some(&b'{') => self.pos += 2,
                b'}' if self.bytes.get(self.pos + 1) == Some(&b'}') => self.pos += 2,
                b'{' => {
                    let item = self.placeholder()?;
                    self.items.push(item);
                }
                b'}' => return Err(self.error(FormatErrorKind::UnmatchedClosingBrace, self.pos)),
                _ => self.pos += 1,
            }
        }
        Ok(())
    }

    fn error(&self, kind: FormatErrorKind, position: usize) -> FormatError {
        FormatError { kind, position }
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn digits(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        &self.source[start..self.pos]
    }

    // Called with `pos` on an opening brace that is not doubled.
    fn placeholder(&mut self) -> Result<FormatItem, FormatError> {
        let open = self.pos;
        self.pos += 1;

        match self.peek() {
            None => return Err(self.error(FormatErrorKind::UnterminatedPlaceholder, open)),
            Some(b'}') => return Err(self.error(FormatErrorKind::EmptyPlaceholder, open)),
            _ => {}
        }

        let index = self
            .digits()
            .parse::<usize>()
            .map_err(|_| self.error(FormatErrorKind::InvalidIndex, open))?;
        self.skip_spaces();

        let mut alignment = None;
        if self.peek() == Some(b',') {
            self.pos += 1;
            self.skip_spaces();
            let start = self.pos;
            if self.peek() == Some(b'-') {
                self.pos += 1;
            }
            self.digits();
            let width = self.source[start..self.pos]
                .parse::<i32>()
                .map_err(|_| self.error(FormatErrorKind::InvalidAlignment, open))?;
            alignment = Some(width);
            self.skip_spaces();
        }

        let mut subformat = None;
        if self.peek() == Some(b':') {
            let start = self.pos + 1;
            let Some(len) = self.bytes[start..].iter().position(|&b| b == b'}') else {
                return Err(self.error(FormatErrorKind::UnterminatedPlaceholder, open));
            };
            subformat = Some(self.source[start..start + len].to_string());
            self.pos = start + len;
        }

        match self.peek() {
            Some(b'}') => {
                self.pos += 1;
                Ok(FormatItem {
                    index,
                    alignment,
                    subformat,
                    position: open,
                })
            }
            None => Err(self.error(FormatErrorKind::UnterminatedPlaceholder, open)),
            Some(_) if alignment.is_some() => {
                Err(self.error(FormatErrorKind::InvalidAlignment, open))
            }
            Some(_) => Err(self.error(FormatErrorKind::InvalidIndex, open)),
        }
    }
}
