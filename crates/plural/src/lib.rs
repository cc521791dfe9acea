//! Compiler and evaluator for gettext `Plural-Forms` headers.
//!
//! A header such as `nplurals=3; plural=(n%10==1 && n%100!=11 ? 0 : 1);` is
//! compiled once into an immutable [`Expr`] tree. Evaluation is a pure
//! recursive walk, so a [`PluralForms`] value can be shared freely between
//! threads and lookups.

mod expr;
mod parser;

use std::fmt;

use thiserror::Error;
use tracing::debug;

pub use expr::{BinaryOp, Expr, UnaryOp};

/// Header value of the two-form rule used when a catalog declares nothing usable.
pub const DEFAULT_PLURAL_FORMS: &str = "nplurals=2; plural=(n != 1);";

/// Reasons a `Plural-Forms` header cannot be compiled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PluralFormsError {
    #[error("missing nplurals field")]
    MissingNPlurals,
    #[error("nplurals must be a positive integer, got `{0}`")]
    InvalidNPlurals(String),
    #[error("missing plural expression")]
    MissingExpression,
    #[error("unexpected character `{ch}` at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("integer literal at offset {offset} does not fit in 64 bits")]
    LiteralOverflow { offset: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token `{found}` at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },
    #[error("parenthesis opened at offset {offset} is never closed")]
    UnclosedParen { offset: usize },
    #[error("expression nested too deeply at offset {offset}")]
    TooDeep { offset: usize },
}

/// Compiled plural rule: the number of forms plus the index expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluralForms {
    nplurals: usize,
    expr: Expr,
}

impl PluralForms {
    /// Compiles a header value, returning `None` when it is malformed in any way.
    ///
    /// Callers usually fall back to [`PluralForms::default`].
    pub fn make(header: &str) -> Option<Self> {
        match Self::parse(header) {
            Ok(forms) => Some(forms),
            Err(err) => {
                debug!(header, error = %err, "rejected Plural-Forms header");
                None
            }
        }
    }

    /// Compiles a header value such as `nplurals=2; plural=(n != 1);`.
    ///
    /// Trailing `;`, whitespace, newlines and the two-character `\n` escape are
    /// accepted in any combination.
    pub fn parse(header: &str) -> Result<Self, PluralFormsError> {
        let normalized = strip_terminators(header).replace("\\n", "\n");

        let mut nplurals = None;
        let mut plural = None;
        for field in normalized.split([';', '\n']) {
            let Some((key, value)) = field.split_once('=') else {
                continue;
            };
            match key.trim() {
                "nplurals" => nplurals = Some(value.trim()),
                "plural" => plural = Some(value.trim()),
                _ => {}
            }
        }

        let raw_count = nplurals.ok_or(PluralFormsError::MissingNPlurals)?;
        let nplurals = match raw_count.parse::<usize>() {
            Ok(count) if count > 0 => count,
            _ => return Err(PluralFormsError::InvalidNPlurals(raw_count.to_string())),
        };

        let source = plural
            .filter(|value| !value.is_empty())
            .ok_or(PluralFormsError::MissingExpression)?;
        Self::from_expression(nplurals, source)
    }

    /// Compiles a bare expression for a known number of forms.
    pub fn from_expression(nplurals: usize, expression: &str) -> Result<Self, PluralFormsError> {
        if nplurals == 0 {
            return Err(PluralFormsError::InvalidNPlurals(nplurals.to_string()));
        }
        let expr = parser::compile(expression)?;
        Ok(Self { nplurals, expr })
    }

    /// Number of plural forms, always at least one.
    pub fn nplurals(&self) -> usize {
        self.nplurals
    }

    pub fn expression(&self) -> &Expr {
        &self.expr
    }

    /// Raw result of the expression for `n`; may lie outside `0..nplurals`.
    ///
    /// Counts above `i64::MAX` are evaluated as `i64::MAX`.
    pub fn evaluate(&self, n: u64) -> i64 {
        self.expr.evaluate(i64::try_from(n).unwrap_or(i64::MAX))
    }

    /// Plural form index for `n`. Results outside `0..nplurals` map to form 0.
    pub fn index(&self, n: u64) -> usize {
        match usize::try_from(self.evaluate(n)) {
            Ok(index) if index < self.nplurals => index,
            _ => 0,
        }
    }
}

impl Default for PluralForms {
    fn default() -> Self {
        Self {
            nplurals: 2,
            expr: Expr::binary(BinaryOp::Ne, Expr::Var, Expr::Literal(1)),
        }
    }
}

impl fmt::Display for PluralForms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nplurals={}; plural={};", self.nplurals, self.expr)
    }
}

fn strip_terminators(mut header: &str) -> &str {
    loop {
        let trimmed = header
            .trim_end()
            .trim_end_matches(';')
            .trim_end_matches("\\n");
        if trimmed.len() == header.len() {
            return trimmed;
        }
        header = trimmed;
    }
}
