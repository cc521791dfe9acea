//! Consistency checks run before a catalog is compiled or shipped.

use std::fmt;

use potools_format::{FormatError, FormatValidator};
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry};
use crate::config::CheckOptions;
use crate::escape::quote;

/// Which string of an entry an issue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePart {
    Msgid,
    MsgidPlural,
    Translation(usize),
}

impl fmt::Display for MessagePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessagePart::Msgid => f.write_str("msgid"),
            MessagePart::MsgidPlural => f.write_str("msgid_plural"),
            MessagePart::Translation(index) => write!(f, "msgstr[{index}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckIssue {
    InvalidFormat {
        msgid: String,
        context: Option<String>,
        part: MessagePart,
        error: FormatError,
    },
    /// A translation refers to an argument index the source strings never use.
    UnknownPlaceholder {
        msgid: String,
        context: Option<String>,
        part: MessagePart,
        index: usize,
    },
    PluralCountMismatch {
        msgid: String,
        context: Option<String>,
        expected: usize,
        found: usize,
    },
}

impl CheckIssue {
    pub fn msgid(&self) -> &str {
        match self {
            CheckIssue::InvalidFormat { msgid, .. }
            | CheckIssue::UnknownPlaceholder { msgid, .. }
            | CheckIssue::PluralCountMismatch { msgid, .. } => msgid,
        }
    }

    fn context(&self) -> Option<&str> {
        match self {
            CheckIssue::InvalidFormat { context, .. }
            | CheckIssue::UnknownPlaceholder { context, .. }
            | CheckIssue::PluralCountMismatch { context, .. } => context.as_deref(),
        }
    }
}

impl fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msgid {}", quote(self.msgid()))?;
        if let Some(context) = self.context() {
            write!(f, " (msgctxt {})", quote(context))?;
        }
        match self {
            CheckIssue::InvalidFormat { part, error, .. } => {
                write!(f, ": {part} is not a valid format string: {error}")
            }
            CheckIssue::UnknownPlaceholder { part, index, .. } => {
                write!(f, ": {part} uses placeholder {{{index}}} missing from the source text")
            }
            CheckIssue::PluralCountMismatch {
                expected, found, ..
            } => write!(f, ": expected {expected} plural forms, found {found}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub checked: usize,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// 檢查目錄內容的一致性。 / Runs the enabled checks over every entry.
pub fn check_catalog(catalog: &Catalog, options: &CheckOptions) -> CheckReport {
    let nplurals = catalog.plural_forms().nplurals();
    let mut report = CheckReport::default();

    for entry in catalog.entries() {
        report.checked += 1;
        let formatted = entry.has_flag(&options.format_flag);

        if formatted && options.check_format {
            check_formats(entry, &mut report.issues);
        }
        if formatted && options.check_placeholders {
            check_placeholders(entry, &mut report.issues);
        }
        if options.check_plural_counts
            && entry.has_plural()
            && entry.is_translated()
            && entry.translations().len() != nplurals
        {
            report.issues.push(CheckIssue::PluralCountMismatch {
                msgid: entry.msgid().to_string(),
                context: entry.context().map(str::to_string),
                expected: nplurals,
                found: entry.translations().len(),
            });
        }
    }

    debug!(checked = report.checked, issues = report.issues.len(), "catalog checked");
    report
}

fn parts(entry: &CatalogEntry) -> impl Iterator<Item = (MessagePart, &str)> {
    let sources = std::iter::once((MessagePart::Msgid, entry.msgid()))
        .chain(entry.msgid_plural().map(|plural| (MessagePart::MsgidPlural, plural)));
    let translations = entry
        .translations()
        .iter()
        .enumerate()
        .map(|(index, text)| (MessagePart::Translation(index), text.as_str()));
    sources.chain(translations)
}

fn check_formats(entry: &CatalogEntry, issues: &mut Vec<CheckIssue>) {
    for (part, text) in parts(entry) {
        if let Err(error) = FormatValidator::new(Some(text)).validate() {
            issues.push(CheckIssue::InvalidFormat {
                msgid: entry.msgid().to_string(),
                context: entry.context().map(str::to_string),
                part,
                error,
            });
        }
    }
}

fn check_placeholders(entry: &CatalogEntry, issues: &mut Vec<CheckIssue>) {
    let mut known = FormatValidator::new(Some(entry.msgid())).placeholder_indices();
    if let Some(plural) = entry.msgid_plural() {
        known.extend(FormatValidator::new(Some(plural)).placeholder_indices());
    }

    for (part, text) in parts(entry) {
        let MessagePart::Translation(_) = part else {
            continue;
        };
        for index in FormatValidator::new(Some(text)).placeholder_indices() {
            if !known.contains(&index) {
                issues.push(CheckIssue::UnknownPlaceholder {
                    msgid: entry.msgid().to_string(),
                    context: entry.context().map(str::to_string),
                    part,
                    index,
                });
            }
        }
    }
}
