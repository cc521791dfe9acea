//! In-memory model of a gettext catalog.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use potools_plural::PluralForms;
use tracing::{debug, warn};

use crate::source::LineEnding;

/// Separator between context and msgid in flat lookup keys (GNU convention).
pub const CONTEXT_SEPARATOR: char = '\u{4}';

/// 組合查詢鍵。 / Builds the flat lookup key for an optional context and a msgid.
pub fn message_key<'a>(context: Option<&str>, msgid: &'a str) -> Cow<'a, str> {
    match context {
        Some(context) => Cow::Owned(format!("{context}{CONTEXT_SEPARATOR}{msgid}")),
        None => Cow::Borrowed(msgid),
    }
}

/// 目錄中的一筆翻譯。 / One translatable message of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    pub(crate) msgid: String,
    pub(crate) msgid_plural: Option<String>,
    pub(crate) translations: Vec<String>,
    pub(crate) flags: String,
    pub(crate) references: Vec<String>,
    pub(crate) comment: String,
    pub(crate) auto_comments: Vec<String>,
    pub(crate) context: Option<String>,
}

impl CatalogEntry {
    pub fn msgid(&self) -> &str {
        &self.msgid
    }

    pub fn msgid_plural(&self) -> Option<&str> {
        self.msgid_plural.as_deref()
    }

    pub fn translations(&self) -> &[String] {
        &self.translations
    }

    pub fn translation(&self, index: usize) -> Option<&str> {
        self.translations.get(index).map(String::as_str)
    }

    /// Raw flags text, e.g. `fuzzy, csharp-format`.
    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn auto_comments(&self) -> &[String] {
        &self.auto_comments
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn has_plural(&self) -> bool {
        self.msgid_plural.as_deref().is_some_and(|plural| !plural.is_empty())
    }

    pub fn is_translated(&self) -> bool {
        self.translations.iter().any(|text| !text.is_empty())
    }

    /// An empty `msgctxt ""` still counts as a context.
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags
            .split(',')
            .map(str::trim)
            .any(|token| token == flag)
    }

    pub fn is_fuzzy(&self) -> bool {
        self.has_flag("fuzzy")
    }

    /// Whether the entry carries the `<language>-format` flag.
    pub fn is_in_format(&self, language: &str) -> bool {
        self.has_flag(&format!("{language}-format"))
    }

    /// `(context, msgid)` pair identifying the entry.
    pub fn lookup_key(&self) -> (Option<&str>, &str) {
        (self.context(), &self.msgid)
    }

    /// Flat key: `context` + U+0004 + `msgid`, or just `msgid`.
    pub fn key(&self) -> Cow<'_, str> {
        message_key(self.context(), &self.msgid)
    }
}

/// 以 `#~` 保留的過時記錄。 / Obsolete record preserved as `#~` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDeletedEntry {
    pub(crate) lines: Vec<String>,
    pub(crate) flags: String,
    pub(crate) comment: String,
    pub(crate) auto_comments: Vec<String>,
}

impl CatalogDeletedEntry {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn auto_comments(&self) -> &[String] {
        &self.auto_comments
    }
}

/// Entry counters for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: usize,
    pub plural: usize,
    pub translated: usize,
    pub untranslated: usize,
    pub fuzzy: usize,
    pub with_context: usize,
    pub deleted: usize,
}

/// 單一語系的翻譯目錄。 / Translation catalog for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) header_comment: String,
    pub(crate) entries: Vec<CatalogEntry>,
    pub(crate) deleted: Vec<CatalogDeletedEntry>,
    pub(crate) encoding: Option<String>,
    pub(crate) line_ending: LineEnding,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            header_comment: String::new(),
            entries: Vec::new(),
            deleted: Vec::new(),
            encoding: None,
            line_ending: LineEnding::platform_default(),
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in source order; the header record is never among them.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn deleted_entries(&self) -> &[CatalogDeletedEntry] {
        &self.deleted
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn header_comment(&self) -> &str {
        &self.header_comment
    }

    /// Name of the encoding the catalog was decoded with, when loaded from bytes.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// `charset=` value of the `Content-Type` header.
    pub fn declared_charset(&self) -> Option<&str> {
        self.header("Content-Type")
            .and_then(crate::charset::charset_from_content_type)
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn plural_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.has_plural()).count()
    }

    pub fn plural_forms_header(&self) -> Option<&str> {
        self.header("Plural-Forms")
    }

    /// 編譯複數規則；無效或缺少時回傳預設規則。 / Compiles the plural rule, falling back to the two-form default.
    pub fn plural_forms(&self) -> PluralForms {
        let Some(header) = self.plural_forms_header() else {
            return PluralForms::default();
        };
        match PluralForms::parse(header) {
            Ok(forms) => forms,
            Err(err) => {
                warn!(header, error = %err, "invalid Plural-Forms header, using default rule");
                PluralForms::default()
            }
        }
    }

    pub fn find(&self, context: Option<&str>, msgid: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.context() == context && entry.msgid == msgid)
    }

    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            total: self.entries.len(),
            deleted: self.deleted.len(),
            ..CatalogStats::default()
        };
        for entry in &self.entries {
            if entry.has_plural() {
                stats.plural += 1;
            }
            if entry.is_translated() {
                stats.translated += 1;
            } else {
                stats.untranslated += 1;
            }
            if entry.is_fuzzy() {
                stats.fuzzy += 1;
            }
            if entry.has_context() {
                stats.with_context += 1;
            }
        }
        stats
    }

    /// 合併另一份目錄。 / Merges `other` into this catalog.
    ///
    /// Entries with a new key are appended in order, existing keys keep their
    /// entry, deleted entries are appended and missing header keys are copied.
    pub fn append(&mut self, other: Catalog) {
        let mut known: HashSet<String> = self
            .entries
            .iter()
            .map(|entry| entry.key().into_owned())
            .collect();

        let mut skipped = 0usize;
        for entry in other.entries {
            if known.insert(entry.key().into_owned()) {
                self.entries.push(entry);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!(skipped, "duplicate entries kept from the first catalog");
        }

        self.deleted.extend(other.deleted);
        for (key, value) in other.headers {
            self.headers.entry(key).or_insert(value);
        }
    }
}

/// Splits a header block into `Key: value` pairs; lines without `:` are ignored.
pub(crate) fn parse_header(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
