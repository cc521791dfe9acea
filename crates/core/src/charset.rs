//! First-pass charset sniffing.
//!
//! The catalog is decoded with a single-byte legacy charset, which never fails,
//! and parsed only as far as the header to read `Content-Type: ...; charset=`.

use std::ops::ControlFlow;

use encoding_rs::WINDOWS_1252;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::catalog::parse_header;
use crate::config::LoadOptions;
use crate::parser::{CatalogParser, EntryRecord, RecordSink};
use crate::source::{resolve_encoding, CatalogSource};

/// Placeholder left in templates that never had a charset filled in.
pub const CHARSET_PLACEHOLDER: &str = "CHARSET";

static CHARSET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)charset\s*=\s*([^\s;]+)").expect("valid charset pattern"));

/// 從 Content-Type 取出 charset。 / Extracts the `charset=` value from a `Content-Type` header.
pub fn charset_from_content_type(value: &str) -> Option<&str> {
    CHARSET_PATTERN
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('"'))
        .filter(|charset| !charset.is_empty())
}

/// 讀到標頭即停止的記錄接收器。 / Record sink that stops at the header and keeps its charset.
#[derive(Debug, Clone)]
pub struct CharsetDetector {
    legacy_charset: String,
    charset: Option<String>,
    header_seen: bool,
}

impl CharsetDetector {
    pub fn new(legacy_charset: impl Into<String>) -> Self {
        Self {
            legacy_charset: legacy_charset.into(),
            charset: None,
            header_seen: false,
        }
    }

    /// Declared charset, `None` when there is no header or no `charset=`.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn header_seen(&self) -> bool {
        self.header_seen
    }

    pub fn into_charset(self) -> Option<String> {
        self.charset
    }
}

impl RecordSink for CharsetDetector {
    fn on_entry(&mut self, record: EntryRecord) -> ControlFlow<()> {
        if !record.msgid.is_empty() {
            return ControlFlow::Continue(());
        }

        self.header_seen = true;
        let headers = parse_header(record.translations.first().map_or("", String::as_str));
        self.charset = headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("Content-Type"))
            .and_then(|(_, value)| charset_from_content_type(value))
            .map(|charset| {
                if charset == CHARSET_PLACEHOLDER {
                    self.legacy_charset.clone()
                } else {
                    charset.to_string()
                }
            });
        ControlFlow::Break(())
    }
}

/// 偵測目錄宣告的字元集。 / Detects the charset a catalog declares in its header.
pub fn detect_charset(bytes: &[u8], options: &LoadOptions) -> Option<String> {
    let encoding = resolve_encoding(&options.legacy_charset).unwrap_or_else(|| {
        warn!(
            charset = %options.legacy_charset,
            "unusable legacy charset, sniffing with windows-1252"
        );
        WINDOWS_1252
    });
    let text = CatalogSource::new("", bytes).decode_lossy(encoding);

    let mut detector = CharsetDetector::new(options.legacy_charset.clone());
    if let Err(err) = CatalogParser::new(&text).parse(&mut detector) {
        debug!(error = %err, "charset sniffing stopped early");
    }
    debug!(charset = ?detector.charset(), "charset sniffing finished");
    detector.into_charset()
}
