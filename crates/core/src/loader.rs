use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::catalog::{parse_header, Catalog, CatalogDeletedEntry, CatalogEntry};
use crate::charset::detect_charset;
use crate::config::LoadOptions;
use crate::error::CatalogError;
use crate::parser::{CatalogParser, DeletedRecord, EntryRecord, ParseError, RecordSink};
use crate::source::{resolve_encoding, CatalogSource, LineEnding};

/// 將解析記錄組裝成 [`Catalog`] 的接收器。 / Record sink that assembles a [`Catalog`].
///
/// The first record with an empty msgid becomes the header; any later one is
/// kept as an ordinary entry.
#[derive(Debug, Default)]
pub struct CatalogLoader {
    catalog: Catalog,
    header_parsed: bool,
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Catalog {
        self.catalog
    }
}

impl RecordSink for CatalogLoader {
    fn on_entry(&mut self, record: EntryRecord) -> ControlFlow<()> {
        if record.msgid.is_empty() && !self.header_parsed {
            let block = record.translations.first().map_or("", String::as_str);
            self.catalog.headers = parse_header(block);
            self.catalog.header_comment = record.comment;
            self.header_parsed = true;
            return ControlFlow::Continue(());
        }

        self.catalog.entries.push(CatalogEntry {
            msgid: record.msgid,
            msgid_plural: record.msgid_plural,
            translations: record.translations,
            flags: record.flags,
            references: record.references,
            comment: record.comment,
            auto_comments: record.auto_comments,
            context: record.context,
        });
        ControlFlow::Continue(())
    }

    fn on_deleted_entry(&mut self, record: DeletedRecord) -> ControlFlow<()> {
        self.catalog.deleted.push(CatalogDeletedEntry {
            lines: record.lines,
            flags: record.flags,
            comment: record.comment,
            auto_comments: record.auto_comments,
        });
        ControlFlow::Continue(())
    }
}

impl Catalog {
    /// 以預設選項從磁碟載入目錄。 / Loads a catalog from disk with default options.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::load_with(path, &LoadOptions::default())
    }

    pub fn load_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, CatalogError> {
        let source = CatalogSource::open(path)?;
        Self::from_source(&source, options)
    }

    /// 從記憶體中的位元組載入目錄。 / Loads a catalog from raw bytes; `name` is used in errors.
    pub fn from_bytes(
        name: impl Into<PathBuf>,
        bytes: impl Into<Vec<u8>>,
        options: &LoadOptions,
    ) -> Result<Self, CatalogError> {
        Self::from_source(&CatalogSource::new(name, bytes), options)
    }

    /// Parses text that is already decoded.
    pub fn parse_str(text: &str) -> Result<Self, ParseError> {
        let mut loader = CatalogLoader::new();
        CatalogParser::new(text).parse(&mut loader)?;
        let mut catalog = loader.finish();
        catalog.line_ending = LineEnding::detect(text);
        Ok(catalog)
    }

    fn from_source(source: &CatalogSource, options: &LoadOptions) -> Result<Self, CatalogError> {
        let encoding = match detect_charset(source.bytes(), options) {
            Some(label) => resolve_encoding(&label).ok_or_else(|| {
                CatalogError::UnsupportedEncoding {
                    path: source.name().to_path_buf(),
                    charset: label.trim().to_string(),
                }
            })?,
            None => source.guess_encoding(),
        };
        debug!(path = %source.name().display(), encoding = encoding.name(), "decoding catalog");

        let text = source.decode(encoding)?;
        let mut catalog = Self::parse_str(&text).map_err(|err| CatalogError::Parse {
            path: source.name().to_path_buf(),
            source: err,
        })?;
        catalog.encoding = Some(encoding.name().to_string());

        info!(
            path = %source.name().display(),
            entries = catalog.len(),
            deleted = catalog.deleted.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}
