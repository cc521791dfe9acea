pub mod catalog;
pub mod charset;
pub mod check;
pub mod config;
pub mod error;
pub mod escape;
pub mod loader;
pub mod lookup;
pub mod parser;
pub mod source;

pub use catalog::{message_key, Catalog, CatalogDeletedEntry, CatalogEntry, CatalogStats};
pub use charset::{charset_from_content_type, detect_charset, CharsetDetector};
pub use check::{check_catalog, CheckIssue, CheckReport, MessagePart};
pub use config::{CheckOptions, ConfigStore, LoadOptions, PotoolsConfig};
pub use error::{CatalogError, ConfigError};
pub use loader::CatalogLoader;
pub use lookup::Translations;
pub use parser::{CatalogParser, DeletedRecord, EntryRecord, ParseError, ParseSummary, RecordSink};
pub use source::{resolve_encoding, CatalogSource, LineEnding};

pub use potools_format::{FormatError, FormatErrorKind, FormatItem, FormatValidator};
pub use potools_plural::{PluralForms, PluralFormsError};
