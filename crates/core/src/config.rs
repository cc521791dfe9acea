use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_LEGACY_CHARSET: &str = "iso-8859-1";
pub const DEFAULT_FORMAT_FLAG: &str = "csharp-format";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PotoolsConfig {
    #[serde(default)]
    pub load: LoadOptions,
    #[serde(default)]
    pub check: CheckOptions,
}

impl PotoolsConfig {
    pub fn sanitize(&mut self) {
        self.load.sanitize();
        self.check.sanitize();
    }
}

/// How catalogs are decoded and which entries reach runtime lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Charset used for the first sniffing pass and for the `CHARSET` placeholder.
    #[serde(default = "default_legacy_charset")]
    pub legacy_charset: String,
    #[serde(default)]
    pub include_fuzzy: bool,
}

fn default_legacy_charset() -> String {
    DEFAULT_LEGACY_CHARSET.to_string()
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            legacy_charset: default_legacy_charset(),
            include_fuzzy: false,
        }
    }
}

impl LoadOptions {
    fn sanitize(&mut self) {
        if self.legacy_charset.trim().is_empty() {
            self.legacy_charset = default_legacy_charset();
        }
    }
}

/// Which consistency checks `check_catalog` runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    #[serde(default)]
    pub check_format: bool,
    #[serde(default = "default_format_flag")]
    pub format_flag: String,
    #[serde(default = "default_true")]
    pub check_placeholders: bool,
    #[serde(default = "default_true")]
    pub check_plural_counts: bool,
}

fn default_true() -> bool {
    true
}

fn default_format_flag() -> String {
    DEFAULT_FORMAT_FLAG.to_string()
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            check_format: false,
            format_flag: default_format_flag(),
            check_placeholders: true,
            check_plural_counts: true,
        }
    }
}

impl CheckOptions {
    fn sanitize(&mut self) {
        let flag = self.format_flag.trim();
        if flag.is_empty() {
            self.format_flag = default_format_flag();
        } else if flag.len() != self.format_flag.len() {
            self.format_flag = flag.to_string();
        }
    }
}

#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    data: PotoolsConfig,
}

impl ConfigStore {
    /// 讀取設定檔；檔案不存在時使用預設值。 / Loads the config file, falling back to defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = PotoolsConfig::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: PotoolsConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn config(&self) -> &PotoolsConfig {
        &self.data
    }

    pub fn into_config(self) -> PotoolsConfig {
        self.data
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload =
            serde_json::to_string_pretty(&self.data).map_err(|source| ConfigError::Serialize {
                path: self.path.clone(),
                source,
            })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| ConfigError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("potools.json")).unwrap();
        let config = store.config();
        assert_eq!(config.load.legacy_charset, "iso-8859-1");
        assert!(!config.load.include_fuzzy);
        assert!(!config.check.check_format);
        assert_eq!(config.check.format_flag, "csharp-format");
        assert!(config.check.check_placeholders);
        assert!(config.check.check_plural_counts);
    }

    #[test]
    fn partial_file_fills_defaults_and_sanitizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("potools.json");
        fs::write(
            &path,
            r#"{ "load": { "legacy_charset": "  " }, "check": { "check_format": true, "format_flag": " c-format " } }"#,
        )
        .unwrap();

        let config = ConfigStore::load(&path).unwrap().into_config();
        assert_eq!(config.load.legacy_charset, "iso-8859-1");
        assert!(config.check.check_format);
        assert_eq!(config.check.format_flag, "c-format");
        assert!(config.check.check_plural_counts);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("potools.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ConfigStore::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: ref p, .. } if p == &path));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("potools.json");
        let store = ConfigStore::load(&path).unwrap();
        store.save().unwrap();
        assert!(path.exists());

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.config(), store.config());
        assert_eq!(reloaded.path(), path.as_path());
    }
}
