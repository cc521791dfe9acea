use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

use crate::error::CatalogError;

/// 表示目錄檔案使用的行尾樣式。 / Represents the line ending style used by a catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    /// 回傳行尾字串。 / Returns the literal string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// 目前平台的預設行尾。 / Line ending native to the current platform.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    /// 掃描至第一個換行記號以推斷行尾。 / Scans to the first newline sentinel to infer the line ending.
    pub fn detect(text: &str) -> Self {
        let bytes = text.as_bytes();
        match bytes.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(idx) if bytes[idx] == b'\n' => LineEnding::Lf,
            Some(idx) if bytes.get(idx + 1) == Some(&b'\n') => LineEnding::CrLf,
            Some(_) => LineEnding::Cr,
            None => Self::platform_default(),
        }
    }
}

/// 依名稱解析文字編碼。 / Resolves a charset label such as `UTF-8` or `ISO-8859-2`.
pub fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// 從磁碟讀入的原始目錄位元組。 / Raw catalog bytes read from disk or memory.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    name: PathBuf,
    bytes: Vec<u8>,
}

impl CatalogSource {
    pub fn new(name: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// 讀取整個檔案；檔案在函式返回前即關閉。 / Reads the whole file; the handle is closed before returning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(io_err)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(io_err)?;
        Ok(Self::new(path, bytes))
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn has_bom(&self) -> bool {
        self.bytes.starts_with(b"\xEF\xBB\xBF")
    }

    fn payload(&self) -> &[u8] {
        if self.has_bom() {
            &self.bytes[3..]
        } else {
            &self.bytes
        }
    }

    /// 以指定編碼解碼，遇到無效位元組即失敗。 / Decodes with `encoding`, failing on malformed bytes.
    pub fn decode(&self, encoding: &'static Encoding) -> Result<String, CatalogError> {
        let (cow, had_errors) = encoding.decode_without_bom_handling(self.payload());
        if had_errors {
            return Err(CatalogError::Decode {
                path: self.name.clone(),
                encoding: encoding.name(),
            });
        }
        Ok(match cow {
            Cow::Borrowed(slice) => slice.to_owned(),
            Cow::Owned(string) => string,
        })
    }

    /// 以指定編碼解碼，無效位元組以替代字元取代。 / Decodes with `encoding`, replacing malformed bytes.
    pub fn decode_lossy(&self, encoding: &'static Encoding) -> String {
        let (cow, _) = encoding.decode_without_bom_handling(self.payload());
        cow.into_owned()
    }

    /// 未宣告字元集時猜測編碼。 / Picks an encoding for a catalog without a declared charset.
    pub fn guess_encoding(&self) -> &'static Encoding {
        let payload = self.payload();
        if std::str::from_utf8(payload).is_ok() {
            return UTF_8;
        }
        let mut detector = EncodingDetector::new();
        detector.feed(payload, true);
        let guess = detector.guess(None, true);
        debug!(path = %self.name.display(), encoding = guess.name(), "guessed catalog encoding");
        guess
    }
}
