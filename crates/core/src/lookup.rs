//! Runtime message lookup over a loaded catalog.

use std::collections::HashMap;

use potools_plural::PluralForms;
use tracing::debug;

use crate::catalog::{message_key, Catalog};
use crate::config::LoadOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Message {
    Singular(String),
    Plural(Vec<String>),
}

/// 執行期翻譯表。 / Translation table keyed by `context` + U+0004 + `msgid`.
#[derive(Debug, Clone)]
pub struct Translations {
    plural_forms: PluralForms,
    messages: HashMap<String, Message>,
}

impl Translations {
    /// A table with no messages; every lookup misses.
    pub fn empty(plural_forms: PluralForms) -> Self {
        Self {
            plural_forms,
            messages: HashMap::new(),
        }
    }

    /// 由目錄建立翻譯表。 / Builds the table from a catalog.
    ///
    /// Untranslated entries are skipped, and fuzzy ones unless
    /// `options.include_fuzzy` is set. The first entry wins for duplicate keys.
    pub fn from_catalog(catalog: &Catalog, options: &LoadOptions) -> Self {
        let mut table = Self::empty(catalog.plural_forms());
        for entry in catalog.entries() {
            if !entry.is_translated() || (entry.is_fuzzy() && !options.include_fuzzy) {
                continue;
            }
            let message = if entry.has_plural() {
                Message::Plural(entry.translations().to_vec())
            } else {
                Message::Singular(entry.translation(0).unwrap_or_default().to_string())
            };
            table
                .messages
                .entry(entry.key().into_owned())
                .or_insert(message);
        }
        debug!(messages = table.messages.len(), "translation table built");
        table
    }

    pub fn plural_forms(&self) -> &PluralForms {
        &self.plural_forms
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Translation of `msgid`; a plural message yields its first form.
    pub fn get_string(&self, msgid: &str) -> Option<&str> {
        self.lookup(None, msgid, None)
    }

    /// Form chosen by the plural rule for `n`; out-of-range indices use form 0.
    pub fn get_plural_string(&self, msgid: &str, n: u64) -> Option<&str> {
        self.lookup(None, msgid, Some(n))
    }

    pub fn get_particular_string(&self, context: &str, msgid: &str) -> Option<&str> {
        self.lookup(Some(context), msgid, None)
    }

    pub fn get_particular_plural_string(&self, context: &str, msgid: &str, n: u64) -> Option<&str> {
        self.lookup(Some(context), msgid, Some(n))
    }

    /// Like [`get_string`](Self::get_string), falling back to `msgid`.
    pub fn translate<'a>(&'a self, msgid: &'a str) -> &'a str {
        self.get_string(msgid).unwrap_or(msgid)
    }

    /// Like [`get_plural_string`](Self::get_plural_string), falling back to
    /// `msgid` for `n == 1` and `msgid_plural` otherwise.
    pub fn translate_plural<'a>(&'a self, msgid: &'a str, msgid_plural: &'a str, n: u64) -> &'a str {
        match self.get_plural_string(msgid, n) {
            Some(text) => text,
            None if n == 1 => msgid,
            None => msgid_plural,
        }
    }

    fn lookup(&self, context: Option<&str>, msgid: &str, n: Option<u64>) -> Option<&str> {
        let message = self.messages.get(message_key(context, msgid).as_ref())?;
        let text = match message {
            Message::Singular(text) => text.as_str(),
            Message::Plural(forms) => {
                let index = n.map_or(0, |n| self.plural_forms.index(n));
                forms
                    .get(index)
                    .or_else(|| forms.first())
                    .map(String::as_str)?
            }
        };
        // An untranslated form behaves like a missing message.
        (!text.is_empty()).then_some(text)
    }
}
