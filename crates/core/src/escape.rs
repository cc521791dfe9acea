//! Gettext string escaping.

use std::borrow::Cow;

/// 還原 gettext 轉義序列。 / Resolves gettext escape sequences in a single pass.
///
/// `\n`, `\t`, `\r`, `\"` and `\\` are decoded; any other backslash sequence is
/// kept as written.
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('\\') {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    Cow::Owned(result)
}

/// 將文字轉為 gettext 轉義格式。 / Escapes text so it can sit between gettext quotes.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['\\', '"', '\n', '\t', '\r']) {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            other => result.push(other),
        }
    }
    Cow::Owned(result)
}

/// 以引號包住已轉義的文字。 / Escapes and wraps text in double quotes.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", escape(text))
}
