//! Line-oriented parser for gettext `.po` catalogs.
//!
//! The parser walks the text once with a single line of lookahead and hands
//! every complete record to a [`RecordSink`]. Consumers decide what to keep:
//! the charset sniffer stops after the header, the loader builds a full
//! [`crate::Catalog`].

use std::ops::ControlFlow;

use thiserror::Error;
use tracing::{debug, warn};

use crate::escape::unescape;

/// 解析過程中遇到的結構性錯誤。 / Structural grammar violations found while parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: singular msgstr used together with msgid_plural (msgid {msgid:?})")]
    SingularAfterPlural { line: usize, msgid: String },
    #[error("line {line}: plural msgstr used without msgid_plural (msgid {msgid:?})")]
    PluralWithoutMsgidPlural { line: usize, msgid: String },
    #[error("catalog contains no records")]
    EmptyInput,
}

/// 一筆完整的翻譯記錄。 / One complete translation record as read from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryRecord {
    pub msgid: String,
    pub msgid_plural: Option<String>,
    pub translations: Vec<String>,
    pub flags: String,
    pub references: Vec<String>,
    /// Translator comment lines, verbatim including the leading `#`.
    pub comment: String,
    pub auto_comments: Vec<String>,
    pub context: Option<String>,
}

impl EntryRecord {
    pub fn has_plural(&self) -> bool {
        self.msgid_plural.is_some()
    }
}

/// 以 `#~` 保留的已刪除記錄。 / Obsolete record kept as `#~` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedRecord {
    pub lines: Vec<String>,
    pub flags: String,
    pub comment: String,
    pub auto_comments: Vec<String>,
}

/// Receives records as the parser completes them.
///
/// Returning [`ControlFlow::Break`] stops the parse early; that is not an error.
pub trait RecordSink {
    fn on_entry(&mut self, record: EntryRecord) -> ControlFlow<()>;

    fn on_deleted_entry(&mut self, _record: DeletedRecord) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// 解析結果摘要。 / Counters reported after a parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub entries: usize,
    pub deleted_entries: usize,
    /// The sink asked to stop before the end of input.
    pub stopped: bool,
}

/// Splits text on `\r\n`, `\r` and `\n`, tracking 1-based line numbers.
struct LineReader<'a> {
    rest: &'a str,
    line_no: usize,
    done: bool,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            rest: text,
            line_no: 0,
            done: text.is_empty(),
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }
        self.line_no += 1;
        match self.rest.find(['\r', '\n']) {
            Some(end) => {
                let line = &self.rest[..end];
                let skip = if self.rest[end..].starts_with("\r\n") { 2 } else { 1 };
                self.rest = &self.rest[end + skip..];
                // A terminator at the very end does not open another line.
                self.done = self.rest.is_empty();
                Some(line)
            }
            None => {
                self.done = true;
                Some(std::mem::take(&mut self.rest))
            }
        }
    }

    fn next_non_blank(&mut self) -> Option<&'a str> {
        loop {
            let line = self.next_line()?;
            if !line.trim().is_empty() {
                return Some(line);
            }
        }
    }
}

/// Fields of the record currently being assembled.
#[derive(Default)]
struct Pending {
    flags: String,
    msgid: String,
    msgid_plural: Option<String>,
    translations: Vec<String>,
    references: Vec<String>,
    comment: String,
    auto_comments: Vec<String>,
    context: Option<String>,
}

impl Pending {
    fn take_entry(&mut self) -> EntryRecord {
        let pending = std::mem::take(self);
        EntryRecord {
            msgid: pending.msgid,
            msgid_plural: pending.msgid_plural,
            translations: pending.translations,
            flags: pending.flags,
            references: pending.references,
            comment: pending.comment,
            auto_comments: pending.auto_comments,
            context: pending.context,
        }
    }

    fn take_deleted(&mut self, lines: Vec<String>) -> DeletedRecord {
        let pending = std::mem::take(self);
        DeletedRecord {
            lines,
            flags: pending.flags,
            comment: pending.comment,
            auto_comments: pending.auto_comments,
        }
    }
}

/// 單次使用的目錄解析器。 / Single-use parser over already decoded catalog text.
pub struct CatalogParser<'a> {
    lines: LineReader<'a>,
    pending: Pending,
    summary: ParseSummary,
}

impl<'a> CatalogParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: LineReader::new(text),
            pending: Pending::default(),
            summary: ParseSummary::default(),
        }
    }

    /// 解析全部內容並將記錄交給 `sink`。 / Parses the whole text, feeding records to `sink`.
    pub fn parse<S: RecordSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<ParseSummary, ParseError> {
        let mut line = self.lines.next_non_blank();
        if line.is_none() {
            return Err(ParseError::EmptyInput);
        }

        while let Some(current) = line {
            line = match self.step(current, sink)? {
                ControlFlow::Continue(next) => next,
                ControlFlow::Break(()) => {
                    debug!(line = self.lines.line_no, "record sink stopped the parse");
                    self.summary.stopped = true;
                    break;
                }
            };
            if line.is_some_and(|next| next.trim().is_empty()) {
                line = self.lines.next_non_blank();
            }
        }

        debug!(
            entries = self.summary.entries,
            deleted = self.summary.deleted_entries,
            "catalog parsed"
        );
        Ok(self.summary)
    }

    /// Handles one line and returns the next line to look at.
    fn step<S: RecordSink + ?Sized>(
        &mut self,
        raw: &'a str,
        sink: &mut S,
    ) -> Result<ControlFlow<(), Option<&'a str>>, ParseError> {
        let line = raw.trim_start_matches([' ', '\t']);

        if matches!(line.trim_end(), "#," | "#:") {
            return Ok(ControlFlow::Continue(self.lines.next_line()));
        }

        if let Some(flags) = read_param(line, "#, ") {
            let flags = unescape(flags);
            if !self.pending.flags.is_empty() {
                self.pending.flags.push_str(", ");
            }
            self.pending.flags.push_str(&flags);
            return Ok(ControlFlow::Continue(self.lines.next_line()));
        }

        if let Some(comment) = read_param(line, "#. ").or_else(|| read_param(line, "#.")) {
            self.pending.auto_comments.push(unescape(comment).into_owned());
            return Ok(ControlFlow::Continue(self.lines.next_line()));
        }

        if let Some(refs) = read_param(line, "#: ") {
            let refs = refs.replace('\\', "/");
            self.pending.references.extend(split_references(&unescape(&refs)));
            return Ok(ControlFlow::Continue(self.lines.next_line()));
        }

        if let Some(first) = read_keyword(line, "msgctxt") {
            let (text, next) = self.read_message(first);
            self.pending.context = Some(text);
            return Ok(ControlFlow::Continue(next));
        }

        if let Some(first) = read_keyword(line, "msgid") {
            let (text, next) = self.read_message(first);
            self.pending.msgid = text;
            return Ok(ControlFlow::Continue(next));
        }

        if let Some(first) = read_keyword(line, "msgid_plural") {
            let (text, next) = self.read_message(first);
            self.pending.msgid_plural = Some(text);
            return Ok(ControlFlow::Continue(next));
        }

        if let Some(first) = read_keyword(line, "msgstr") {
            if self.pending.msgid_plural.is_some() {
                return Err(ParseError::SingularAfterPlural {
                    line: self.lines.line_no,
                    msgid: self.pending.msgid.clone(),
                });
            }
            let (text, next) = self.read_message(first);
            self.pending.translations.push(text);
            return Ok(resume(self.emit_entry(sink), next));
        }

        if read_indexed_msgstr(line).is_some() {
            if self.pending.msgid_plural.is_none() {
                return Err(ParseError::PluralWithoutMsgidPlural {
                    line: self.lines.line_no,
                    msgid: self.pending.msgid.clone(),
                });
            }
            let next = self.read_plural_translations(raw);
            return Ok(resume(self.emit_entry(sink), next));
        }

        if line.starts_with("#~") {
            let mut deleted = vec![raw.to_string()];
            let mut next = self.lines.next_line();
            while let Some(candidate) = next {
                if !candidate.trim_start_matches([' ', '\t']).starts_with("#~") {
                    break;
                }
                deleted.push(candidate.to_string());
                next = self.lines.next_line();
            }
            let record = self.pending.take_deleted(deleted);
            self.summary.deleted_entries += 1;
            return Ok(resume(sink.on_deleted_entry(record), next));
        }

        if is_comment(line) {
            let mut next = Some(raw);
            while let Some(candidate) = next {
                let candidate = candidate.trim_start_matches([' ', '\t']);
                if !is_comment(candidate) {
                    break;
                }
                if !self.pending.comment.is_empty() {
                    self.pending.comment.push('\n');
                }
                self.pending.comment.push_str(candidate.trim_end());
                next = self.lines.next_line();
            }
            return Ok(ControlFlow::Continue(next));
        }

        debug!(line = self.lines.line_no, text = raw, "skipping unrecognised line");
        Ok(ControlFlow::Continue(self.lines.next_line()))
    }

    fn emit_entry<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> ControlFlow<()> {
        let record = self.pending.take_entry();
        self.summary.entries += 1;
        sink.on_entry(record)
    }

    /// Reads a quoted string starting on the current line plus any quoted
    /// continuation lines. Returns the text and the first line after it.
    fn read_message(&mut self, first: &str) -> (String, Option<&'a str>) {
        let mut text = unescape(strip_closing_quote(first)).into_owned();
        loop {
            let next = self.lines.next_line();
            match next.and_then(continuation) {
                Some(part) => text.push_str(&unescape(part)),
                None => return (text, next),
            }
        }
    }

    fn read_plural_translations(&mut self, first: &'a str) -> Option<&'a str> {
        let mut line = Some(first);
        while let Some((index, body)) = line.and_then(read_indexed_msgstr) {
            let position = self.pending.translations.len();
            if index != position {
                warn!(
                    line = self.lines.line_no,
                    msgid = %self.pending.msgid,
                    expected = position,
                    found = index,
                    "msgstr index out of order"
                );
            }
            let (text, next) = self.read_message(body);
            self.pending.translations.push(text);
            line = next;
        }
        line
    }
}

fn resume(flow: ControlFlow<()>, next: Option<&str>) -> ControlFlow<(), Option<&str>> {
    match flow {
        ControlFlow::Continue(()) => ControlFlow::Continue(next),
        ControlFlow::Break(()) => ControlFlow::Break(()),
    }
}

/// Matches `pattern` after leading blanks and returns the rest without trailing blanks.
fn read_param<'l>(line: &'l str, pattern: &str) -> Option<&'l str> {
    line.trim_start_matches([' ', '\t'])
        .strip_prefix(pattern)
        .map(|rest| rest.trim_end_matches([' ', '\t']))
}

/// Matches `keyword "` or `keyword<TAB>"` and returns the text after the opening quote.
fn read_keyword<'l>(line: &'l str, keyword: &str) -> Option<&'l str> {
    let rest = line.strip_prefix(keyword)?;
    let rest = rest.strip_prefix(' ').or_else(|| rest.strip_prefix('\t'))?;
    rest.strip_prefix('"')
        .map(|rest| rest.trim_end_matches([' ', '\t']))
}

/// Matches `msgstr[N] "` and returns `N` with the text after the opening quote.
fn read_indexed_msgstr(line: &str) -> Option<(usize, &str)> {
    let rest = line.trim_start_matches([' ', '\t']).strip_prefix("msgstr[")?;
    let close = rest.find(']')?;
    let index = rest[..close].parse::<usize>().ok()?;
    read_keyword(&rest[close..], "]").map(|body| (index, body))
}

fn strip_closing_quote(text: &str) -> &str {
    text.strip_suffix('"').unwrap_or(text)
}

/// Returns the inside of a `"..."` continuation line, after one optional leading tab.
fn continuation(line: &str) -> Option<&str> {
    let line = line.strip_prefix('\t').unwrap_or(line);
    let line = line.trim_end_matches([' ', '\t']);
    if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') {
        Some(&line[1..line.len() - 1])
    } else {
        None
    }
}

/// Generic translator comment: `#` alone or not followed by `,` `:` `.` `~`.
fn is_comment(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some('#') && !matches!(chars.next(), Some(',' | ':' | '.' | '~'))
}

/// Splits a references line into `path:line` tokens.
///
/// Each token runs to the first `:` and then to the next whitespace, so paths
/// may contain spaces.
pub(crate) fn split_references(text: &str) -> Vec<String> {
    let mut references = Vec::new();
    let mut rest = text.trim();
    while !rest.is_empty() {
        let colon = rest.find(':').unwrap_or(rest.len());
        let end = rest[colon..]
            .find(char::is_whitespace)
            .map_or(rest.len(), |offset| colon + offset);
        references.push(to_native_separators(&rest[..end]));
        rest = rest[end..].trim_start();
    }
    references
}

fn to_native_separators(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '\\' {
        path.replace('/', "\\")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        entries: Vec<EntryRecord>,
        deleted: Vec<DeletedRecord>,
    }

    impl RecordSink for Collect {
        fn on_entry(&mut self, record: EntryRecord) -> ControlFlow<()> {
            self.entries.push(record);
            ControlFlow::Continue(())
        }

        fn on_deleted_entry(&mut self, record: DeletedRecord) -> ControlFlow<()> {
            self.deleted.push(record);
            ControlFlow::Continue(())
        }
    }

    fn parse(text: &str) -> Collect {
        let mut sink = Collect::default();
        CatalogParser::new(text).parse(&mut sink).unwrap();
        sink
    }

    #[test]
    fn line_reader_handles_all_terminators() {
        let mut reader = LineReader::new("a\r\nb\rc\nd");
        let lines: Vec<_> = std::iter::from_fn(|| reader.next_line()).collect();
        assert_eq!(lines, vec!["a", "b", "c", "d"]);
        assert_eq!(reader.line_no, 4);

        let mut reader = LineReader::new("a\n\nb\n");
        let lines: Vec<_> = std::iter::from_fn(|| reader.next_line()).collect();
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn parses_simple_entry_with_comments() {
        let sink = parse(
            "# translator note\n#. extracted\n#: src/main.rs:42\n#, fuzzy\nmsgid \"Hello\"\nmsgstr \"Bonjour\"\n",
        );
        let entry = &sink.entries[0];
        assert_eq!(entry.msgid, "Hello");
        assert_eq!(entry.translations, vec!["Bonjour"]);
        assert_eq!(entry.comment, "# translator note");
        assert_eq!(entry.auto_comments, vec!["extracted"]);
        assert_eq!(entry.references, vec![to_native_separators("src/main.rs:42")]);
        assert_eq!(entry.flags, "fuzzy");
        assert!(!entry.has_plural());
        assert_eq!(entry.context, None);
    }

    #[test]
    fn joins_continuation_lines() {
        let sink = parse("msgid \"\"\n\"Multi \"\n\t\"line\\n\"\nmsgstr \"\"\n\"Plusieurs \\\"lignes\\\"\"\n");
        let entry = &sink.entries[0];
        assert_eq!(entry.msgid, "Multi line\n");
        assert_eq!(entry.translations[0], "Plusieurs \"lignes\"");
    }

    #[test]
    fn keyword_and_quote_may_be_separated_by_tab() {
        let sink = parse("  msgctxt\t\"menu\"\n\tmsgid\t\"Open\"\nmsgstr\t\"Ouvrir\"\n");
        let entry = &sink.entries[0];
        assert_eq!(entry.context.as_deref(), Some("menu"));
        assert_eq!(entry.msgid, "Open");
        assert_eq!(entry.translations, vec!["Ouvrir"]);
    }

    #[test]
    fn collects_plural_translations_in_order() {
        let sink = parse(
            "msgid \"{0} file\"\nmsgid_plural \"{0} files\"\nmsgstr[0] \"{0} fichier\"\nmsgstr[1] \"{0} \"\n\"fichiers\"\n\nmsgid \"next\"\nmsgstr \"suivant\"\n",
        );
        assert_eq!(sink.entries.len(), 2);
        let plural = &sink.entries[0];
        assert_eq!(plural.msgid_plural.as_deref(), Some("{0} files"));
        assert_eq!(plural.translations, vec!["{0} fichier", "{0} fichiers"]);
        assert_eq!(sink.entries[1].msgid, "next");
    }

    #[test]
    fn accepts_multi_digit_plural_indices() {
        let mut text = String::from("msgid \"a\"\nmsgid_plural \"b\"\n");
        for i in 0..12 {
            text.push_str(&format!("msgstr[{i}] \"form {i}\"\n"));
        }
        let sink = parse(&text);
        assert_eq!(sink.entries[0].translations.len(), 12);
        assert_eq!(sink.entries[0].translations[11], "form 11");
    }

    #[test]
    fn context_does_not_leak_into_following_entry() {
        let sink = parse(
            "msgctxt \"ctx\"\nmsgid \"a\"\nmsgid_plural \"as\"\nmsgstr[0] \"x\"\nmsgstr[1] \"y\"\n\nmsgid \"b\"\nmsgstr \"z\"\n",
        );
        assert_eq!(sink.entries[0].context.as_deref(), Some("ctx"));
        assert_eq!(sink.entries[1].context, None);
    }

    #[test]
    fn multiple_flag_lines_are_merged() {
        let sink = parse("#, fuzzy\n#, csharp-format\nmsgid \"a\"\nmsgstr \"b\"\n");
        assert_eq!(sink.entries[0].flags, "fuzzy, csharp-format");
    }

    #[test]
    fn splits_reference_lines() {
        let sink = parse("#: a.cs:1 dir\\b.cs:22 my file.cs:3\nmsgid \"a\"\nmsgstr \"b\"\n");
        let expected: Vec<String> = ["a.cs:1", "dir/b.cs:22", "my file.cs:3"]
            .iter()
            .map(|path| to_native_separators(path))
            .collect();
        assert_eq!(sink.entries[0].references, expected);
    }

    #[test]
    fn collects_deleted_blocks() {
        let sink = parse(
            "# old\n#~ msgid \"gone\"\n#~ msgstr \"parti\"\n#~\n\nmsgid \"kept\"\nmsgstr \"garde\"\n",
        );
        assert_eq!(sink.deleted.len(), 1);
        let deleted = &sink.deleted[0];
        assert_eq!(deleted.comment, "# old");
        assert_eq!(
            deleted.lines,
            vec!["#~ msgid \"gone\"", "#~ msgstr \"parti\"", "#~"]
        );
        assert_eq!(sink.entries.len(), 1);
        assert_eq!(sink.entries[0].comment, "");
    }

    #[test]
    fn odd_lines_are_skipped() {
        let sink = parse("#,fuzzy\n#~\n#:\n#,\ngarbage\nmsgid \"a\"\nmsgstr \"b\"\n");
        assert_eq!(sink.entries.len(), 1);
        assert_eq!(sink.entries[0].flags, "");
    }

    #[test]
    fn reports_structural_errors() {
        let mut sink = Collect::default();
        let err = CatalogParser::new("msgid \"a\"\nmsgid_plural \"b\"\nmsgstr \"c\"\n")
            .parse(&mut sink)
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::SingularAfterPlural {
                line: 3,
                msgid: "a".into()
            }
        );

        let err = CatalogParser::new("msgid \"a\"\nmsgstr[0] \"c\"\n")
            .parse(&mut sink)
            .unwrap_err();
        assert!(matches!(err, ParseError::PluralWithoutMsgidPlural { line: 2, .. }));

        let err = CatalogParser::new("\n \r\n").parse(&mut sink).unwrap_err();
        assert_eq!(err, ParseError::EmptyInput);
    }

    #[test]
    fn sink_can_stop_early() {
        struct First(Option<String>);
        impl RecordSink for First {
            fn on_entry(&mut self, record: EntryRecord) -> ControlFlow<()> {
                self.0 = Some(record.msgid);
                ControlFlow::Break(())
            }
        }

        let mut sink = First(None);
        let summary = CatalogParser::new("msgid \"a\"\nmsgstr \"\"\nmsgid \"b\"\nmsgstr \"\"\n")
            .parse(&mut sink)
            .unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.entries, 1);
        assert_eq!(sink.0.as_deref(), Some("a"));
    }
}
