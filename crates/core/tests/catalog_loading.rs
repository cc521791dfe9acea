use std::error::Error;
use std::fs;
use std::path::PathBuf;

use encoding_rs::{ISO_8859_5, WINDOWS_1251};
use potools_core::{
    check_catalog, Catalog, CatalogError, CheckOptions, LineEnding, LoadOptions, PluralForms,
    Translations,
};
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn fixture_counts_match() -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::load(fixture("test01.po"))?;

    assert_eq!(catalog.len(), 6);
    assert_eq!(catalog.plural_count(), 3);

    let untranslated = catalog.entries().iter().filter(|e| !e.is_translated()).count();
    let with_context = catalog.entries().iter().filter(|e| e.has_context()).count();
    assert_eq!(untranslated, 1);
    assert_eq!(with_context, 2);

    for entry in catalog.entries().iter().filter(|e| e.has_plural()) {
        assert_eq!(entry.translation(0), Some("{0} ошибка найдена"));
        assert_eq!(entry.translation(1), Some("{0} ошибки найдены"));
        assert_eq!(entry.translation(2), Some("{0} ошибок найдено"));
    }

    let stats = catalog.stats();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.translated, 5);
    assert_eq!(stats.deleted, 1);
    Ok(())
}

#[test]
fn fixture_header_and_plural_rule() -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::load(fixture("test01.po"))?;

    assert_eq!(catalog.header("Language"), Some("ru"));
    assert_eq!(catalog.header("X-Generator"), Some("hand"));
    assert_eq!(catalog.encoding(), Some("UTF-8"));
    assert!(catalog.header_comment().starts_with("# Russian translations"));

    let header = catalog.plural_forms_header().ok_or("missing Plural-Forms")?;
    let forms = PluralForms::make(header).ok_or("Plural-Forms should compile")?;
    assert_eq!(forms.nplurals(), 3);
    assert_eq!(forms.evaluate(1), 0);
    assert_eq!(forms.evaluate(3), 1);
    assert_eq!(forms.evaluate(7), 2);
    Ok(())
}

#[test]
fn fixture_references_and_comments() -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::load(fixture("test01.po"))?;
    let first = &catalog.entries()[0];

    assert_eq!(first.references().len(), 2);
    assert_ne!(first.references()[0], first.references()[1]);
    assert!(first.references()[1].ends_with("Results.cs:40"));
    assert_eq!(first.auto_comments(), ["Shown after a search".to_string()]);
    assert!(first.is_in_format("csharp"));

    let exit = catalog.find(None, "Exit").ok_or("Exit entry")?;
    assert_eq!(exit.comment(), "# Not translated yet");

    let deleted = &catalog.deleted_entries()[0];
    assert_eq!(deleted.lines().len(), 2);
    Ok(())
}

#[test]
fn parsing_is_idempotent() -> Result<(), Box<dyn Error>> {
    let first = Catalog::load(fixture("test01.po"))?;
    let second = Catalog::load(fixture("test01.po"))?;
    assert_eq!(first, second);

    let text = fs::read_to_string(fixture("test01.po"))?;
    assert_eq!(Catalog::parse_str(&text)?, Catalog::parse_str(&text)?);
    Ok(())
}

#[test]
fn crlf_catalog_parses_like_lf() -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(fixture("test01.po"))?;
    let crlf = text.replace('\n', "\r\n");

    let lf_catalog = Catalog::parse_str(&text)?;
    let crlf_catalog = Catalog::parse_str(&crlf)?;
    assert_eq!(lf_catalog.line_ending(), LineEnding::Lf);
    assert_eq!(crlf_catalog.line_ending(), LineEnding::CrLf);
    assert_eq!(lf_catalog.entries(), crlf_catalog.entries());
    assert_eq!(lf_catalog.headers(), crlf_catalog.headers());
    Ok(())
}

#[test]
fn legacy_encoded_catalog_is_decoded_with_declared_charset() -> Result<(), Box<dyn Error>> {
    let text = "msgid \"\"\nmsgstr \"Content-Type: text/plain; charset=windows-1251\\n\"\n\nmsgid \"Open\"\nmsgstr \"Открыть\"\n";
    let (bytes, _, _) = WINDOWS_1251.encode(text);

    let dir = tempdir()?;
    let path = dir.path().join("ru.po");
    fs::write(&path, bytes.as_ref())?;

    let catalog = Catalog::load(&path)?;
    assert_eq!(catalog.encoding(), Some("windows-1251"));
    assert_eq!(catalog.entries()[0].translation(0), Some("Открыть"));
    Ok(())
}

#[test]
fn charset_placeholder_uses_configured_legacy_charset() -> Result<(), Box<dyn Error>> {
    let text = "msgid \"\"\nmsgstr \"Content-Type: text/plain; charset=CHARSET\\n\"\n\nmsgid \"Open\"\nmsgstr \"Открыть\"\n";
    let (bytes, _, _) = ISO_8859_5.encode(text);
    let options = LoadOptions {
        legacy_charset: "iso-8859-5".into(),
        ..LoadOptions::default()
    };

    let catalog = Catalog::from_bytes("template.po", bytes.into_owned(), &options)?;
    assert_eq!(catalog.encoding(), Some("ISO-8859-5"));
    assert_eq!(catalog.entries()[0].translation(0), Some("Открыть"));
    Ok(())
}

#[test]
fn undeclared_charset_defaults_to_utf8() -> Result<(), Box<dyn Error>> {
    let bytes = "msgid \"Open\"\nmsgstr \"Öffnen\"\n".as_bytes().to_vec();
    let catalog = Catalog::from_bytes("de.po", bytes, &LoadOptions::default())?;
    assert_eq!(catalog.encoding(), Some("UTF-8"));
    assert_eq!(catalog.entries()[0].translation(0), Some("Öffnen"));
    Ok(())
}

#[test]
fn declared_utf8_with_invalid_bytes_is_a_decode_error() {
    let mut bytes = b"msgid \"\"\nmsgstr \"Content-Type: text/plain; charset=UTF-8\\n\"\n\n".to_vec();
    bytes.extend_from_slice(b"msgid \"a\"\nmsgstr \"\xFF\"\n");
    let err = Catalog::from_bytes("bad.po", bytes, &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, CatalogError::Decode { .. }));
}

#[test]
fn merged_catalogs_feed_lookup_and_checks() -> Result<(), Box<dyn Error>> {
    let mut catalog = Catalog::load(fixture("test01.po"))?;
    let extra = Catalog::parse_str(
        "msgid \"Exit\"\nmsgstr \"Выход\"\n\nmsgid \"Help\"\nmsgstr \"Справка\"\n",
    )?;
    catalog.append(extra);
    assert_eq!(catalog.len(), 7);

    let translations = Translations::from_catalog(&catalog, &LoadOptions::default());
    assert_eq!(translations.get_string("Exit"), None);
    assert_eq!(translations.get_string("Help"), Some("Справка"));
    assert_eq!(
        translations.get_plural_string("{0} error found", 22),
        Some("{0} ошибки найдены")
    );
    assert_eq!(translations.get_particular_string("toolbar", "Open"), Some("Открыть файл"));

    let options = CheckOptions {
        check_format: true,
        ..CheckOptions::default()
    };
    let report = check_catalog(&catalog, &options);
    assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
    Ok(())
}
