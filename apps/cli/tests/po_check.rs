use std::error::Error;
use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use encoding_rs::WINDOWS_1251;
use predicates::prelude::*;
use tempfile::tempdir;

const BROKEN_FORMAT: &str = r#"msgid ""
msgstr ""
"Content-Type: text/plain; charset=UTF-8\n"

#, csharp-format
msgid "Deleted {0} files"
msgstr "Supprimé {0 fichiers"

#, python-brace-format
msgid "Hello {name}"
msgstr "Bonjour {name"
"#;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture() -> PathBuf {
    repo_root().join("crates/core/tests/fixtures/test01.po")
}

fn cli() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("po-check")?;
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn reports_catalog_summary() -> Result<(), Box<dyn Error>> {
    cli()?
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "6 entries (3 plural, 5 translated, 0 fuzzy, 1 untranslated), 1 obsolete [UTF-8] nplurals=3",
        ));
    Ok(())
}

#[test]
fn looks_up_plural_and_context_messages() -> Result<(), Box<dyn Error>> {
    cli()?
        .arg(fixture())
        .args(["--lookup", "{0} error found", "--count", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("= {0} ошибок найдено"));

    cli()?
        .arg(fixture())
        .args(["--lookup", "Open", "--context", "menu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("= Открыть\n"));

    cli()?
        .arg(fixture())
        .args(["--lookup", "Exit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no translation for \"Exit\""));
    Ok(())
}

#[test]
fn strict_mode_fails_on_invalid_format() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("fr.po");
    fs::write(&path, BROKEN_FORMAT)?;

    cli()?
        .arg(&path)
        .arg("--check-format")
        .assert()
        .success()
        .stdout(predicate::str::contains("msgstr[0] is not a valid format string"))
        .stderr(predicate::str::contains("Found 1 issue(s)"));

    cli()?
        .arg(&path)
        .args(["--check-format", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("po-check error: catalog checks failed"));
    Ok(())
}

#[test]
fn format_checks_are_off_by_default() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("fr.po");
    fs::write(&path, BROKEN_FORMAT)?;

    cli()?
        .arg(&path)
        .arg("--strict")
        .assert()
        .success()
        .stdout(predicate::str::contains("not a valid format string").not());
    Ok(())
}

#[test]
fn config_file_selects_format_flag() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("fr.po");
    fs::write(&path, BROKEN_FORMAT)?;
    let config = dir.path().join("po-check.json");
    fs::write(
        &config,
        r#"{ "check": { "check_format": true, "format_flag": "python-brace-format" } }"#,
    )?;

    cli()?
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("msgid \"Hello {name}\""))
        .stdout(predicate::str::contains("msgid \"Deleted {0} files\"").not());
    Ok(())
}

#[test]
fn merge_combines_inputs() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let first = dir.path().join("a.po");
    let second = dir.path().join("b.po");
    fs::write(&first, "msgid \"one\"\nmsgstr \"un\"\n\nmsgid \"two\"\nmsgstr \"\"\n")?;
    fs::write(&second, "msgid \"two\"\nmsgstr \"deux\"\n\nmsgid \"three\"\nmsgstr \"trois\"\n")?;

    cli()?
        .args([&first, &second])
        .arg("--merge")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "merged (2 files): 3 entries (0 plural, 2 translated, 0 fuzzy, 1 untranslated)",
        ));
    Ok(())
}

#[test]
fn legacy_charset_option_decodes_placeholder_catalogs() -> Result<(), Box<dyn Error>> {
    let text = "msgid \"\"\nmsgstr \"Content-Type: text/plain; charset=CHARSET\\n\"\n\nmsgid \"Open\"\nmsgstr \"Открыть\"\n";
    let (bytes, _, _) = WINDOWS_1251.encode(text);
    let dir = tempdir()?;
    let path = dir.path().join("ru.pot");
    fs::write(&path, bytes.as_ref())?;

    cli()?
        .arg(&path)
        .args(["--legacy-charset", "windows-1251", "--lookup", "Open"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[windows-1251]"))
        .stdout(predicate::str::contains("= Открыть"));
    Ok(())
}

#[test]
fn missing_input_is_reported() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    cli()?
        .arg(dir.path().join("absent.po"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("po-check error: load catalog"));
    Ok(())
}
