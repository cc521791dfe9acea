use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use potools_core::{check_catalog, Catalog, CatalogStats, ConfigStore, PotoolsConfig, Translations};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "po-check",
    about = "Loads gettext catalogs and reports consistency problems",
    version
)]
struct Args {
    /// 需要檢查的 .po 檔案。 / Catalog files to load and check.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// JSON 設定檔；不存在時使用預設值。 / JSON settings file; defaults apply when it does not exist.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 驗證帶格式旗標項目的佔位符語法。 / Validate placeholder syntax of entries carrying the format flag.
    #[arg(long)]
    check_format: bool,

    /// 視為格式字串的旗標。 / Flag that marks an entry as a format string.
    #[arg(long, value_name = "FLAG")]
    format_flag: Option<String>,

    /// 檔頭宣告 CHARSET 時使用的編碼。 / Charset used when the header only says `CHARSET`.
    #[arg(long, value_name = "CHARSET")]
    legacy_charset: Option<String>,

    /// 查詢時包含 fuzzy 項目。 / Let fuzzy entries answer lookups.
    #[arg(long)]
    include_fuzzy: bool,

    /// 將所有輸入合併成單一目錄。 / Merge all inputs into one catalog before checking.
    #[arg(long)]
    merge: bool,

    /// 查詢單一訊息的翻譯。 / Print the translation of one message.
    #[arg(long, value_name = "MSGID")]
    lookup: Option<String>,

    /// 查詢時使用的 msgctxt。 / Context for `--lookup`.
    #[arg(long, value_name = "CONTEXT", requires = "lookup")]
    context: Option<String>,

    /// 查詢複數形式時的數量。 / Count used to pick a plural form for `--lookup`.
    #[arg(long, value_name = "N", requires = "lookup")]
    count: Option<u64>,

    /// 發現問題時以失敗結束。 / Exit with failure when any issue is found.
    #[arg(long)]
    strict: bool,

    /// 輸出除錯記錄。 / Emit debug logs on stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    if let Err(err) = run(args) {
        eprintln!("po-check error: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Args) -> Result<()> {
    let config = resolve_config(&args)?;
    debug!(?config, "effective configuration");

    let mut catalogs = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let catalog = Catalog::load_with(path, &config.load)
            .with_context(|| format!("load catalog {}", path.display()))?;
        catalogs.push((path.display().to_string(), catalog));
    }

    if args.merge {
        let label = format!("merged ({} files)", catalogs.len());
        let mut merged = Catalog::new();
        for (_, catalog) in catalogs.drain(..) {
            merged.append(catalog);
        }
        catalogs.push((label, merged));
    }

    let mut total_issues = 0usize;
    for (label, catalog) in &catalogs {
        println!("{}", summary_line(label, catalog));

        let report = check_catalog(catalog, &config.check);
        for issue in &report.issues {
            println!("   · {issue}");
        }
        total_issues += report.issues.len();

        if let Some(msgid) = args.lookup.as_deref() {
            print_lookup(&args, &config, catalog, msgid);
        }
    }

    if total_issues > 0 {
        eprintln!("Found {total_issues} issue(s) in {} catalog(s)", catalogs.len());
        if args.strict {
            bail!("catalog checks failed");
        }
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<PotoolsConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => load_config(path)?,
        None => PotoolsConfig::default(),
    };

    if args.check_format {
        config.check.check_format = true;
    }
    if let Some(flag) = &args.format_flag {
        config.check.format_flag = flag.clone();
    }
    if let Some(charset) = &args.legacy_charset {
        config.load.legacy_charset = charset.clone();
    }
    if args.include_fuzzy {
        config.load.include_fuzzy = true;
    }
    config.sanitize();
    Ok(config)
}

fn load_config(path: &Path) -> Result<PotoolsConfig> {
    let store = ConfigStore::load(path)
        .with_context(|| format!("read settings {}", path.display()))?;
    Ok(store.into_config())
}

fn summary_line(label: &str, catalog: &Catalog) -> String {
    let CatalogStats {
        total,
        plural,
        translated,
        untranslated,
        fuzzy,
        deleted,
        ..
    } = catalog.stats();
    let mut line = format!(
        "{label}: {total} entries ({plural} plural, {translated} translated, {fuzzy} fuzzy, {untranslated} untranslated)"
    );
    if deleted > 0 {
        line.push_str(&format!(", {deleted} obsolete"));
    }
    if let Some(encoding) = catalog.encoding() {
        line.push_str(&format!(" [{encoding}]"));
    }
    line.push_str(&format!(" nplurals={}", catalog.plural_forms().nplurals()));
    line
}

fn print_lookup(args: &Args, config: &PotoolsConfig, catalog: &Catalog, msgid: &str) {
    let translations = Translations::from_catalog(catalog, &config.load);
    let found = match (args.context.as_deref(), args.count) {
        (Some(context), Some(n)) => translations.get_particular_plural_string(context, msgid, n),
        (Some(context), None) => translations.get_particular_string(context, msgid),
        (None, Some(n)) => translations.get_plural_string(msgid, n),
        (None, None) => translations.get_string(msgid),
    };
    match found {
        Some(text) => println!("   = {text}"),
        None => println!("   = (no translation for \"{msgid}\")"),
    }
}
