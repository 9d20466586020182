use anyhow::{bail, Result};
use fetl::{EtlConfig, ForumETL, JsonlStore};
use std::path::PathBuf;

const DEFAULT_SETTINGS: &str = "./config/settings.yaml";
const DEFAULT_DATA_DIR: &str = "./data";

/// Process one raw batch file incrementally against the local NDJSON store:
///
///   fetl <batch.jsonl[.zst]> [data_dir]
///
/// Settings come from `FETL_SETTINGS` (or ./config/settings.yaml); defaults
/// apply when the file is absent. Toxicity scoring is skipped here — the
/// classifier runs out of process and its results arrive via the backfill
/// path.
fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let batch = match args.next() {
        Some(p) => PathBuf::from(p),
        None => bail!("usage: fetl <batch.jsonl[.zst]> [data_dir]"),
    };
    let data_dir = args.next().unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

    let settings_path =
        std::env::var("FETL_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS.to_string());
    let cfg = if std::path::Path::new(&settings_path).exists() {
        EtlConfig::from_yaml_file(&settings_path)?
    } else {
        EtlConfig::default()
    };

    let mut store = JsonlStore::open(&data_dir)?;
    let etl = ForumETL::with_config(cfg);
    let summary = etl.run_batch(batch.as_path(), &mut store, None)?;

    println!(
        "transformed {} rows, {} new ({} new authors)",
        summary.transformed, summary.new_rows, summary.new_authors
    );
    Ok(())
}
