use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::corpus::Corpus;
use crate::models::TdeeReport;

pub const SUMMARY_FILE: &str = "summary.json";
pub const MISSING_FILE: &str = "missing_foods.json";
pub const TDEE_FILE: &str = "tdee.json";

/// Write `value` as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Write the per-day records and the unresolved food lines.
pub fn write_day_outputs(out_dir: &Path, corpus: &Corpus) -> Result<(PathBuf, PathBuf)> {
    let summary = out_dir.join(SUMMARY_FILE);
    write_json(&summary, &corpus.records)?;
    info!("wrote {}", summary.display());

    let missing = out_dir.join(MISSING_FILE);
    write_json(&missing, &corpus.missing)?;
    info!("wrote {} ({} missing)", missing.display(), corpus.missing.len());

    Ok((summary, missing))
}

pub fn write_tdee_report(out_dir: &Path, report: &TdeeReport) -> Result<PathBuf> {
    let path = out_dir.join(TDEE_FILE);
    write_json(&path, report)?;
    info!("wrote {}", path.display());
    Ok(path)
}
