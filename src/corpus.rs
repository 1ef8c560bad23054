use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use glob::{glob, Pattern};
use tracing::{info, warn};

use crate::day::DayAggregator;
use crate::error::PipelineError;
use crate::models::{DayRecord, MissingFoodEntry};

/// All processed log files of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    /// Ascending by resolved date; ties and undated records by path
    pub records: Vec<DayRecord>,
    /// Unresolved food lines, in record order
    pub missing: Vec<MissingFoodEntry>,
}

impl Corpus {
    /// Assemble a corpus from per-file results in any order.
    pub fn from_entries(mut entries: Vec<(DayRecord, Vec<MissingFoodEntry>)>) -> Self {
        entries.sort_by(|(a, _), (b, _)| record_order(a, b));
        let mut corpus = Corpus::default();
        for (record, missing) in entries {
            corpus.records.push(record);
            corpus.missing.extend(missing);
        }
        corpus
    }
}

/// Dated records first, ascending; undated after; path breaks ties.
pub fn record_order(a: &DayRecord, b: &DayRecord) -> Ordering {
    match (a.day(), b.day()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.path.cmp(&b.path))
}

/// Process every `*.md` file below `dir`.
///
/// An unreadable directory or one without log files is fatal; a single
/// unreadable file is skipped with a warning.
pub fn load_corpus(dir: &Path, aggregator: &DayAggregator<'_>) -> Result<Corpus> {
    if !dir.is_dir() {
        return Err(PipelineError::NoLogFiles {
            dir: dir.to_path_buf(),
        }
        .into());
    }

    let root = Pattern::escape(&dir.to_string_lossy());
    let pattern_str = format!("{}/**/*.md", root.trim_end_matches('/'));
    let mut paths = Vec::new();
    for entry in glob(&pattern_str).with_context(|| format!("bad glob {}", pattern_str))? {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => warn!("skipping {}: {}", e.path().display(), e.error()),
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(PipelineError::NoLogFiles {
            dir: dir.to_path_buf(),
        }
        .into());
    }

    let mut entries = Vec::with_capacity(paths.len());
    for path in &paths {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!("skipping unreadable log {}: {}", path.display(), e);
                continue;
            }
        };
        let rel = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        entries.push(aggregator.process(&text, &rel));
    }

    let corpus = Corpus::from_entries(entries);
    info!(
        "processed {} log files ({} undated), {} unresolved food lines",
        corpus.records.len(),
        corpus.records.iter().filter(|r| r.day().is_none()).count(),
        corpus.missing.len()
    );
    Ok(corpus)
}

/// Weight and intake on a continuous daily calendar. Days without a record
/// hold `None`, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSeries {
    pub start: NaiveDate,
    pub weight: Vec<Option<f64>>,
    pub intake: Vec<Option<f64>>,
}

impl CorpusSeries {
    /// Build the calendar from the earliest to the latest dated record.
    /// Records sharing a date fill in values in order, so the last
    /// non-missing value wins. `None` if no record has a usable date.
    pub fn from_records(records: &[DayRecord]) -> Option<Self> {
        let dated: Vec<(NaiveDate, &DayRecord)> = records
            .iter()
            .filter_map(|r| r.day().map(|d| (d, r)))
            .collect();
        let start = dated.iter().map(|(d, _)| *d).min()?;
        let end = dated.iter().map(|(d, _)| *d).max()?;
        let len = usize::try_from((end - start).num_days()).ok()? + 1;

        let mut series = Self {
            start,
            weight: vec![None; len],
            intake: vec![None; len],
        };
        for (day, record) in dated {
            let Some(i) = series.index_of(day) else {
                continue;
            };
            if let Some(w) = record.weight_kg() {
                series.weight[i] = Some(w);
            }
            if let Some(kcal) = record.intake_kcal() {
                series.intake[i] = Some(kcal);
            }
        }
        Some(series)
    }

    pub fn len(&self) -> usize {
        self.weight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weight.is_empty()
    }

    pub fn date_at(&self, i: usize) -> NaiveDate {
        self.start + Duration::days(i as i64)
    }

    pub fn index_of(&self, day: NaiveDate) -> Option<usize> {
        let offset = usize::try_from((day - self.start).num_days()).ok()?;
        (offset < self.len()).then_some(offset)
    }

    pub fn end(&self) -> NaiveDate {
        self.date_at(self.len().saturating_sub(1))
    }
}
