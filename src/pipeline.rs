use anyhow::Result;
use chrono::Utc;

use crate::config::PipelineConfig;
use crate::corpus::{load_corpus, Corpus};
use crate::day::DayAggregator;
use crate::matcher::FoodMatcher;
use crate::models::TdeeReport;
use crate::output::{write_day_outputs, write_tdee_report};
use crate::reference::FoodIndex;
use crate::tdee::build_report;

/// Results of one full run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub corpus: Corpus,
    pub report: TdeeReport,
}

/// Load the reference table and the corpus, write the per-day outputs, then
/// estimate TDEE and write the report.
///
/// The per-day outputs are written before estimation, so a corpus without
/// enough weight/intake data still produces them while the run fails.
pub fn run(config: &PipelineConfig) -> Result<PipelineRun> {
    let index = FoodIndex::load(&config.foods_path)?;
    let aggregator = DayAggregator::new(&index)
        .with_matcher(FoodMatcher::new().with_cutoff(config.match_cutoff));

    let corpus = load_corpus(&config.log_dir, &aggregator)?;
    write_day_outputs(&config.out_dir, &corpus)?;

    let report = build_report(
        &corpus.records,
        config.window_days,
        config.smoothing_days,
        Utc::now(),
    )?;
    write_tdee_report(&config.out_dir, &report)?;

    Ok(PipelineRun { corpus, report })
}
