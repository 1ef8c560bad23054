use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("reference table {path} contains no foods")]
    ReferenceTableEmpty { path: PathBuf },

    #[error("no log files found below {dir}")]
    NoLogFiles { dir: PathBuf },

    #[error(
        "not enough data to estimate TDEE: {records} dated records, {weights} weight and \
         {intakes} intake observations (need two weights and one intake inside one window)"
    )]
    InsufficientData {
        records: usize,
        weights: usize,
        intakes: usize,
    },

    #[error("invalid configuration value {key}={value}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },
}
