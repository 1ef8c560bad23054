use std::path::PathBuf;

use anyhow::Result;

use crate::error::PipelineError;
use crate::matcher::DEFAULT_MATCH_CUTOFF;
use crate::tdee::{DEFAULT_SMOOTHING_DAYS, DEFAULT_WINDOW_DAYS};

/// Where the pipeline reads from and writes to, and its tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub foods_path: PathBuf,
    pub log_dir: PathBuf,
    pub out_dir: PathBuf,
    pub window_days: usize,
    pub smoothing_days: usize,
    pub match_cutoff: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            foods_path: PathBuf::from("data/foods.yaml"),
            log_dir: PathBuf::from("logs/daily"),
            out_dir: PathBuf::from("outputs/data"),
            window_days: DEFAULT_WINDOW_DAYS,
            smoothing_days: DEFAULT_SMOOTHING_DAYS,
            match_cutoff: DEFAULT_MATCH_CUTOFF,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `NUTRILOG_*` environment variables, after
    /// loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("NUTRILOG_FOODS") {
            config.foods_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("NUTRILOG_LOG_DIR") {
            config.log_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("NUTRILOG_OUT_DIR") {
            config.out_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("NUTRILOG_WINDOW_DAYS") {
            config.window_days = parse_days("NUTRILOG_WINDOW_DAYS", &v)?;
        }
        if let Some(v) = lookup("NUTRILOG_SMOOTHING_DAYS") {
            config.smoothing_days = parse_days("NUTRILOG_SMOOTHING_DAYS", &v)?;
        }
        if let Some(v) = lookup("NUTRILOG_MATCH_CUTOFF") {
            config.match_cutoff = match v.trim().parse::<f64>() {
                Ok(c) if (0.0..=1.0).contains(&c) => c,
                _ => return Err(invalid("NUTRILOG_MATCH_CUTOFF", &v, "expected 0.0..=1.0").into()),
            };
        }

        Ok(config)
    }
}

fn parse_days(key: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(key, value, "expected a positive number of days").into()),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> PipelineError {
    PipelineError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
