//! Daily nutrition log pipeline.
//!
//! Reads hand-written markdown day logs (a metadata header followed by free
//! text), resolves food mentions against a reference nutrition table,
//! totals them per day and estimates TDEE over rolling windows.

pub mod config;
pub mod corpus;
pub mod day;
pub mod error;
pub mod food_line;
pub mod header;
pub mod matcher;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod reference;
pub mod tdee;

pub use config::PipelineConfig;
pub use corpus::{load_corpus, Corpus, CorpusSeries};
pub use day::{process_entry, DayAggregator};
pub use error::PipelineError;
pub use food_line::parse_food_line;
pub use header::{extract_header, normalize_value};
pub use matcher::{match_food, FoodMatcher, MatchKind};
pub use models::*;
pub use reference::FoodIndex;
pub use tdee::{build_report, compute_rolling_estimate};
