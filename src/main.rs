use anyhow::Result;
use tracing_subscriber::EnvFilter;

use nutrilog::pipeline::run;
use nutrilog::PipelineConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = PipelineConfig::from_env()?;
    tracing::debug!("{:?}", config);

    let result = run(&config)?;
    println!(
        "{} days, {} missing foods, TDEE mean {:.0} kcal (median {:.0})",
        result.corpus.records.len(),
        result.corpus.missing.len(),
        result.report.tdee_mean,
        result.report.tdee_median
    );
    Ok(())
}
