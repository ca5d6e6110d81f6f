use std::{env, path::Path, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use hashtag_features::{
    load_config, load_config_from, write_top_k_file, CsvSink, LexiconScorer, MemoryStore, Pipeline,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// usage: hashtag-features [config file]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match env::args().nth(1) {
        Some(path) => load_config_from(Path::new(&path)).with_context(|| format!("loading config {path}"))?,
        None => load_config().context("loading config")?,
    };

    let input = config
        .input_path
        .clone()
        .context("input_path is not set (config file or HASHTAG_FEATURES_INPUT_PATH)")?;
    let output = config.output_path.clone();
    let top_k_output = config.top_k_path.clone();

    let start = Instant::now();
    let store = MemoryStore::open(&input).with_context(|| format!("reading tweets from {}", input.display()))?;
    info!(tweets = store.len(), path = %input.display(), "corpus loaded");

    let sink = CsvSink::create(&output).with_context(|| format!("creating {}", output.display()))?;
    let pipeline = Pipeline::new(store, config, Arc::new(LexiconScorer::new()));
    let (report, _) = pipeline.run(sink).context("feature extraction failed")?;
    write_top_k_file(&report.working_set, &top_k_output)
        .with_context(|| format!("writing {}", top_k_output.display()))?;

    for failure in &report.failures {
        warn!(hashtag = %failure.hashtag, reason = %failure.reason, "no row written");
    }
    info!(
        rows = report.rows_written,
        output = %output.display(),
        top_k = %top_k_output.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "done"
    );
    Ok(())
}
