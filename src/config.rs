use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What a chunked scan does with a record that fails normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPolicy {
    /// Count the record in `skipped_records`, log it and keep scanning.
    #[default]
    Skip,
    /// Stop the scan on the first malformed record.
    Abort,
}

/// What the location feature does when `#hashtag` is not a token of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationPolicy {
    /// Leave that tweet out of the mean.
    #[default]
    SkipOccurrence,
    /// Fail the whole hashtag.
    Fail,
}

/// Extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Size of the hashtag working set
    pub top_k: usize,
    /// Records fetched per page during corpus scans
    pub chunk_size: usize,
    /// Co-occurrence ratio at or above which `cooccurance` is true
    pub cooccurrence_threshold: f64,
    pub schema_policy: SchemaPolicy,
    pub location_policy: LocationPolicy,
    /// Snowball-stem words before counting them
    pub stemming: bool,
    /// Per-hashtag worker threads, 0 lets rayon decide
    pub workers: usize,
    /// Base `F` of the popularity buckets (F, 2F, 4F, 8F)
    pub popularity_bucket_base: u64,
    /// Where corpus scans persist their cursor on store failure
    pub checkpoint_path: Option<PathBuf>,
    /// JSON-lines tweet dump read by the binary
    pub input_path: Option<PathBuf>,
    /// Feature table written by the binary
    pub output_path: PathBuf,
    /// Top-K working set (`hashtag,rank,count`) written next to the feature table
    pub top_k_path: PathBuf,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            chunk_size: 1000,
            cooccurrence_threshold: 0.4,
            schema_policy: SchemaPolicy::Skip,
            location_policy: LocationPolicy::SkipOccurrence,
            stemming: false,
            workers: 0,
            popularity_bucket_base: 10,
            checkpoint_path: None,
            input_path: None,
            output_path: PathBuf::from("features.csv"),
            top_k_path: PathBuf::from("top_k.csv"),
        }
    }
}

impl ExtractorConfig {
    /// chunk size with a floor of 1, a zero page size would never advance the cursor
    #[inline]
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}

const CONFIG_PATHS: [&str; 3] = ["hashtag-features.toml", "hashtag-features.json", ".hashtag-features.toml"];

/// Load configuration from the first config file found in the working
/// directory, then `HASHTAG_FEATURES_*` environment variables.
pub fn load_config() -> Result<ExtractorConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for path in &CONFIG_PATHS {
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HASHTAG_FEATURES")
            .prefix_separator("_")
            .separator("__"),
    );

    builder.build()?.try_deserialize()
}

/// Load configuration from an explicit file, environment still applies on top.
pub fn load_config_from(path: &Path) -> Result<ExtractorConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("HASHTAG_FEATURES")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}
