use std::path::PathBuf;

use thiserror::Error;

/// A tweet record that does not match any recognized shape.
///
/// Raised per record by the schema normalizer. The scan loop decides whether
/// to skip it or abort, see [`crate::config::SchemaPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("tweet {tweet_id}: missing field `{path}`")]
    MissingField {
        tweet_id: String,
        path: &'static str,
    },
    #[error("tweet {tweet_id}: invalid field `{path}`: {reason}")]
    InvalidField {
        tweet_id: String,
        path: &'static str,
        reason: String,
    },
}

impl SchemaError {
    pub fn missing(tweet_id: impl Into<String>, path: &'static str) -> Self {
        SchemaError::MissingField { tweet_id: tweet_id.into(), path }
    }

    pub fn invalid(tweet_id: impl Into<String>, path: &'static str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidField {
            tweet_id: tweet_id.into(),
            path,
            reason: reason.into(),
        }
    }

    /// Dotted path of the offending field
    pub fn path(&self) -> &'static str {
        match self {
            SchemaError::MissingField { path, .. } => path,
            SchemaError::InvalidField { path, .. } => path,
        }
    }
}

/// Failures reported by a [`crate::store::TweetStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached. `offset` is the page offset that failed,
    /// when the failing call was a page fetch.
    #[error("tweet store unavailable (offset {offset:?}): {reason}")]
    Unavailable { offset: Option<u64>, reason: String },
    #[error("tweet {id} not found")]
    NotFound { id: String },
    #[error("failed to decode tweet at line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures while computing a single hashtag's features.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The literal `#text` token is not present in a tweet's split text.
    #[error("token `#{hashtag}` not found in text of tweet {tweet_id}")]
    PatternNotFound { hashtag: String, tweet_id: String },
    /// The store returned no usable tweet for the hashtag.
    #[error("no tweets available for hashtag `{hashtag}`")]
    NoTweets { hashtag: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures while writing the feature table.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("feature sink lock poisoned")]
    Poisoned,
}

/// Failures while persisting or restoring a scan checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checkpoint encoding: {0}")]
    Cbor(#[from] serde_cbor::Error),
}

/// Pipeline level error.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A record failed normalization under [`crate::config::SchemaPolicy::Abort`].
    #[error("schema error at corpus position {position}: {source}")]
    Schema {
        position: u64,
        #[source]
        source: SchemaError,
    },
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("scan cancelled at offset {offset}")]
    Cancelled { offset: u64 },
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
