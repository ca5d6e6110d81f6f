/// This crate extracts per-hashtag feature tables from a stored tweet corpus.
pub mod config;
pub mod error;
pub mod extractor;
pub mod sink;
pub mod store;
pub mod utils;

/// Feature extraction pipeline
/// The top-level struct of this crate. One run:
/// - discovers the top-K hashtags with a chunked corpus scan
/// - aggregates the corpus statistics once
/// - extracts one feature row per hashtag on a worker pool
/// - appends the rows to a `FeatureSink`
///
/// `Pipeline<S>` is generic over the tweet store `S`.
/// The sentiment model is injected as `Arc<dyn SentimentScorer>`; a topic
/// model and further extractors can be added with the builder methods.
///
/// # Checkpoints
/// With `checkpoint_path` set, an interrupted corpus scan (store failure or
/// cancellation) is saved as cbor and resumed by the next call.
pub use extractor::pipeline::{HashtagFailure, Pipeline, RunReport};

/// Corpus statistics
/// Corpus-wide denominators of the ratio features:
/// - number of tweets, retweets, distinct authors
/// - number of tweets with urls, with user mentions
/// - the global word frequency distribution
///
/// Built once per run and shared read-only behind `Arc`.
///
/// # Serialization
/// Supported, used for the statistics snapshot. The snapshot carries a
/// `CorpusFingerprint` (store size, first and last record id, stemming,
/// schema policy) and is only reused when the fingerprint still matches.
pub use extractor::corpus::{CorpusFingerprint, CorpusStatistics, CorpusStatisticsAggregator};

/// Word frequency table
/// Counts words and converts them to probabilities. Used for the corpus
/// distribution and for each hashtag's distribution, compared with KL
/// divergence.
///
/// # Serialization
/// Supported.
pub use extractor::token::WordFrequency;

/// Hashtag discovery
/// Chunked scan building the global hashtag frequency table, top-K by count
/// with ties broken by first sighting. `TopKEntry` is one ranked line of the
/// working set.
pub use extractor::discover::{HashtagCounter, HashtagDiscoverer, TopKEntry};

/// Feature row and its column order
pub use extractor::row::{popularity_bucket, FeatureRow};

/// Tweet schema normalization
/// Resolves the text, hashtags and entities of plain, extended and retweeted
/// tweets into one `CanonicalTweet`.
pub use extractor::schema::{normalize, CanonicalTweet, RawTweet, TweetShape};

/// Resumable corpus scans
pub use extractor::scan::{ChunkAccumulator, ScanControl, ScanCursor, ScanState, ScanStatus};

/// Feature extractors
/// Each implements `FeatureExtractor` and fills its own group of columns.
pub use extractor::{
    hashtag::HashtagFeatureExtractor,
    topic::{TopicFeature, TopicModel},
    tweet::TweetFeatureExtractor,
    FeatureExtractor, HashtagContext,
};

/// Sentiment scoring
pub use extractor::sentiment::{LexiconScorer, SentimentClass, SentimentScorer};

/// Extraction settings and their loader
pub use config::{load_config, load_config_from, ExtractorConfig, LocationPolicy, SchemaPolicy};

/// Errors
pub use error::{CheckpointError, ExtractError, FeatureError, SchemaError, SinkError, StoreError};

/// Feature sinks, and the csv writer of the top-K working set
pub use sink::{write_top_k, write_top_k_file, CsvSink, FeatureSink, MemorySink, SharedSink, TOP_K_COLUMNS};

/// Tweet stores
pub use store::{MemoryStore, TweetStore};

/// Word tokenizer shared by corpus statistics and word divergence
pub use utils::text::WordTokenizer;
