use std::{collections::HashSet, path::PathBuf, sync::Arc};

use ::serde::{Deserialize, Serialize};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::{ExtractorConfig, SchemaPolicy},
    error::{ExtractError, FeatureError, SinkError, StoreError},
    extractor::{
        corpus::{CorpusFingerprint, CorpusStatistics, CorpusStatisticsAggregator},
        discover::{HashtagDiscoverer, TopKEntry},
        hashtag::HashtagFeatureExtractor,
        row::FeatureRow,
        scan::{ScanControl, ScanState, ScanStatus},
        schema::{normalize, CanonicalTweet},
        serde::{self as checkpoint, CheckpointDir, Stamped},
        sentiment::SentimentScorer,
        topic::{TopicFeature, TopicModel},
        tweet::TweetFeatureExtractor,
        FeatureExtractor, HashtagContext,
    },
    sink::{FeatureSink, SharedSink},
    store::TweetStore,
    utils::text::WordTokenizer,
};

/// A hashtag left out of the feature table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashtagFailure {
    pub hashtag: String,
    pub reason: String,
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// top-K hashtags, most frequent first
    pub selected: Vec<String>,
    /// the same hashtags with rank and tweet count
    pub working_set: Vec<TopKEntry>,
    pub rows_written: u64,
    pub failures: Vec<HashtagFailure>,
    /// malformed records dropped by the corpus scan
    pub skipped_records: u64,
}

/// The feature extraction run.
///
/// discover top-K → aggregate corpus statistics once → extract every
/// hashtag on a worker pool → append rows to the sink.
pub struct Pipeline<S: TweetStore> {
    store: S,
    config: ExtractorConfig,
    tokenizer: WordTokenizer,
    extractors: Vec<Box<dyn FeatureExtractor>>,
    control: ScanControl,
    checkpoints: Option<CheckpointDir>,
}

impl<S: TweetStore> Pipeline<S> {
    /// Pipeline with the hashtag and tweet extractors
    pub fn new(store: S, config: ExtractorConfig, scorer: Arc<dyn SentimentScorer>) -> Self {
        let tokenizer = WordTokenizer::new(config.stemming);
        let hashtag = HashtagFeatureExtractor::new(scorer)
            .with_cooccurrence_threshold(config.cooccurrence_threshold)
            .with_location_policy(config.location_policy)
            .with_bucket_base(config.popularity_bucket_base);
        let tweet = TweetFeatureExtractor::new(tokenizer.clone());
        let checkpoints = config.checkpoint_path.clone().map(CheckpointDir::new);
        Self {
            store,
            config,
            tokenizer,
            extractors: vec![Box::new(hashtag), Box::new(tweet)],
            control: ScanControl::new(),
            checkpoints,
        }
    }

    /// Also fill `tweet_topic` from `model`
    pub fn with_topic_model(self, model: Arc<dyn TopicModel>) -> Self {
        self.with_extractor(Box::new(TopicFeature::new(model)))
    }

    pub fn with_extractor(mut self, extractor: Box<dyn FeatureExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Handle for cancelling the corpus scans of this pipeline
    #[inline]
    pub fn control(&self) -> ScanControl {
        self.control.clone()
    }

    #[inline]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// corpus scans
impl<S: TweetStore> Pipeline<S> {
    /// Top-K hashtags of the corpus.
    ///
    /// With a checkpoint directory an interrupted scan is persisted and picked
    /// up by the next call.
    pub fn discover(&self) -> Result<Vec<String>, ExtractError> {
        Ok(self.discover_ranked()?.into_iter().map(|entry| entry.hashtag).collect())
    }

    /// Top-K hashtags with their rank and tweet count, see [`discover`](Self::discover)
    pub fn discover_ranked(&self) -> Result<Vec<TopKEntry>, ExtractError> {
        let discoverer = HashtagDiscoverer::new(&self.store, self.config.top_k)
            .with_policy(self.config.schema_policy)
            .with_control(self.control.clone());

        let resumed = match &self.checkpoints {
            Some(dir) => dir.load_discovery()?,
            None => None,
        };
        let mut state = match resumed {
            Some(state) => {
                info!(offset = state.cursor.offset, total = state.cursor.total, "resuming discovery scan");
                state
            }
            None => ScanState::start(&self.store)?,
        };

        let outcome = discoverer.discover_resumable(&mut state, self.config.effective_chunk_size());
        let offset = state.cursor.offset;
        self.settle(outcome, offset, &state, self.checkpoints.as_ref().map(CheckpointDir::discovery))?;

        let top = state.accumulator.ranked(self.config.top_k);
        info!(distinct = state.accumulator.len(), selected = top.len(), "hashtags discovered");
        Ok(top)
    }

    /// Corpus statistics, computed once and then frozen.
    ///
    /// A statistics snapshot is reused only when its [`CorpusFingerprint`]
    /// matches the current store and settings.
    pub fn aggregate(&self) -> Result<Arc<CorpusStatistics>, ExtractError> {
        let aggregator = self.aggregator();
        let fingerprint = aggregator.fingerprint()?;

        if let Some(dir) = &self.checkpoints {
            if let Some(stats) = dir.load_statistics(&fingerprint)? {
                info!(tweets = stats.total_tweets, "reusing corpus statistics snapshot");
                return Ok(Arc::new(stats));
            }
        }

        let resumed = match &self.checkpoints {
            Some(dir) => dir.load_aggregation(&fingerprint)?,
            None => None,
        };
        let mut state = match resumed {
            Some(state) => {
                info!(offset = state.cursor.offset, total = state.cursor.total, "resuming corpus scan");
                state
            }
            None => ScanState::start(&self.store)?,
        };

        let outcome = aggregator.aggregate_resumable(&mut state, self.config.effective_chunk_size());
        let offset = state.cursor.offset;
        let stamped = Stamped { fingerprint, state: &state };
        self.settle(outcome, offset, &stamped, self.checkpoints.as_ref().map(CheckpointDir::aggregation))?;

        let stats = state.to_statistics(stamped.fingerprint);
        if let Some(dir) = &self.checkpoints {
            dir.save_statistics(&stats)?;
        }
        Ok(Arc::new(stats))
    }

    /// Fingerprint of the store under this pipeline's stemming and schema settings
    pub fn fingerprint(&self) -> Result<CorpusFingerprint, StoreError> {
        self.aggregator().fingerprint()
    }

    fn aggregator(&self) -> CorpusStatisticsAggregator<'_, S> {
        CorpusStatisticsAggregator::new(&self.store, self.tokenizer.clone())
            .with_policy(self.config.schema_policy)
            .with_control(self.control.clone())
    }

    /// Persist or clear the scan checkpoint according to how the scan ended
    fn settle<T: Serialize>(
        &self,
        outcome: Result<ScanStatus, ExtractError>,
        offset: u64,
        resume_point: &T,
        path: Option<PathBuf>,
    ) -> Result<(), ExtractError> {
        match outcome {
            Ok(ScanStatus::Completed) => {
                if let Some(path) = &path {
                    checkpoint::remove(path)?;
                }
                Ok(())
            }
            Ok(ScanStatus::Cancelled) => {
                if let Some(path) = &path {
                    checkpoint::save(path, resume_point)?;
                }
                Err(ExtractError::Cancelled { offset })
            }
            Err(err @ ExtractError::Store(_)) => {
                if let Some(path) = &path {
                    checkpoint::save(path, resume_point)?;
                    warn!(offset, path = %path.display(), "scan interrupted, checkpoint saved");
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// per hashtag extraction
impl<S: TweetStore> Pipeline<S> {
    /// Canonical tweets carrying `hashtag`, deduplicated by id
    pub fn tweets_for_hashtag(&self, hashtag: &str) -> Result<Vec<CanonicalTweet>, FeatureError> {
        let records = self.store.fetch_by_hashtag(hashtag)?;
        let mut seen = HashSet::with_capacity(records.len());
        let mut tweets = Vec::with_capacity(records.len());
        for record in &records {
            match normalize(record) {
                Ok(tweet) => {
                    if tweet.contains_hashtag(hashtag) && seen.insert(tweet.id.clone()) {
                        tweets.push(tweet);
                    }
                }
                Err(err) => match self.config.schema_policy {
                    SchemaPolicy::Skip => warn!(hashtag, error = %err, "skipping malformed tweet"),
                    SchemaPolicy::Abort => return Err(err.into()),
                },
            }
        }
        Ok(tweets)
    }

    /// One feature row for `hashtag`
    pub fn extract_hashtag(&self, hashtag: &str, stats: &CorpusStatistics) -> Result<FeatureRow, FeatureError> {
        let tweets = self.tweets_for_hashtag(hashtag)?;
        if tweets.is_empty() {
            return Err(FeatureError::NoTweets { hashtag: hashtag.to_string() });
        }

        let ctx = HashtagContext { hashtag, tweets: &tweets, stats };
        let mut row = FeatureRow::new(hashtag);
        for extractor in &self.extractors {
            extractor.extract(&ctx, &mut row).map_err(|err| {
                debug!(hashtag, extractor = extractor.name(), error = %err, "extractor failed");
                err
            })?;
        }
        Ok(row)
    }

    /// Extract every hashtag on the worker pool and append the rows to `sink`.
    ///
    /// A hashtag that fails is left out and reported; a sink failure stops the run.
    pub fn extract_all<K: FeatureSink>(
        &self,
        hashtags: &[String],
        stats: Arc<CorpusStatistics>,
        sink: &SharedSink<K>,
    ) -> Result<Vec<HashtagFailure>, ExtractError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()?;

        let outcomes: Vec<Option<HashtagFailure>> = pool.install(|| {
            hashtags
                .par_iter()
                .map(|hashtag| match self.extract_hashtag(hashtag, &stats) {
                    Ok(row) => sink.append(&row).map(|_| None),
                    Err(err) => {
                        warn!(hashtag = %hashtag, error = %err, "hashtag omitted");
                        Ok(Some(HashtagFailure { hashtag: hashtag.clone(), reason: err.to_string() }))
                    }
                })
                .collect::<Result<Vec<_>, SinkError>>()
        })?;

        Ok(outcomes.into_iter().flatten().collect())
    }

    /// Full run into `sink`
    ///
    /// # Returns
    /// * `(RunReport, K)` - the report and the flushed sink
    pub fn run<K: FeatureSink>(&self, sink: K) -> Result<(RunReport, K), ExtractError> {
        let working_set = self.discover_ranked()?;
        let selected: Vec<String> = working_set.iter().map(|entry| entry.hashtag.clone()).collect();
        let stats = self.aggregate()?;

        let shared = SharedSink::new(sink);
        let failures = self.extract_all(&selected, Arc::clone(&stats), &shared)?;
        let rows_written = shared.rows()?;
        let sink = shared.into_inner()?;

        let report = RunReport {
            selected,
            working_set,
            rows_written,
            failures,
            skipped_records: stats.skipped_records,
        };
        info!(
            selected = report.selected.len(),
            rows = report.rows_written,
            failed = report.failures.len(),
            skipped = report.skipped_records,
            "feature table written"
        );
        Ok((report, sink))
    }
}
