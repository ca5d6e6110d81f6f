use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::SchemaPolicy,
    error::{ExtractError, StoreError},
    extractor::{
        scan::{run_scan, ChunkAccumulator, ScanControl, ScanState, ScanStatus},
        schema::{CanonicalTweet, RawTweet},
        token::WordFrequency,
    },
    store::TweetStore,
    utils::text::WordTokenizer,
};

/// Corpus-wide denominators shared by every per-hashtag ratio feature.
///
/// Computed once per run by [`CorpusStatisticsAggregator`] and published
/// behind an `Arc`; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStatistics {
    /// tweets that normalized successfully
    pub total_tweets: u64,
    pub total_retweets: u64,
    /// distinct author ids
    pub total_authors: u64,
    /// tweets with at least one url
    pub total_urls: u64,
    /// tweets with at least one user mention
    pub total_mentions: u64,
    /// word counts over sanitized canonical text
    pub word_freq: WordFrequency,
    /// records dropped as malformed
    pub skipped_records: u64,
    /// corpus and settings these totals were computed over
    pub fingerprint: CorpusFingerprint,
}

/// Identity of a corpus scan: which records, and which settings shaped the totals.
///
/// A saved snapshot or checkpoint is only valid for an identical fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFingerprint {
    /// store size when the scan started
    pub corpus_size: u64,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
    /// word distribution built from stemmed words
    pub stemming: bool,
    pub schema_policy: SchemaPolicy,
}

impl CorpusFingerprint {
    /// Fingerprint of `store` as it is now, scanned with `tokenizer` under `policy`.
    ///
    /// Reads the store size and the first and last record only.
    pub fn of<S: TweetStore + ?Sized>(
        store: &S,
        tokenizer: &WordTokenizer,
        policy: SchemaPolicy,
    ) -> Result<Self, StoreError> {
        let corpus_size = store.count()?;
        let id_at = |offset: u64| -> Result<Option<String>, StoreError> {
            Ok(store.fetch_page(offset, 1)?.first().map(RawTweet::display_id))
        };
        let (first_id, last_id) = match corpus_size {
            0 => (None, None),
            n => (id_at(0)?, id_at(n - 1)?),
        };
        Ok(Self {
            corpus_size,
            first_id,
            last_id,
            stemming: tokenizer.is_stemming(),
            schema_policy: policy,
        })
    }
}

/// Running totals of an aggregation scan.
///
/// Every field is a count or a set, so partial accumulators merge in any
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusAccumulator {
    pub total_tweets: u64,
    pub total_retweets: u64,
    pub authors: HashSet<String>,
    pub total_urls: u64,
    pub total_mentions: u64,
    pub word_freq: WordFrequency,
}

impl ChunkAccumulator for CorpusAccumulator {
    type Context = WordTokenizer;

    fn absorb(&mut self, tokenizer: &WordTokenizer, _position: u64, tweet: &CanonicalTweet) {
        self.total_tweets += 1;
        self.total_retweets += u64::from(tweet.is_retweet);
        self.total_urls += u64::from(tweet.has_urls);
        self.total_mentions += u64::from(tweet.has_mentions);
        if !self.authors.contains(&tweet.author_id) {
            self.authors.insert(tweet.author_id.clone());
        }
        self.word_freq.add_words(&tokenizer.words(&tweet.text));
    }

    fn merge(&mut self, other: Self) {
        self.total_tweets += other.total_tweets;
        self.total_retweets += other.total_retweets;
        self.total_urls += other.total_urls;
        self.total_mentions += other.total_mentions;
        self.authors.extend(other.authors);
        self.word_freq.merge(&other.word_freq);
    }
}

impl ScanState<CorpusAccumulator> {
    /// Freeze the accumulated totals
    pub fn to_statistics(&self, fingerprint: CorpusFingerprint) -> CorpusStatistics {
        let acc = &self.accumulator;
        CorpusStatistics {
            total_tweets: acc.total_tweets,
            total_retweets: acc.total_retweets,
            total_authors: acc.authors.len() as u64,
            total_urls: acc.total_urls,
            total_mentions: acc.total_mentions,
            word_freq: acc.word_freq.clone(),
            skipped_records: self.skipped,
            fingerprint,
        }
    }
}

/// Computes [`CorpusStatistics`] with one chunked scan.
pub struct CorpusStatisticsAggregator<'a, S: ?Sized> {
    store: &'a S,
    tokenizer: WordTokenizer,
    policy: SchemaPolicy,
    control: ScanControl,
}

impl<'a, S: TweetStore + ?Sized> CorpusStatisticsAggregator<'a, S> {
    pub fn new(store: &'a S, tokenizer: WordTokenizer) -> Self {
        Self {
            store,
            tokenizer,
            policy: SchemaPolicy::default(),
            control: ScanControl::new(),
        }
    }

    pub fn with_policy(mut self, policy: SchemaPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_control(mut self, control: ScanControl) -> Self {
        self.control = control;
        self
    }

    /// Scan the whole corpus once.
    pub fn aggregate(&self, chunk_size: usize) -> Result<CorpusStatistics, ExtractError> {
        let fingerprint = self.fingerprint()?;
        let mut state = ScanState::start(self.store)?;
        match self.aggregate_resumable(&mut state, chunk_size)? {
            ScanStatus::Completed => Ok(state.to_statistics(fingerprint)),
            ScanStatus::Cancelled => Err(ExtractError::Cancelled { offset: state.cursor.offset }),
        }
    }

    /// Continue an aggregation scan from `state`, see [`run_scan`].
    pub fn aggregate_resumable(
        &self,
        state: &mut ScanState<CorpusAccumulator>,
        chunk_size: usize,
    ) -> Result<ScanStatus, ExtractError> {
        let status = run_scan(self.store, state, &self.tokenizer, chunk_size, self.policy, &self.control)?;
        if status == ScanStatus::Completed {
            let acc = &state.accumulator;
            info!(
                tweets = acc.total_tweets,
                retweets = acc.total_retweets,
                authors = acc.authors.len(),
                urls = acc.total_urls,
                mentions = acc.total_mentions,
                vocabulary = acc.word_freq.word_num(),
                skipped = state.skipped,
                "corpus statistics ready"
            );
        }
        Ok(status)
    }

    /// Fingerprint of the store under this aggregator's tokenizer and policy
    pub fn fingerprint(&self) -> Result<CorpusFingerprint, StoreError> {
        CorpusFingerprint::of(self.store, &self.tokenizer, self.policy)
    }

    #[inline]
    pub fn tokenizer(&self) -> &WordTokenizer {
        &self.tokenizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extractor::scan::tests::broken, extractor::schema::RawTweet, store::MemoryStore};
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawTweet {
        serde_json::from_value(value).unwrap()
    }

    fn corpus() -> MemoryStore {
        MemoryStore::new(vec![
            raw(json!({
                "id_str": "1", "text": "plastic ocean https://t.co/abc",
                "entities": {"hashtags": [], "urls": [{"url": "https://t.co/abc"}]},
                "user": {"id_str": "u1"}, "created_at": 10
            })),
            raw(json!({
                "id_str": "2", "text": "RT @a: plastic",
                "entities": {"hashtags": [], "user_mentions": [{"screen_name": "a"}]},
                "retweeted_status": {"id_str": "0", "text": "plastic bag", "entities": {"hashtags": []}},
                "user": {"id_str": "u2"}, "created_at": 20
            })),
            raw(json!({
                "id_str": "3", "text": "ocean",
                "entities": {"hashtags": []},
                "user": {"id_str": "u1"}, "created_at": 30
            })),
            broken(4),
        ])
    }

    #[test]
    fn single_pass_totals() {
        let store = corpus();
        let stats = CorpusStatisticsAggregator::new(&store, WordTokenizer::plain()).aggregate(2).unwrap();
        assert_eq!(stats.total_tweets, 3);
        assert_eq!(stats.total_retweets, 1);
        assert_eq!(stats.total_authors, 2);
        assert_eq!(stats.total_urls, 1);
        assert_eq!(stats.total_mentions, 1);
        assert_eq!(stats.skipped_records, 1);
        assert_eq!(stats.fingerprint.corpus_size, 4);
        assert_eq!(stats.fingerprint.first_id.as_deref(), Some("1"));
        assert_eq!(stats.fingerprint.last_id.as_deref(), Some("4"));
        assert!(!stats.fingerprint.stemming);
        // url stripped, retweet counted through its original text
        assert_eq!(stats.word_freq.word_count("plastic"), 2);
        assert_eq!(stats.word_freq.word_count("bag"), 1);
        assert_eq!(stats.word_freq.word_count("ocean"), 2);
        assert_eq!(stats.word_freq.total_count(), 5);
    }

    #[test]
    fn chunk_size_does_not_change_totals() {
        let store = corpus();
        let agg = CorpusStatisticsAggregator::new(&store, WordTokenizer::plain());
        let one = agg.aggregate(1).unwrap();
        let all = agg.aggregate(100).unwrap();
        assert_eq!(one.total_authors, all.total_authors);
        assert_eq!(one.word_freq.total_count(), all.word_freq.total_count());
        assert_eq!(one.word_freq.word_count("ocean"), all.word_freq.word_count("ocean"));
    }

    #[test]
    fn zero_retweet_corpus() {
        let store = MemoryStore::new(vec![raw(json!({
            "id_str": "1", "text": "solo", "entities": {"hashtags": []},
            "user": {"id_str": "u1"}, "created_at": 1
        }))]);
        let stats = CorpusStatisticsAggregator::new(&store, WordTokenizer::plain()).aggregate(10).unwrap();
        assert_eq!(stats.total_retweets, 0);
        assert_eq!(stats.total_tweets, 1);
    }

    #[test]
    fn abort_policy_surfaces_bad_record() {
        let store = corpus();
        let err = CorpusStatisticsAggregator::new(&store, WordTokenizer::plain())
            .with_policy(SchemaPolicy::Abort)
            .aggregate(10)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Schema { position: 3, .. }));
    }
}
