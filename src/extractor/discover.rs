use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::SchemaPolicy,
    error::ExtractError,
    extractor::{
        schema::CanonicalTweet,
        scan::{run_scan, ChunkAccumulator, ScanControl, ScanState, ScanStatus},
    },
    store::TweetStore,
    utils::sort::top_k_by_count,
};

/// Frequency and first appearance of one hashtag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashtagTally {
    /// tweets carrying the hashtag
    pub count: u64,
    /// `(corpus position, index within the tweet)` of the first sighting
    pub first_seen: (u64, u32),
}

/// One line of the working set file: a selected hashtag, its 1-based rank
/// and the number of tweets carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopKEntry {
    pub hashtag: String,
    pub rank: usize,
    pub count: u64,
}

/// Global hashtag frequency table built by discovery.
///
/// This counter, not the tweets, is the long-lived allocation of a discovery
/// scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashtagCounter {
    #[serde(with = "indexmap::map::serde_seq")]
    tally: IndexMap<String, HashtagTally>,
}

impl HashtagCounter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, hashtag: &str) -> Option<&HashtagTally> {
        self.tally.get(hashtag)
    }

    /// Number of distinct hashtags seen
    #[inline]
    pub fn len(&self) -> usize {
        self.tally.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    /// The `k` most frequent hashtags, ties broken by first sighting
    pub fn top_k(&self, k: usize) -> Vec<String> {
        self.ranked(k).into_iter().map(|entry| entry.hashtag).collect()
    }

    /// Same selection as [`top_k`](Self::top_k), with rank and count
    pub fn ranked(&self, k: usize) -> Vec<TopKEntry> {
        let entries: Vec<(&str, u64, (u64, u32))> = self
            .tally
            .iter()
            .map(|(tag, t)| (tag.as_str(), t.count, t.first_seen))
            .collect();
        top_k_by_count(&entries, k)
            .into_iter()
            .enumerate()
            .map(|(i, tag)| TopKEntry {
                hashtag: tag.to_string(),
                rank: i + 1,
                count: self.tally.get(tag).map_or(0, |t| t.count),
            })
            .collect()
    }
}

impl ChunkAccumulator for HashtagCounter {
    type Context = ();

    fn absorb(&mut self, _: &(), position: u64, tweet: &CanonicalTweet) {
        for (idx, tag) in tweet.hashtags.iter().enumerate() {
            // a tweet repeating a hashtag counts once
            if tweet.hashtags[..idx].iter().any(|prev| prev.text == tag.text) {
                continue;
            }
            let seen = (position, idx as u32);
            self.tally
                .entry(tag.text.clone())
                .and_modify(|t| {
                    t.count += 1;
                    t.first_seen = t.first_seen.min(seen);
                })
                .or_insert(HashtagTally { count: 1, first_seen: seen });
        }
    }

    fn merge(&mut self, other: Self) {
        for (tag, theirs) in other.tally {
            self.tally
                .entry(tag)
                .and_modify(|t| {
                    t.count += theirs.count;
                    t.first_seen = t.first_seen.min(theirs.first_seen);
                })
                .or_insert(theirs);
        }
    }
}

/// Selects the top-K working set of hashtags with one chunked corpus scan.
pub struct HashtagDiscoverer<'a, S: ?Sized> {
    store: &'a S,
    top_k: usize,
    policy: SchemaPolicy,
    control: ScanControl,
}

impl<'a, S: TweetStore + ?Sized> HashtagDiscoverer<'a, S> {
    pub fn new(store: &'a S, top_k: usize) -> Self {
        Self {
            store,
            top_k,
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

    /// Scan the whole corpus and return the top-K hashtags, most frequent first.
    pub fn discover(&self, chunk_size: usize) -> Result<Vec<String>, ExtractError> {
        let mut state = ScanState::start(self.store)?;
        match self.discover_resumable(&mut state, chunk_size)? {
            ScanStatus::Completed => Ok(state.accumulator.top_k(self.top_k)),
            ScanStatus::Cancelled => Err(ExtractError::Cancelled { offset: state.cursor.offset }),
        }
    }

    /// Continue a discovery scan from `state`.
    ///
    /// On error or cancellation `state` holds the counts of every completed
    /// chunk; calling again picks up at `state.cursor`.
    pub fn discover_resumable(
        &self,
        state: &mut ScanState<HashtagCounter>,
        chunk_size: usize,
    ) -> Result<ScanStatus, ExtractError> {
        let status = run_scan(self.store, state, &(), chunk_size, self.policy, &self.control)?;
        if status == ScanStatus::Completed {
            info!(
                scanned = state.scanned,
                skipped = state.skipped,
                distinct = state.accumulator.len(),
                "hashtag discovery finished"
            );
        }
        Ok(status)
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extractor::scan::tests::tweet, store::MemoryStore};

    fn corpus() -> MemoryStore {
        MemoryStore::new(vec![
            tweet(0, &["B"]),
            tweet(1, &["A", "C"]),
            tweet(2, &["A"]),
            tweet(3, &["B", "B"]),
            tweet(4, &["covid", "COVID"]),
            tweet(5, &["C"]),
        ])
    }

    #[test]
    fn top_k_by_frequency_then_first_seen() {
        let store = corpus();
        let top = HashtagDiscoverer::new(&store, 3).discover(2).unwrap();
        // A, B, C all appear in 2 tweets; B first at 0, A at 1, C at (1, 1)
        assert_eq!(top, vec!["B", "A", "C"]);
    }

    #[test]
    fn ranked_entries_carry_rank_and_count() {
        let store = corpus();
        let mut state = ScanState::start(&store).unwrap();
        HashtagDiscoverer::new(&store, 10).discover_resumable(&mut state, 3).unwrap();

        let ranked = state.accumulator.ranked(2);
        assert_eq!(
            ranked,
            vec![
                TopKEntry { hashtag: "B".into(), rank: 1, count: 2 },
                TopKEntry { hashtag: "A".into(), rank: 2, count: 2 },
            ]
        );
        assert!(state.accumulator.ranked(0).is_empty());
    }

    #[test]
    fn repeated_hashtag_in_one_tweet_counts_once() {
        let store = corpus();
        let mut state = ScanState::start(&store).unwrap();
        HashtagDiscoverer::new(&store, 10).discover_resumable(&mut state, 4).unwrap();
        assert_eq!(state.accumulator.get("B").unwrap().count, 2);
    }

    #[test]
    fn hashtags_are_case_sensitive() {
        let store = corpus();
        let top = HashtagDiscoverer::new(&store, 10).discover(100).unwrap();
        assert!(top.contains(&"covid".to_string()));
        assert!(top.contains(&"COVID".to_string()));
        assert_eq!(top.len(), 5);
    }

    #[test]
    fn discovery_is_idempotent_and_chunk_size_independent() {
        let store = corpus();
        let d = HashtagDiscoverer::new(&store, 4);
        let first = d.discover(1).unwrap();
        assert_eq!(first, d.discover(1).unwrap());
        assert_eq!(first, d.discover(5).unwrap());
        assert_eq!(first, d.discover(1000).unwrap());
    }

    #[test]
    fn merge_is_order_independent() {
        let a = {
            let mut c = HashtagCounter::new();
            c.absorb(&(), 0, &crate::extractor::schema::normalize(&tweet(0, &["x", "y"])).unwrap());
            c
        };
        let b = {
            let mut c = HashtagCounter::new();
            c.absorb(&(), 7, &crate::extractor::schema::normalize(&tweet(7, &["y"])).unwrap());
            c
        };
        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);
        assert_eq!(ab.top_k(2), ba.top_k(2));
        assert_eq!(ab.get("y"), ba.get("y"));
        assert_eq!(ab.get("y").unwrap().first_seen, (0, 1));
    }

    #[test]
    fn cancelled_discovery_is_an_error() {
        let store = corpus();
        let control = ScanControl::new();
        control.cancel();
        let err = HashtagDiscoverer::new(&store, 3).with_control(control).discover(2).unwrap_err();
        assert!(matches!(err, ExtractError::Cancelled { offset: 0 }));
    }
}
