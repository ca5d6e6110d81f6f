use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use tracing::{debug, warn};

use crate::{
    error::StoreError,
    extractor::schema::{normalize, RawTweet},
    store::TweetStore,
};

/// In-memory tweet store.
///
/// Keeps the records in load order and indexes them by id and by canonical
/// hashtag text. Records that fail normalization stay scannable (so scans can
/// report them) but are not reachable through the hashtag index.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tweets: Vec<RawTweet>,
    by_id: HashMap<String, usize>,
    by_hashtag: HashMap<String, Vec<usize>>,
}

impl MemoryStore {
    pub fn new(tweets: Vec<RawTweet>) -> Self {
        let mut by_id = HashMap::with_capacity(tweets.len());
        let mut by_hashtag: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, raw) in tweets.iter().enumerate() {
            by_id.insert(raw.display_id(), idx);
            match normalize(raw) {
                Ok(tweet) => {
                    let mut seen: Vec<&str> = Vec::with_capacity(tweet.hashtags.len());
                    for tag in &tweet.hashtags {
                        if seen.contains(&tag.text.as_str()) {
                            continue;
                        }
                        seen.push(&tag.text);
                        by_hashtag.entry(tag.text.clone()).or_default().push(idx);
                    }
                }
                Err(e) => debug!(error = %e, "record left out of hashtag index"),
            }
        }

        Self { tweets, by_id, by_hashtag }
    }

    /// Load a JSON-lines dump, one tweet document per line. Blank lines are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StoreError> {
        let mut tweets = Vec::new();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let raw: RawTweet = serde_json::from_str(&line)
                .map_err(|source| StoreError::Decode { line: line_no + 1, source })?;
            tweets.push(raw);
        }
        if tweets.is_empty() {
            warn!("tweet dump is empty");
        }
        Ok(Self::new(tweets))
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_reader(File::open(path)?)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tweets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }
}

impl TweetStore for MemoryStore {
    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.tweets.len() as u64)
    }

    fn fetch_page(&self, offset: u64, limit: usize) -> Result<Vec<RawTweet>, StoreError> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.tweets.len());
        let end = start.saturating_add(limit).min(self.tweets.len());
        Ok(self.tweets[start..end].to_vec())
    }

    fn fetch_by_hashtag(&self, hashtag: &str) -> Result<Vec<RawTweet>, StoreError> {
        Ok(self
            .by_hashtag
            .get(hashtag)
            .map(|idxs| idxs.iter().map(|&i| self.tweets[i].clone()).collect())
            .unwrap_or_default())
    }

    fn fetch_by_id(&self, id: &str) -> Result<RawTweet, StoreError> {
        self.by_id
            .get(id)
            .map(|&i| self.tweets[i].clone())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r##"
{"id_str":"1","text":"#A first","entities":{"hashtags":[{"text":"A","indices":[0,2]}]},"user":{"id_str":"u1"},"created_at":1}
{"id_str":"2","text":"#a second","entities":{"hashtags":[{"text":"a","indices":[0,2]}]},"user":{"id_str":"u2"},"created_at":2}

{"id_str":"3","text":"#A #A twice","entities":{"hashtags":[{"text":"A","indices":[0,2]},{"text":"A","indices":[3,5]}]},"user":{"id_str":"u1"},"created_at":3}
{"id_str":"4","truncated":true,"text":"broken","user":{"id_str":"u3"},"created_at":4}
"##;

    #[test]
    fn loads_json_lines_and_pages() {
        let store = MemoryStore::from_reader(DUMP.as_bytes()).unwrap();
        assert_eq!(store.count().unwrap(), 4);

        let page = store.fetch_page(1, 2).unwrap();
        let ids: Vec<String> = page.iter().map(RawTweet::display_id).collect();
        assert_eq!(ids, vec!["2", "3"]);

        assert!(store.fetch_page(4, 10).unwrap().is_empty());
        assert_eq!(store.fetch_page(3, 10).unwrap().len(), 1);
    }

    #[test]
    fn hashtag_lookup_is_case_sensitive_and_deduplicated() {
        let store = MemoryStore::from_reader(DUMP.as_bytes()).unwrap();
        let upper: Vec<String> = store.fetch_by_hashtag("A").unwrap().iter().map(RawTweet::display_id).collect();
        assert_eq!(upper, vec!["1", "3"]);
        assert_eq!(store.fetch_by_hashtag("a").unwrap().len(), 1);
        assert!(store.fetch_by_hashtag("missing").unwrap().is_empty());
    }

    #[test]
    fn point_lookup() {
        let store = MemoryStore::from_reader(DUMP.as_bytes()).unwrap();
        assert_eq!(store.fetch_by_id("4").unwrap().display_id(), "4");
        assert!(matches!(store.fetch_by_id("9"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn bad_line_reports_position() {
        let err = MemoryStore::from_reader("{\"id_str\":\"1\"}\nnot json\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::Decode { line: 2, .. }));
    }
}
