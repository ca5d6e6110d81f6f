use serde::{Deserialize, Serialize};

use crate::extractor::sentiment::SentimentClass;

/// One persisted row of the feature table, keyed by `hashtag`.
///
/// Field order is the column order of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub hashtag: String,
    // orthography
    pub char_length: i64,
    pub contains_digits: bool,
    pub all_caps: bool,
    pub any_caps: bool,
    pub no_caps: bool,
    pub special_signals: bool,
    // usage
    pub cooccurance: bool,
    pub location: Option<f64>,
    pub hashtag_sentiment: SentimentClass,
    pub popularity: u64,
    pub popularity_bucket: u8,
    /// epoch seconds of the earliest tweet
    pub created_at: i64,
    /// seconds between earliest and latest tweet
    pub lifespan: i64,
    // corpus ratios
    pub tweet_ratio: f64,
    pub author_ratio: f64,
    pub retweet_ratio: f64,
    pub mention_ratio: f64,
    pub url_ratio: f64,
    pub word_divergence_distribution: f64,
    pub tweet_topic: Option<String>,
}

impl FeatureRow {
    /// Column names, in table order
    pub const COLUMNS: [&'static str; 21] = [
        "hashtag",
        "char_length",
        "contains_digits",
        "all_caps",
        "any_caps",
        "no_caps",
        "special_signals",
        "cooccurance",
        "location",
        "hashtag_sentiment",
        "popularity",
        "popularity_bucket",
        "created_at",
        "lifespan",
        "tweet_ratio",
        "author_ratio",
        "retweet_ratio",
        "mention_ratio",
        "url_ratio",
        "word_divergence_distribution",
        "tweet_topic",
    ];

    /// Empty row for `hashtag`, filled in by the extractors
    pub fn new(hashtag: impl Into<String>) -> Self {
        Self {
            hashtag: hashtag.into(),
            char_length: 0,
            contains_digits: false,
            all_caps: false,
            any_caps: false,
            no_caps: false,
            special_signals: false,
            cooccurance: false,
            location: None,
            hashtag_sentiment: SentimentClass::Neutral,
            popularity: 0,
            popularity_bucket: 0,
            created_at: 0,
            lifespan: 0,
            tweet_ratio: 0.0,
            author_ratio: 0.0,
            retweet_ratio: 0.0,
            mention_ratio: 0.0,
            url_ratio: 0.0,
            word_divergence_distribution: 0.0,
            tweet_topic: None,
        }
    }
}

/// Popularity label used by the classifiers.
///
/// Five buckets with base `F`: ≤F, ≤2F, ≤4F, ≤8F, above.
#[inline]
pub fn popularity_bucket(popularity: u64, base: u64) -> u8 {
    let f = base.max(1);
    match popularity {
        p if p <= f => 0,
        p if p <= f.saturating_mul(2) => 1,
        p if p <= f.saturating_mul(4) => 2,
        p if p <= f.saturating_mul(8) => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(popularity_bucket(0, 10), 0);
        assert_eq!(popularity_bucket(10, 10), 0);
        assert_eq!(popularity_bucket(11, 10), 1);
        assert_eq!(popularity_bucket(20, 10), 1);
        assert_eq!(popularity_bucket(40, 10), 2);
        assert_eq!(popularity_bucket(80, 10), 3);
        assert_eq!(popularity_bucket(81, 10), 4);
    }

    #[test]
    fn huge_base_does_not_overflow() {
        assert_eq!(popularity_bucket(u64::MAX, u64::MAX), 0);
        assert_eq!(popularity_bucket(u64::MAX, u64::MAX / 2 + 1), 1);
        assert_eq!(popularity_bucket(u64::MAX, u64::MAX / 4), 3);
        assert_eq!(popularity_bucket(u64::MAX, u64::MAX / 16), 4);
        assert_eq!(popularity_bucket(1, u64::MAX / 3), 0);
    }

    #[test]
    fn columns_match_serialized_header() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(FeatureRow::new("x")).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = data.lines().next().unwrap();
        assert_eq!(header, FeatureRow::COLUMNS.join(","));
    }
}
