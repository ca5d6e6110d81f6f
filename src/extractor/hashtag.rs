use std::sync::Arc;

use tracing::debug;

use crate::{
    config::LocationPolicy,
    error::FeatureError,
    extractor::{
        row::{popularity_bucket, FeatureRow},
        schema::CanonicalTweet,
        sentiment::{SentimentClass, SentimentScorer},
        FeatureExtractor, HashtagContext,
    },
    utils::{
        math::{mean, safe_ratio},
        sort::stable_mode,
        text::{has_repeated_run, trim_token},
    },
};

/// Minimum run of identical characters counted as a special signal
const SPECIAL_SIGNAL_RUN: usize = 3;

/// Features of the hashtag itself and of how it is used:
/// orthography, co-occurrence, position in text, sentiment, popularity, time.
pub struct HashtagFeatureExtractor {
    cooccurrence_threshold: f64,
    location_policy: LocationPolicy,
    bucket_base: u64,
    scorer: Arc<dyn SentimentScorer>,
}

impl HashtagFeatureExtractor {
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            cooccurrence_threshold: 0.4,
            location_policy: LocationPolicy::default(),
            bucket_base: 10,
            scorer,
        }
    }

    pub fn with_cooccurrence_threshold(mut self, threshold: f64) -> Self {
        self.cooccurrence_threshold = threshold;
        self
    }

    pub fn with_location_policy(mut self, policy: LocationPolicy) -> Self {
        self.location_policy = policy;
        self
    }

    pub fn with_bucket_base(mut self, base: u64) -> Self {
        self.bucket_base = base;
        self
    }
}

impl FeatureExtractor for HashtagFeatureExtractor {
    fn name(&self) -> &'static str {
        "hashtag"
    }

    fn extract(&self, ctx: &HashtagContext<'_>, row: &mut FeatureRow) -> Result<(), FeatureError> {
        let tag = ctx.hashtag;
        let tweets = ctx.tweets;

        row.char_length = char_length(tag, tweets);
        row.contains_digits = contains_digits(tag);
        row.all_caps = all_caps(tag);
        row.any_caps = any_caps(tag);
        row.no_caps = no_caps(tag);
        row.special_signals = has_repeated_run(tag, SPECIAL_SIGNAL_RUN);

        row.cooccurance = cooccurrence_ratio(tag, tweets) >= self.cooccurrence_threshold;
        row.location = location(tag, tweets, self.location_policy)?;
        row.hashtag_sentiment = sentiment_majority(self.scorer.as_ref(), tweets);

        row.popularity = tweets.len() as u64;
        row.popularity_bucket = popularity_bucket(row.popularity, self.bucket_base);
        if let Some((created_at, lifespan)) = time_span(tweets) {
            row.created_at = created_at;
            row.lifespan = lifespan;
        }
        Ok(())
    }
}

/// `indices[1] - indices[0] - 1` of the first entity for `tag`.
///
/// Falls back to the character count of `tag` when no entity carries indices.
pub fn char_length(tag: &str, tweets: &[CanonicalTweet]) -> i64 {
    tweets
        .iter()
        .flat_map(|t| t.hashtags.iter())
        .filter(|h| h.text == tag)
        .find_map(|h| h.indices)
        .map(|[start, end]| i64::from(end) - i64::from(start) - 1)
        .unwrap_or_else(|| tag.chars().count() as i64)
}

#[inline]
pub fn contains_digits(tag: &str) -> bool {
    tag.chars().any(char::is_numeric)
}

#[inline]
fn has_cased(tag: &str) -> bool {
    tag.chars().any(|c| c.is_uppercase() || c.is_lowercase())
}

/// at least one cased character, none lowercase
#[inline]
pub fn all_caps(tag: &str) -> bool {
    has_cased(tag) && !tag.chars().any(char::is_lowercase)
}

#[inline]
pub fn any_caps(tag: &str) -> bool {
    tag.chars().any(char::is_uppercase)
}

/// at least one cased character, none uppercase
#[inline]
pub fn no_caps(tag: &str) -> bool {
    has_cased(tag) && !tag.chars().any(char::is_uppercase)
}

/// Share of the tweets carrying `tag` that also carry another hashtag
pub fn cooccurrence_ratio(tag: &str, tweets: &[CanonicalTweet]) -> f64 {
    let appearances = tweets.iter().filter(|t| t.contains_hashtag(tag)).count();
    let cooccurring = tweets
        .iter()
        .filter(|t| t.contains_hashtag(tag) && t.has_other_hashtag(tag))
        .count();
    safe_ratio(cooccurring, appearances)
}

/// Relative position of the `#tag` token in one tweet's text.
///
/// # Returns
/// * `Some(index / word_count)` - index of the first matching token
/// * `None` - if no token matches
pub fn token_position(tag: &str, text: &str) -> Option<f64> {
    let pattern = format!("#{tag}");
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .iter()
        .position(|w| trim_token(w) == pattern)
        .map(|idx| idx as f64 / words.len() as f64)
}

/// Mean relative position of `#tag` over the tweets.
///
/// Tweets where the token can't be found are skipped or fail the hashtag,
/// depending on `policy`. `None` if no tweet yielded a position.
pub fn location(tag: &str, tweets: &[CanonicalTweet], policy: LocationPolicy) -> Result<Option<f64>, FeatureError> {
    let mut positions = Vec::with_capacity(tweets.len());
    for tweet in tweets {
        match token_position(tag, &tweet.text) {
            Some(pos) => positions.push(pos),
            None => match policy {
                LocationPolicy::SkipOccurrence => {
                    debug!(hashtag = tag, tweet = %tweet.id, "hashtag token not in text, skipped");
                }
                LocationPolicy::Fail => {
                    return Err(FeatureError::PatternNotFound {
                        hashtag: tag.to_string(),
                        tweet_id: tweet.id.clone(),
                    })
                }
            },
        }
    }
    Ok(mean(&positions))
}

/// Most common sentiment class over the tweets, ties to the earliest
pub fn sentiment_majority(scorer: &dyn SentimentScorer, tweets: &[CanonicalTweet]) -> SentimentClass {
    stable_mode(tweets.iter().map(|t| scorer.classify(&t.text))).unwrap_or_default()
}

/// `(earliest, latest - earliest)` in epoch seconds
pub fn time_span(tweets: &[CanonicalTweet]) -> Option<(i64, i64)> {
    let earliest = tweets.iter().map(|t| t.created_at).min()?;
    let latest = tweets.iter().map(|t| t.created_at).max()?;
    Some((earliest, latest - earliest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{
        corpus::CorpusStatistics,
        scan::tests::tweet,
        schema::{normalize, HashtagEntity, RawTweet},
    };
    use serde_json::json;

    fn canon(raw: &RawTweet) -> CanonicalTweet {
        normalize(raw).unwrap()
    }

    fn with_text(id: u64, text: &str, tags: &[&str], created_at: i64) -> CanonicalTweet {
        let mut t = canon(&tweet(id, tags));
        t.text = text.to_string();
        t.created_at = created_at;
        t
    }

    #[test]
    fn orthography_of_covid19() {
        assert!(contains_digits("COVID19"));
        assert!(all_caps("COVID19"));
        assert!(any_caps("COVID19"));
        assert!(!no_caps("COVID19"));

        assert!(!all_caps("Covid"));
        assert!(any_caps("Covid"));
        assert!(no_caps("plastic2020"));
        // no cased characters at all
        assert!(!all_caps("2020") && !no_caps("2020"));
    }

    #[test]
    fn char_length_from_indices() {
        let t = canon(&serde_json::from_value::<RawTweet>(json!({
            "id_str": "1", "text": "x #COVID19",
            "entities": {"hashtags": [{"text": "COVID19", "indices": [2, 10]}]},
            "user": {"id_str": "u"}, "created_at": 0
        })).unwrap());
        assert_eq!(char_length("COVID19", &[t]), 10 - 2 - 1);

        let mut no_idx = canon(&tweet(2, &["abc"]));
        no_idx.hashtags = vec![HashtagEntity { text: "abc".into(), indices: None }];
        assert_eq!(char_length("abc", &[no_idx]), 3);
    }

    #[test]
    fn cooccurrence_scenario() {
        // #A alone, #A with #B, #B alone
        let corpus = [canon(&tweet(1, &["A"])), canon(&tweet(2, &["A", "B"])), canon(&tweet(3, &["B"]))];
        let a: Vec<_> = corpus.iter().filter(|t| t.contains_hashtag("A")).cloned().collect();
        let b: Vec<_> = corpus.iter().filter(|t| t.contains_hashtag("B")).cloned().collect();
        assert_eq!(cooccurrence_ratio("A", &a), 0.5);
        assert_eq!(cooccurrence_ratio("B", &b), 0.5);
    }

    #[test]
    fn cooccurrence_boundary_is_inclusive() {
        // 2 of 5 co-occurring = 0.4 exactly
        let tweets = [
            canon(&tweet(1, &["A", "X"])),
            canon(&tweet(2, &["A", "Y"])),
            canon(&tweet(3, &["A"])),
            canon(&tweet(4, &["A"])),
            canon(&tweet(5, &["A"])),
        ];
        let stats = CorpusStatistics::default();
        let ctx = HashtagContext { hashtag: "A", tweets: &tweets, stats: &stats };
        let mut row = FeatureRow::new("A");
        HashtagFeatureExtractor::new(Arc::new(|_: &str| 0.0))
            .extract(&ctx, &mut row)
            .unwrap();
        assert_eq!(cooccurrence_ratio("A", &tweets), 0.4);
        assert!(row.cooccurance);
    }

    #[test]
    fn repeated_hashtag_is_not_cooccurrence() {
        let tweets = [canon(&tweet(1, &["A", "A"]))];
        assert_eq!(cooccurrence_ratio("A", &tweets), 0.0);
    }

    #[test]
    fn location_mean_with_punctuation() {
        let tweets = [
            with_text(1, "#A at start", &["A"], 0),
            with_text(2, "ends with (#A).", &["A"], 0),
        ];
        // 0/3 and 2/3
        let loc = location("A", &tweets, LocationPolicy::Fail).unwrap().unwrap();
        assert!((loc - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn location_policy_on_missing_token() {
        let tweets = [with_text(1, "#A here", &["A"], 0), with_text(2, "#a lowercase only", &["A"], 0)];
        let skipped = location("A", &tweets, LocationPolicy::SkipOccurrence).unwrap();
        assert_eq!(skipped, Some(0.0));

        let err = location("A", &tweets, LocationPolicy::Fail).unwrap_err();
        assert!(matches!(err, FeatureError::PatternNotFound { ref tweet_id, .. } if tweet_id == "2"));

        let none = location("A", &tweets[1..], LocationPolicy::SkipOccurrence).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn single_tweet_span() {
        let tweets = [with_text(1, "#A", &["A"], 1_539_202_764)];
        assert_eq!(time_span(&tweets), Some((1_539_202_764, 0)));

        let tweets = [with_text(1, "#A", &["A"], 100), with_text(2, "#A", &["A"], 40), with_text(3, "#A", &["A"], 70)];
        assert_eq!(time_span(&tweets), Some((40, 60)));
        assert_eq!(time_span(&[]), None);
    }

    #[test]
    fn sentiment_majority_is_stable_mode() {
        let tweets = [
            with_text(1, "neg", &["A"], 0),
            with_text(2, "pos", &["A"], 0),
            with_text(3, "pos", &["A"], 0),
            with_text(4, "neg", &["A"], 0),
        ];
        let scorer = |text: &str| if text == "pos" { 0.9 } else { -0.9 };
        assert_eq!(sentiment_majority(&scorer, &tweets), SentimentClass::Negative);
        assert_eq!(sentiment_majority(&scorer, &tweets[1..]), SentimentClass::Positive);
    }

    #[test]
    fn full_row_for_single_tweet_hashtag() {
        let tweets = [with_text(1, "so #Sooo good", &["Sooo"], 1_000)];
        let stats = CorpusStatistics::default();
        let ctx = HashtagContext { hashtag: "Sooo", tweets: &tweets, stats: &stats };
        let mut row = FeatureRow::new("Sooo");
        HashtagFeatureExtractor::new(Arc::new(|_: &str| 0.7))
            .extract(&ctx, &mut row)
            .unwrap();

        assert_eq!(row.popularity, 1);
        assert_eq!(row.popularity_bucket, 0);
        assert_eq!(row.created_at, 1_000);
        assert_eq!(row.lifespan, 0);
        assert!(row.special_signals);
        assert!(!row.cooccurance);
        assert_eq!(row.hashtag_sentiment, SentimentClass::Positive);
        assert_eq!(row.location, Some(1.0 / 3.0));
        assert_eq!(row.char_length, 4);
    }
}
