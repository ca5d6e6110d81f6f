use std::collections::HashSet;

use tracing::debug;

use crate::{
    error::FeatureError,
    extractor::{row::FeatureRow, token::WordFrequency, FeatureExtractor, HashtagContext},
    utils::{math::safe_ratio, text::WordTokenizer},
};

/// Ratios of the hashtag's tweets against the corpus totals, and the
/// divergence of their word distribution from the corpus distribution.
#[derive(Debug, Clone, Default)]
pub struct TweetFeatureExtractor {
    tokenizer: WordTokenizer,
}

impl TweetFeatureExtractor {
    /// `tokenizer` must be the one the corpus statistics were built with
    pub fn new(tokenizer: WordTokenizer) -> Self {
        Self { tokenizer }
    }

    /// Word distribution of the hashtag's tweets
    pub fn word_frequency(&self, ctx: &HashtagContext<'_>) -> WordFrequency {
        let mut freq = WordFrequency::new();
        for tweet in ctx.tweets {
            freq.add_words(&self.tokenizer.words(&tweet.text));
        }
        freq
    }
}

impl FeatureExtractor for TweetFeatureExtractor {
    fn name(&self) -> &'static str {
        "tweet"
    }

    fn extract(&self, ctx: &HashtagContext<'_>, row: &mut FeatureRow) -> Result<(), FeatureError> {
        let stats = ctx.stats;
        let tweets = ctx.tweets;

        let authors: HashSet<&str> = tweets.iter().map(|t| t.author_id.as_str()).collect();
        let retweets = tweets.iter().filter(|t| t.is_retweet).count();
        let mentions = tweets.iter().filter(|t| t.has_mentions).count();
        let urls = tweets.iter().filter(|t| t.has_urls).count();

        row.tweet_ratio = safe_ratio(tweets.len(), stats.total_tweets);
        row.author_ratio = safe_ratio(authors.len(), stats.total_authors);
        row.retweet_ratio = safe_ratio(retweets, stats.total_retweets);
        row.mention_ratio = safe_ratio(mentions, stats.total_mentions);
        row.url_ratio = safe_ratio(urls, stats.total_urls);

        let (divergence, missing) = self.word_frequency(ctx).kl_divergence_from(&stats.word_freq);
        if missing > 0 {
            debug!(hashtag = ctx.hashtag, missing, "words absent from corpus distribution");
        }
        row.word_divergence_distribution = divergence;
        Ok(())
    }
}
