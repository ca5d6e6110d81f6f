use std::sync::Arc;

use crate::{
    error::FeatureError,
    extractor::{row::FeatureRow, FeatureExtractor, HashtagContext},
    utils::sort::stable_mode,
};

/// Topic label of a text, e.g. the dominant topic of an LDA model
pub trait TopicModel: Send + Sync {
    fn topic(&self, text: &str) -> String;
}

impl<F> TopicModel for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn topic(&self, text: &str) -> String {
        self(text)
    }
}

/// Fills `tweet_topic` with the majority topic of the hashtag's tweets.
pub struct TopicFeature {
    model: Arc<dyn TopicModel>,
}

impl TopicFeature {
    pub fn new(model: Arc<dyn TopicModel>) -> Self {
        Self { model }
    }
}

impl FeatureExtractor for TopicFeature {
    fn name(&self) -> &'static str {
        "topic"
    }

    fn extract(&self, ctx: &HashtagContext<'_>, row: &mut FeatureRow) -> Result<(), FeatureError> {
        row.tweet_topic = stable_mode(ctx.tweets.iter().map(|t| self.model.topic(&t.text)));
        Ok(())
    }
}
