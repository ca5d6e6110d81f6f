pub mod corpus;
pub mod discover;
pub mod hashtag;
pub mod pipeline;
pub mod row;
pub mod scan;
pub mod schema;
pub mod sentiment;
pub mod serde;
pub mod token;
pub mod topic;
pub mod tweet;

use crate::{
    error::FeatureError,
    extractor::{corpus::CorpusStatistics, row::FeatureRow, schema::CanonicalTweet},
};

/// Everything a feature extractor sees for one hashtag.
#[derive(Debug, Clone, Copy)]
pub struct HashtagContext<'a> {
    pub hashtag: &'a str,
    /// canonical tweets carrying `hashtag`, deduplicated by id
    pub tweets: &'a [CanonicalTweet],
    pub stats: &'a CorpusStatistics,
}

/// One group of feature columns.
///
/// Extractors are composed by [`pipeline::Pipeline`]; each one fills the
/// columns it owns and leaves the rest of the row alone. They run on
/// worker threads, so they hold no per-hashtag state.
pub trait FeatureExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn extract(&self, ctx: &HashtagContext<'_>, row: &mut FeatureRow) -> Result<(), FeatureError>;
}
