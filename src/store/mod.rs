pub mod memory;

use crate::{error::StoreError, extractor::schema::RawTweet};

pub use memory::MemoryStore;

/// Read access to the stored tweet corpus.
///
/// Implementations own pagination, retries and connectivity; callers only see
/// ordered pages and [`StoreError::Unavailable`] when the store cannot answer.
pub trait TweetStore: Send + Sync {
    /// Total number of records in the corpus
    fn count(&self) -> Result<u64, StoreError>;

    /// Up to `limit` records starting at `offset`, in the store's natural order
    fn fetch_page(&self, offset: u64, limit: usize) -> Result<Vec<RawTweet>, StoreError>;

    /// Every record carrying `hashtag` (exact, case-sensitive)
    fn fetch_by_hashtag(&self, hashtag: &str) -> Result<Vec<RawTweet>, StoreError>;

    /// Point lookup by `id_str`
    fn fetch_by_id(&self, id: &str) -> Result<RawTweet, StoreError>;
}

impl<S: TweetStore + ?Sized> TweetStore for &S {
    fn count(&self) -> Result<u64, StoreError> {
        (**self).count()
    }

    fn fetch_page(&self, offset: u64, limit: usize) -> Result<Vec<RawTweet>, StoreError> {
        (**self).fetch_page(offset, limit)
    }

    fn fetch_by_hashtag(&self, hashtag: &str) -> Result<Vec<RawTweet>, StoreError> {
        (**self).fetch_by_hashtag(hashtag)
    }

    fn fetch_by_id(&self, id: &str) -> Result<RawTweet, StoreError> {
        (**self).fetch_by_id(id)
    }
}
