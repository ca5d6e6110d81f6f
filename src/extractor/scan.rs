use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::SchemaPolicy,
    error::{ExtractError, SchemaError, StoreError},
    extractor::schema::{normalize, CanonicalTweet, RawTweet},
    store::TweetStore,
};

/// Position of a chunked corpus scan.
///
/// Everything before `offset` has been absorbed. Persisting the cursor together
/// with the accumulator lets a failed scan resume instead of restarting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanCursor {
    pub offset: u64,
    /// corpus size when the scan started
    pub total: u64,
}

impl ScanCursor {
    /// Cursor at the start of the corpus
    pub fn start<S: TweetStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        Ok(Self { offset: 0, total: store.count()? })
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.offset >= self.total
    }
}

/// Fetch the page at `cursor`.
///
/// # Returns
/// * `(Vec<RawTweet>, ScanCursor)` - the page and the cursor just past it
pub fn next_chunk<S: TweetStore + ?Sized>(
    store: &S,
    cursor: &ScanCursor,
    chunk_size: usize,
) -> Result<(Vec<RawTweet>, ScanCursor), StoreError> {
    let page = store.fetch_page(cursor.offset, chunk_size)?;
    let next = if page.is_empty() {
        // store shrank under us, nothing left to read
        ScanCursor { offset: cursor.offset, total: cursor.offset }
    } else {
        ScanCursor { offset: cursor.offset + page.len() as u64, total: cursor.total }
    };
    Ok((page, next))
}

/// Cooperative cancellation shared between a scan and its operator.
///
/// Checked at chunk boundaries only, so a cancelled scan never leaves a
/// half-absorbed chunk behind.
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    cancelled: Arc<AtomicBool>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// How a scan call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Completed,
    Cancelled,
}

/// Accumulator fed by a chunked scan.
///
/// `merge` must be associative and commutative: chunks are absorbed in
/// parallel partial accumulators that are merged afterwards.
pub trait ChunkAccumulator: Default + Send {
    /// Read-only data needed while absorbing (tokenizer and the like)
    type Context: Sync;

    /// Absorb one tweet found at corpus `position`
    fn absorb(&mut self, ctx: &Self::Context, position: u64, tweet: &CanonicalTweet);

    fn merge(&mut self, other: Self);
}

/// Resumable state of one scan: cursor, accumulator, and record bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanState<A> {
    pub cursor: ScanCursor,
    pub accumulator: A,
    /// records read from the store
    pub scanned: u64,
    /// records dropped by [`SchemaPolicy::Skip`]
    pub skipped: u64,
}

impl<A: ChunkAccumulator> ScanState<A> {
    /// Fresh state positioned at the start of `store`
    pub fn start<S: TweetStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        Ok(Self {
            cursor: ScanCursor::start(store)?,
            accumulator: A::default(),
            scanned: 0,
            skipped: 0,
        })
    }
}

/// Drive a chunked scan until the corpus is exhausted or `control` cancels it.
///
/// `state` is only advanced after a whole chunk has been absorbed. When this
/// returns an error, `state` still describes the last completed chunk and the
/// same call can be repeated to resume.
pub fn run_scan<S, A>(
    store: &S,
    state: &mut ScanState<A>,
    ctx: &A::Context,
    chunk_size: usize,
    policy: SchemaPolicy,
    control: &ScanControl,
) -> Result<ScanStatus, ExtractError>
where
    S: TweetStore + ?Sized,
    A: ChunkAccumulator,
{
    let chunk_size = chunk_size.max(1);
    loop {
        if state.cursor.is_done() {
            return Ok(ScanStatus::Completed);
        }
        if control.is_cancelled() {
            info!(offset = state.cursor.offset, "scan cancelled");
            return Ok(ScanStatus::Cancelled);
        }

        let base = state.cursor.offset;
        let (page, next) = next_chunk(store, &state.cursor, chunk_size).map_err(|e| {
            warn!(offset = base, error = %e, "chunk fetch failed");
            e
        })?;

        let normalized: Vec<Result<CanonicalTweet, SchemaError>> = page.par_iter().map(normalize).collect();

        let mut tweets = Vec::with_capacity(normalized.len());
        let mut skipped = 0u64;
        for (idx, result) in normalized.into_iter().enumerate() {
            let position = base + idx as u64;
            match result {
                Ok(tweet) => tweets.push((position, tweet)),
                Err(source) => match policy {
                    SchemaPolicy::Skip => {
                        warn!(position, error = %source, "skipping malformed tweet");
                        skipped += 1;
                    }
                    SchemaPolicy::Abort => return Err(ExtractError::Schema { position, source }),
                },
            }
        }

        let chunk_acc = tweets
            .par_iter()
            .fold(A::default, |mut acc, (position, tweet)| {
                acc.absorb(ctx, *position, tweet);
                acc
            })
            .reduce(A::default, |mut a, b| {
                a.merge(b);
                a
            });

        state.accumulator.merge(chunk_acc);
        state.scanned += page.len() as u64;
        state.skipped += skipped;
        state.cursor = next;
        debug!(offset = state.cursor.offset, total = state.cursor.total, skipped, "chunk absorbed");
    }
}
