//! Time ranges of each pool already fully present in the transaction store.
//!
//! The intervals of a pool are kept sorted, disjoint and non-touching: two
//! ranges that overlap or are integer-adjacent (`[1, 5]` and `[6, 9]`) are
//! always folded into one.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::Result,
    store::IntervalStore,
    types::{PoolKey, TimeRange, Timestamp},
};

/// Merges `new` into the sorted interval set `existing`.
pub fn merge(existing: &[TimeRange], new: TimeRange) -> Vec<TimeRange> {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let (mut start, mut end) = (new.start(), new.end());

    for interval in existing {
        if interval.end().saturating_add(1) < new.start() {
            before.push(*interval);
        } else if interval.start() > new.end().saturating_add(1) {
            after.push(*interval);
        } else {
            start = start.min(interval.start());
            end = end.max(interval.end());
        }
    }

    before.reserve(after.len() + 1);
    // `start <= end` holds since both only widen a valid range.
    before.push(TimeRange::new(start, end).unwrap_or(new));
    before.extend(after);
    before
}

/// Interval coverage of each pool over an [`IntervalStore`].
///
/// Inserts of the same pool are serialized, lookups are not.
#[derive(Debug)]
pub struct CoverageTracker<S> {
    store: Arc<S>,
    locks: DashMap<PoolKey, Arc<Mutex<()>>>,
}

impl<S: IntervalStore> CoverageTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    fn lock(&self, key: PoolKey) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_default().clone()
    }

    /// Records `[start, end]` as covered.
    pub async fn insert(&self, key: PoolKey, start: Timestamp, end: Timestamp) -> Result<()> {
        let range = TimeRange::new(start, end)?;
        let lock = self.lock(key);
        let _guard = lock.lock().await;

        let existing = self.store.intervals(key).await?;
        let merged = merge(&existing, range);
        debug!(%key, %range, intervals = merged.len(), "Extended coverage");
        self.store.replace_intervals(key, merged).await
    }

    /// Whether a single stored interval contains `[start, end]`.
    pub async fn contains(&self, key: PoolKey, start: Timestamp, end: Timestamp) -> Result<bool> {
        let range = TimeRange::new(start, end)?;
        let intervals = self.store.intervals(key).await?;
        Ok(intervals.iter().any(|interval| interval.covers(&range)))
    }

    pub async fn intervals(&self, key: PoolKey) -> Result<Vec<TimeRange>> {
        self.store.intervals(key).await
    }
}
