//! # Streaming Module
//!
//! View tracking and eviction bookkeeping for the chunk grid.
//!
//! The grid recomputes its visible set only when the viewer crosses into a different
//! chunk. Chunks that drop out of the visible set are not freed right away: they are
//! remembered here with the update tick at which they left, and become eviction
//! candidates once they have stayed out of view for longer than the configured grace
//! period. Re-entering the view cancels the candidacy.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use cgmath::{Point3, Vector3};
use log::debug;
use lru::LruCache;

/// Chunk coordinate used as the key of the chunk map.
pub type ChunkKey = Point3<i32>;

/// The result of a viewer update that crossed a chunk boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewChange {
    /// The chunk now containing the viewer
    pub active: ChunkKey,
    /// Chunks that are visible now but were not before
    pub entered: Vec<ChunkKey>,
    /// Chunks that were visible before but are not any more
    pub left: Vec<ChunkKey>,
}

/// All chunk keys within Chebyshev distance `radius` of `center`.
pub fn chunks_in_radius(center: ChunkKey, radius: i32) -> impl Iterator<Item = ChunkKey> {
    let span = -radius..=radius;
    span.clone().flat_map(move |dz| {
        let span = span.clone();
        span.clone().flat_map(move |dy| {
            span.clone()
                .map(move |dx| center + Vector3::new(dx, dy, dz))
        })
    })
}

/// Remembers chunks that left the view and decides when they may be evicted.
///
/// Candidates are kept in an LRU so the bookkeeping stays bounded even if the viewer
/// roams for a long time. When the tracker is full the oldest candidate is dropped;
/// the grid picks it up again once there is room (see `ChunkGrid::evict_stale`).
pub struct EvictionTracker {
    /// Chunk key to the update tick at which it left the view.
    candidates: LruCache<ChunkKey, u64>,
    /// Updates a chunk must stay out of view before it is stale.
    grace: u64,
}

impl EvictionTracker {
    /// Creates a tracker holding at most `capacity` candidates.
    pub fn new(capacity: usize, grace: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        EvictionTracker {
            candidates: LruCache::new(capacity),
            grace,
        }
    }

    /// Records that `key` left the view at update `tick`.
    pub fn left_view(&mut self, key: ChunkKey, tick: u64) {
        if let Some((dropped, _)) = self.candidates.push(key, tick) {
            if dropped != key {
                debug!("Eviction tracker full, chunk {:?} untracked for now", dropped);
            }
        }
    }

    /// Cancels the candidacy of a chunk that is visible again.
    pub fn entered_view(&mut self, key: ChunkKey) {
        self.candidates.pop(&key);
    }

    /// Stops tracking a chunk, e.g. after it was evicted.
    pub fn forget(&mut self, key: ChunkKey) {
        self.candidates.pop(&key);
    }

    /// `true` if `key` is waiting for eviction.
    pub fn contains(&self, key: ChunkKey) -> bool {
        self.candidates.contains(&key)
    }

    /// `true` if another candidate fits without dropping one.
    pub fn has_room(&self) -> bool {
        self.candidates.len() < self.candidates.cap().get()
    }

    /// Number of tracked candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// `true` if no chunk is waiting for eviction.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates that have been out of view for more than the grace period at `tick`
    /// and are not in `pinned`, oldest first.
    pub fn stale(&self, tick: u64, pinned: &HashSet<ChunkKey>) -> Vec<ChunkKey> {
        self.candidates
            .iter()
            .rev()
            .filter(|(key, left)| tick.saturating_sub(**left) > self.grace && !pinned.contains(*key))
            .map(|(key, _)| *key)
            .collect()
    }
}
