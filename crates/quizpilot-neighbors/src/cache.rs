//! LRU memoization for neighbor lookups.
//!
//! A single ranking pass asks for the same recent ids once per candidate.
//! Wrapping the source in a [`CachedLookup`] means it is hit once per id.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use lru::LruCache;
use quizpilot_core::similarity::{NeighborLookup, Neighbors};

/// Memoizes an inner lookup, including its "absent" answers.
pub struct CachedLookup<L> {
    inner: L,
    cache: Mutex<LruCache<String, Option<Neighbors>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<L: NeighborLookup> CachedLookup<L> {
    /// Cache up to `capacity` ids. A capacity of 0 is treated as 1.
    pub fn new(inner: L, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every cached answer.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl<L: NeighborLookup> NeighborLookup for CachedLookup<L> {
    fn neighbors(&self, id: &str) -> Option<Neighbors> {
        // Check cache first
        match self.cache.lock() {
            Ok(mut cache) => {
                if let Some(cached) = cache.get(id) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return cached.clone();
                }
            }
            Err(_) => {
                tracing::warn!("neighbor cache lock poisoned, bypassing cache");
                return self.inner.neighbors(id);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let answer = self.inner.neighbors(id);

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(id.to_string(), answer.clone());
        }
        answer
    }
}

impl<L> std::fmt::Debug for CachedLookup<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedLookup")
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
