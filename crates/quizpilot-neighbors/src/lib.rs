//! quizpilot-neighbors — Similarity sources for the quizpilot decision core.
//!
//! Provides an in-memory table of precomputed nearest neighbors loaded from
//! JSONL, an LRU memoizing wrapper for any lookup, and an adapter that turns
//! a fallible source into one that reports "absent" on error.

pub mod cache;
pub mod error;
pub mod fallible;
pub mod table;

pub use cache::CachedLookup;
pub use error::NeighborError;
pub use fallible::FallibleLookup;
pub use table::{open_lookup, NeighborTable};
