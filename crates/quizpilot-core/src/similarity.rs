//! Capabilities the host injects into scoring and selection.
//!
//! Both lookups are synchronous. A similarity source that is down, slow or
//! simply not configured answers `None`, which the scorer treats as "no
//! effect". A host that wraps a remote source in a timeout should map the
//! timeout to `None` as well.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Neighbor lookup
// ---------------------------------------------------------------------------

/// Nearest neighbors of one item: parallel lists of ids and similarities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighbors {
    pub ids: Vec<String>,
    pub similarities: Vec<f64>,
}

impl Neighbors {
    /// Build a neighbor list. Lists of unequal length are cut to the shorter.
    pub fn new(mut ids: Vec<String>, mut similarities: Vec<f64>) -> Self {
        let len = ids.len().min(similarities.len());
        ids.truncate(len);
        similarities.truncate(len);
        Self { ids, similarities }
    }

    /// Similarity of `id` to the source item, if it is among the neighbors.
    pub fn similarity_of(&self, id: &str) -> Option<f64> {
        self.ids
            .iter()
            .position(|n| n == id)
            .and_then(|idx| self.similarities.get(idx).copied())
    }

    /// Keep only the `k` leading neighbors.
    pub fn truncate(&mut self, k: usize) {
        self.ids.truncate(k);
        self.similarities.truncate(k);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.ids
            .iter()
            .map(String::as_str)
            .zip(self.similarities.iter().copied())
    }
}

impl FromIterator<(String, f64)> for Neighbors {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let (ids, similarities) = iter.into_iter().unzip();
        Self { ids, similarities }
    }
}

/// Source of nearest-neighbor lists for items.
pub trait NeighborLookup: Send + Sync {
    /// Neighbors of `id`, or `None` when the source cannot answer.
    fn neighbors(&self, id: &str) -> Option<Neighbors>;
}

/// The absent similarity source: every lookup answers `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNeighbors;

impl NeighborLookup for NoNeighbors {
    fn neighbors(&self, _id: &str) -> Option<Neighbors> {
        None
    }
}

impl<F> NeighborLookup for F
where
    F: Fn(&str) -> Option<Neighbors> + Send + Sync,
{
    fn neighbors(&self, id: &str) -> Option<Neighbors> {
        self(id)
    }
}

// ---------------------------------------------------------------------------
// Complex difficulty
// ---------------------------------------------------------------------------

/// Difficulty of an already-known complex item.
pub trait ComplexDifficulty: Send + Sync {
    fn difficulty_of(&self, id: &str) -> u8;
}

/// Answers the same difficulty for every item.
#[derive(Debug, Clone, Copy)]
pub struct FixedComplexDifficulty(pub u8);

impl Default for FixedComplexDifficulty {
    fn default() -> Self {
        Self(crate::model::DEFAULT_DIFFICULTY)
    }
}

impl ComplexDifficulty for FixedComplexDifficulty {
    fn difficulty_of(&self, _id: &str) -> u8 {
        self.0
    }
}

impl<F> ComplexDifficulty for F
where
    F: Fn(&str) -> u8 + Send + Sync,
{
    fn difficulty_of(&self, id: &str) -> u8 {
        self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unequal_lists_are_truncated() {
        let n = Neighbors::new(vec!["a".into(), "b".into(), "c".into()], vec![0.9, 0.8]);
        assert_eq!(n.len(), 2);
        assert_eq!(n.similarity_of("c"), None);
        assert_eq!(n.similarity_of("b"), Some(0.8));
    }

    #[test]
    fn similarity_of_uses_first_match() {
        let n: Neighbors = [("a".to_string(), 0.9), ("a".to_string(), 0.1)]
            .into_iter()
            .collect();
        assert_eq!(n.similarity_of("a"), Some(0.9));
        assert_eq!(n.similarity_of("z"), None);
    }

    #[test]
    fn closures_are_lookups() {
        let lookup = |id: &str| {
            (id == "q1").then(|| Neighbors::new(vec!["q2".into()], vec![0.75]))
        };
        assert_eq!(
            lookup.neighbors("q1").and_then(|n| n.similarity_of("q2")),
            Some(0.75)
        );
        assert!(lookup.neighbors("q9").is_none());
        assert!(NoNeighbors.neighbors("q1").is_none());
    }

    #[test]
    fn complex_difficulty_sources() {
        assert_eq!(FixedComplexDifficulty::default().difficulty_of("x"), 3);
        let by_id = |id: &str| -> u8 { if id == "hard" { 5 } else { 2 } };
        assert_eq!(by_id.difficulty_of("hard"), 5);
        assert_eq!(by_id.difficulty_of("easy"), 2);
    }
}
