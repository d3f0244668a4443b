//! Adapter for similarity sources that can fail.

use anyhow::Result;
use quizpilot_core::similarity::{NeighborLookup, Neighbors};

/// Wraps a fallible source so that any error reads as "absent".
///
/// Errors are logged at warn level and never reach the scorer.
pub struct FallibleLookup<F> {
    source: F,
}

impl<F> FallibleLookup<F>
where
    F: Fn(&str) -> Result<Option<Neighbors>> + Send + Sync,
{
    pub fn new(source: F) -> Self {
        Self { source }
    }
}

impl<F> NeighborLookup for FallibleLookup<F>
where
    F: Fn(&str) -> Result<Option<Neighbors>> + Send + Sync,
{
    fn neighbors(&self, id: &str) -> Option<Neighbors> {
        match (self.source)(id) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(item_id = id, "neighbor lookup failed: {e:#}");
                None
            }
        }
    }
}

impl<F> std::fmt::Debug for FallibleLookup<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallibleLookup").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_read_as_absent() {
        let lookup = FallibleLookup::new(|id: &str| -> Result<Option<Neighbors>> {
            match id {
                "down" => anyhow::bail!("similarity service timed out"),
                "none" => Ok(None),
                _ => Ok(Some(Neighbors::new(vec!["x".into()], vec![0.6]))),
            }
        });
        assert!(lookup.neighbors("down").is_none());
        assert!(lookup.neighbors("none").is_none());
        assert_eq!(
            lookup.neighbors("q").and_then(|n| n.similarity_of("x")),
            Some(0.6)
        );
    }
}
