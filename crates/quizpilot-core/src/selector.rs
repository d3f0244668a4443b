//! Upper-confidence-bound selection over scored items.
//!
//! Never-selected items get an infinite bonus, so a fresh pool always ties.
//! Ties among those items are broken randomly. Equal finite scores keep their
//! input order. The chosen top-k is shuffled so the first slot is not always
//! the same item.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::config::AdaptiveParams;
use crate::model::ItemMeta;
use crate::scorer::{ItemScorer, ScoringContext};
use crate::state::SessionState;

/// Upper bound of the tie-break jitter.
const TIE_JITTER: f64 = 0.1;

/// Ranks candidates by learned score plus an exploration bonus.
pub struct BanditSelector {
    scorer: ItemScorer,
    ucb_c: f64,
    rng: StdRng,
}

impl BanditSelector {
    /// Create a selector with an entropy-seeded tie-break source.
    pub fn new(params: AdaptiveParams) -> Self {
        Self::with_rng(params, StdRng::from_entropy())
    }

    /// Create a selector with a fixed seed (for testing).
    pub fn with_seed(params: AdaptiveParams, seed: u64) -> Self {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: AdaptiveParams, rng: StdRng) -> Self {
        Self {
            ucb_c: params.ucb_c,
            scorer: ItemScorer::new(params),
            rng,
        }
    }

    pub fn scorer(&self) -> &ItemScorer {
        &self.scorer
    }

    /// Exploration bonus of an item: infinite until it has been selected once.
    pub fn ucb_bonus(&self, item_id: &str, state: &SessionState) -> f64 {
        let count = state.selection_count(item_id);
        if count == 0 {
            return f64::INFINITY;
        }
        let total = state.total_selections();
        if total == 0 {
            return 0.0;
        }
        self.ucb_c * ((total as f64).ln() / f64::from(count)).sqrt()
    }

    /// Choose up to `k` candidates, best first.
    ///
    /// With `k` covering the whole pool every candidate comes back: shuffled
    /// when all scores tie, sorted by score otherwise. With a smaller `k` the
    /// best `k` are taken and returned in random order.
    pub fn choose<'c>(
        &mut self,
        candidates: &'c [ItemMeta],
        state: &SessionState,
        ctx: &ScoringContext<'_>,
        k: usize,
    ) -> Vec<&'c ItemMeta> {
        if candidates.is_empty() || k == 0 {
            return Vec::new();
        }

        let q_scores = self.scorer.score_all(candidates, state, ctx);
        let mut scored: Vec<(&'c ItemMeta, f64)> = candidates
            .iter()
            .zip(q_scores)
            .map(|(item, q)| (item, q + self.ucb_bonus(&item.id, state)))
            .collect();

        if k >= scored.len() {
            let all_tied = scored.windows(2).all(|w| w[0].1 == w[1].1);
            if all_tied {
                scored.shuffle(&mut self.rng);
            } else {
                scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            }
            tracing::debug!(
                candidates = scored.len(),
                all_tied,
                "ranked full candidate pool"
            );
            return scored.into_iter().map(|(item, _)| item).collect();
        }

        let mut keyed: Vec<(&'c ItemMeta, f64, f64)> = scored
            .into_iter()
            .map(|(item, ucb)| {
                let jitter = if ucb.is_infinite() {
                    self.rng.gen::<f64>() * TIE_JITTER
                } else {
                    0.0
                };
                (item, ucb, jitter)
            })
            .collect();
        keyed.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.2.total_cmp(&a.2)));
        keyed.truncate(k);
        keyed.shuffle(&mut self.rng);

        tracing::debug!(
            candidates = candidates.len(),
            chosen = keyed.len(),
            "selected top-k candidates"
        );
        keyed.into_iter().map(|(item, _, _)| item).collect()
    }
}

impl std::fmt::Debug for BanditSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BanditSelector")
            .field("scorer", &self.scorer)
            .field("ucb_c", &self.ucb_c)
            .finish_non_exhaustive()
    }
}
