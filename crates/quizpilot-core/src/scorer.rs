//! Per-item priority scoring and online value learning.
//!
//! A score blends a slowly learned per-item value with fast heuristics:
//! difficulty fit, review urgency, exploration, topic coverage, and two
//! similarity effects (suppress easy neighbors of a just-mastered hard item,
//! boost neighbors of recent mistakes).

use crate::config::AdaptiveParams;
use crate::history::{tally_outcomes, RoundSummary};
use crate::model::{now_ms, ItemMeta};
use crate::similarity::{ComplexDifficulty, NeighborLookup};
use crate::state::SessionState;

/// Reward fed to the value table for a correct answer.
pub const REWARD_CORRECT: f64 = 1.0;
/// Reward fed to the value table for a wrong answer.
pub const REWARD_WRONG: f64 = -0.5;

const DIFFICULTY_FIT_WEIGHT: f64 = 0.5;
const REVIEW_BASE_BONUS: f64 = 3.0;
const REVIEW_MAX_OVERDUE_BONUS: f64 = 2.0;
const UNSEEN_EXPLORATION_BONUS: f64 = 2.0;
const EXPLORATION_WEIGHT: f64 = 0.5;
const KNOWLEDGE_POINT_VALUE: f64 = 0.3;
const SIMILARITY_PENALTY_WEIGHT: f64 = 0.3;
const WRONG_BOOST_WEIGHT: f64 = 0.5;

/// Reward for a graded outcome.
pub fn reward_for(is_correct: bool) -> f64 {
    if is_correct {
        REWARD_CORRECT
    } else {
        REWARD_WRONG
    }
}

/// Everything besides the item and session that scoring depends on.
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
    /// Recently-correct complex items, newest first.
    pub recent_correct_complex_ids: &'a [String],
    pub neighbors: &'a dyn NeighborLookup,
    pub complex_difficulty: &'a dyn ComplexDifficulty,
    /// Reference time for review urgency, Unix milliseconds.
    pub now_ms: i64,
}

impl<'a> ScoringContext<'a> {
    /// Context evaluated at the current wall-clock time.
    pub fn new(
        recent_correct_complex_ids: &'a [String],
        neighbors: &'a dyn NeighborLookup,
        complex_difficulty: &'a dyn ComplexDifficulty,
    ) -> Self {
        Self {
            recent_correct_complex_ids,
            neighbors,
            complex_difficulty,
            now_ms: now_ms(),
        }
    }

    /// Pin the reference time.
    pub fn at(mut self, now_ms: i64) -> Self {
        self.now_ms = now_ms;
        self
    }
}

impl std::fmt::Debug for ScoringContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringContext")
            .field("recent_correct_complex_ids", &self.recent_correct_complex_ids)
            .field("now_ms", &self.now_ms)
            .finish_non_exhaustive()
    }
}

/// The individual components of an item's score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub base_value: f64,
    pub difficulty_fit: f64,
    pub review_bonus: f64,
    /// Unweighted; contributes at half weight.
    pub exploration_bonus: f64,
    pub knowledge_value: f64,
    /// Unweighted; subtracted at 0.3 weight.
    pub similarity_penalty: f64,
    /// Unweighted; contributes at half weight.
    pub wrong_boost: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base_value
            + self.difficulty_fit
            + self.review_bonus
            + self.exploration_bonus * EXPLORATION_WEIGHT
            + self.knowledge_value
            - self.similarity_penalty * SIMILARITY_PENALTY_WEIGHT
            + self.wrong_boost * WRONG_BOOST_WEIGHT
    }
}

/// Scores candidate items and maintains the learned value table.
#[derive(Debug, Clone, Default)]
pub struct ItemScorer {
    params: AdaptiveParams,
}

impl ItemScorer {
    pub fn new(params: AdaptiveParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AdaptiveParams {
        &self.params
    }

    /// Seed item values from past accuracy: `accuracy * 5 - 2`.
    ///
    /// Items that never appear with a graded outcome keep their value.
    pub fn initialize_from_history(&self, state: &mut SessionState, rounds: &[RoundSummary]) {
        let tallies = tally_outcomes(rounds);
        for (item_id, tally) in &tallies {
            state.set_item_value(item_id, tally.accuracy() * 5.0 - 2.0);
        }
        tracing::debug!(
            rounds = rounds.len(),
            items = tallies.len(),
            "value table seeded from history"
        );
    }

    /// One-step bootstrapped value update. Returns the new value.
    pub fn update_value(
        &self,
        state: &mut SessionState,
        item_id: &str,
        reward: f64,
        next_max_value: f64,
    ) -> f64 {
        let current = state.item_value(item_id);
        let target = reward + self.params.discount * next_max_value;
        let updated = current + self.params.learning_rate * (target - current);
        state.set_item_value(item_id, updated);
        tracing::debug!(item_id, reward, current, updated, "item value updated");
        updated
    }

    /// Priority of `item` given the session snapshot.
    pub fn score(&self, item: &ItemMeta, state: &SessionState, ctx: &ScoringContext<'_>) -> f64 {
        self.breakdown(item, state, ctx).total()
    }

    /// Score every item against the same snapshot, in input order.
    #[cfg(not(feature = "parallel"))]
    pub fn score_all(
        &self,
        items: &[ItemMeta],
        state: &SessionState,
        ctx: &ScoringContext<'_>,
    ) -> Vec<f64> {
        items.iter().map(|it| self.score(it, state, ctx)).collect()
    }

    /// Score every item against the same snapshot, in input order.
    #[cfg(feature = "parallel")]
    pub fn score_all(
        &self,
        items: &[ItemMeta],
        state: &SessionState,
        ctx: &ScoringContext<'_>,
    ) -> Vec<f64> {
        use rayon::prelude::*;
        items.par_iter().map(|it| self.score(it, state, ctx)).collect()
    }

    /// Every component of the score, unweighted.
    pub fn breakdown(
        &self,
        item: &ItemMeta,
        state: &SessionState,
        ctx: &ScoringContext<'_>,
    ) -> ScoreBreakdown {
        let breakdown = ScoreBreakdown {
            base_value: state.item_value(&item.id),
            difficulty_fit: -DIFFICULTY_FIT_WEIGHT
                * (item.difficulty_f64() - state.ability_mean()).abs(),
            review_bonus: self.review_bonus(item, state, ctx.now_ms),
            exploration_bonus: self.exploration_bonus(item, state),
            knowledge_value: self.knowledge_value(item, state),
            similarity_penalty: self.similarity_penalty(item, ctx),
            wrong_boost: self.wrong_boost(item, state, ctx),
        };
        tracing::trace!(item_id = %item.id, ?breakdown, "item scored");
        breakdown
    }

    fn review_bonus(&self, item: &ItemMeta, state: &SessionState, now_ms: i64) -> f64 {
        match state.review_entry(&item.id) {
            Some(entry) if entry.is_due(now_ms) => {
                REVIEW_BASE_BONUS + entry.overdue_days(now_ms).min(REVIEW_MAX_OVERDUE_BONUS)
            }
            _ => 0.0,
        }
    }

    fn exploration_bonus(&self, item: &ItemMeta, state: &SessionState) -> f64 {
        let count = state.selection_count(&item.id);
        let total = state.total_selections();
        if count == 0 {
            UNSEEN_EXPLORATION_BONUS
        } else if total > 0 {
            (2.0 * (total as f64).ln() / f64::from(count)).sqrt()
        } else {
            0.0
        }
    }

    fn knowledge_value(&self, item: &ItemMeta, state: &SessionState) -> f64 {
        let uncovered = item
            .knowledge_points
            .iter()
            .filter(|kp| state.mastery(kp) < item.difficulty)
            .count();
        KNOWLEDGE_POINT_VALUE * uncovered as f64
    }

    fn similarity_penalty(&self, item: &ItemMeta, ctx: &ScoringContext<'_>) -> f64 {
        let mut penalty = 0.0;
        for complex_id in ctx.recent_correct_complex_ids {
            let Some(sim) = ctx
                .neighbors
                .neighbors(complex_id)
                .and_then(|n| n.similarity_of(&item.id))
            else {
                continue;
            };
            if sim < self.params.sim_threshold {
                continue;
            }
            let complex_difficulty = self
                .params
                .complex_difficulty_min
                .max(ctx.complex_difficulty.difficulty_of(complex_id));
            if complex_difficulty > item.difficulty {
                let delta = f64::from(complex_difficulty - item.difficulty);
                penalty += self.params.suppress_lambda * sim * delta;
            }
        }
        penalty
    }

    fn wrong_boost(&self, item: &ItemMeta, state: &SessionState, ctx: &ScoringContext<'_>) -> f64 {
        let mut boost = 0.0;
        for wrong_id in state.recent_wrong_ids(self.params.recent_window) {
            let Some(sim) = ctx
                .neighbors
                .neighbors(wrong_id)
                .and_then(|n| n.similarity_of(&item.id))
            else {
                continue;
            };
            if sim > 0.0 {
                boost += self.params.boost_lambda * sim;
            }
        }
        boost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerRecord, ReviewEntry, MS_PER_DAY};
    use crate::similarity::{FixedComplexDifficulty, Neighbors, NoNeighbors};

    const NOW: i64 = 1_700_000_000_000;

    fn ctx<'a>(
        recent: &'a [String],
        neighbors: &'a dyn NeighborLookup,
        complex: &'a dyn ComplexDifficulty,
    ) -> ScoringContext<'a> {
        ScoringContext::new(recent, neighbors, complex).at(NOW)
    }

    #[test]
    fn fresh_item_score() {
        let scorer = ItemScorer::default();
        let state = SessionState::default();
        let item = ItemMeta::new("q1", 4);
        let c = ctx(&[], &NoNeighbors, &FixedComplexDifficulty(3));

        let b = scorer.breakdown(&item, &state, &c);
        assert_eq!(b.base_value, 0.0);
        assert_eq!(b.difficulty_fit, -0.5);
        assert_eq!(b.review_bonus, 0.0);
        assert_eq!(b.exploration_bonus, 2.0);
        assert_eq!(b.knowledge_value, 0.0);
        assert_eq!(b.similarity_penalty, 0.0);
        assert_eq!(b.wrong_boost, 0.0);
        assert!((scorer.score(&item, &state, &c) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn overdue_review_bonus_is_capped() {
        let scorer = ItemScorer::default();
        let mut state = SessionState::default();
        let c = ctx(&[], &NoNeighbors, &FixedComplexDifficulty(3));
        let entry = |due| ReviewEntry {
            easiness_factor: 2.5,
            interval_days: 1.0,
            repetitions: 1,
            next_due_ms: due,
        };

        state.set_review_entry("due", entry(NOW - MS_PER_DAY / 2));
        state.set_review_entry("stale", entry(NOW - 30 * MS_PER_DAY));
        state.set_review_entry("future", entry(NOW + 1));

        let bonus = |id: &str| scorer.breakdown(&ItemMeta::new(id, 3), &state, &c).review_bonus;
        assert!((bonus("due") - 3.5).abs() < 1e-12);
        assert_eq!(bonus("stale"), 5.0);
        assert_eq!(bonus("future"), 0.0);
    }

    #[test]
    fn exploration_bonus_after_selection() {
        let scorer = ItemScorer::default();
        let mut state = SessionState::default();
        for _ in 0..3 {
            state.record_selection("other");
        }
        state.record_selection("q1");
        let c = ctx(&[], &NoNeighbors, &FixedComplexDifficulty(3));
        let b = scorer.breakdown(&ItemMeta::new("q1", 3), &state, &c);
        let expected = (2.0 * 4f64.ln() / 1.0).sqrt();
        assert!((b.exploration_bonus - expected).abs() < 1e-12);
    }

    #[test]
    fn knowledge_value_counts_unmastered_points() {
        let scorer = ItemScorer::default();
        let mut state = SessionState::default();
        state.raise_mastery("mastered", 4);
        state.raise_mastery("weak", 1);
        let item = ItemMeta::new("q1", 3).with_knowledge_points(["mastered", "weak", "new"]);
        let c = ctx(&[], &NoNeighbors, &FixedComplexDifficulty(3));
        let b = scorer.breakdown(&item, &state, &c);
        assert!((b.knowledge_value - 0.6).abs() < 1e-12);
    }

    #[test]
    fn easy_neighbor_of_mastered_complex_item_is_suppressed() {
        let scorer = ItemScorer::default();
        let state = SessionState::default();
        let recent = vec!["hard".to_string(), "unknown".to_string()];
        let lookup = |id: &str| {
            (id == "hard").then(|| {
                Neighbors::new(
                    vec!["easy".into(), "far".into(), "peer".into()],
                    vec![0.9, 0.5, 0.95],
                )
            })
        };
        let complex = |id: &str| -> u8 { if id == "hard" { 5 } else { 3 } };
        let c = ctx(&recent, &lookup, &complex);

        // 6.0 * 0.9 * (5 - 2)
        let easy = scorer.breakdown(&ItemMeta::new("easy", 2), &state, &c);
        assert!((easy.similarity_penalty - 16.2).abs() < 1e-9);

        // Below the similarity threshold.
        let far = scorer.breakdown(&ItemMeta::new("far", 1), &state, &c);
        assert_eq!(far.similarity_penalty, 0.0);

        // Not easier than the complex item.
        let peer = scorer.breakdown(&ItemMeta::new("peer", 5), &state, &c);
        assert_eq!(peer.similarity_penalty, 0.0);
    }

    #[test]
    fn complex_difficulty_has_a_floor() {
        let scorer = ItemScorer::default();
        let state = SessionState::default();
        let recent = vec!["c1".to_string()];
        let lookup = |_: &str| Some(Neighbors::new(vec!["q".into()], vec![0.8]));
        let c = ctx(&recent, &lookup, &FixedComplexDifficulty(1));
        // Floor of 3 applies: 6.0 * 0.8 * (3 - 1)
        let b = scorer.breakdown(&ItemMeta::new("q", 1), &state, &c);
        assert!((b.similarity_penalty - 9.6).abs() < 1e-9);
    }

    #[test]
    fn neighbors_of_recent_mistakes_are_boosted() {
        let scorer = ItemScorer::default();
        let mut state = SessionState::default();
        state.record_answer("w1", AnswerRecord::new(Some(false), NOW - 10));
        state.record_answer("w2", AnswerRecord::new(Some(false), NOW - 5));
        state.record_answer("ok", AnswerRecord::new(Some(true), NOW - 1));
        let lookup = |id: &str| match id {
            "w1" => Some(Neighbors::new(vec!["q".into()], vec![0.4])),
            "w2" => Some(Neighbors::new(vec!["q".into(), "z".into()], vec![0.6, -0.2])),
            "ok" => Some(Neighbors::new(vec!["q".into()], vec![0.99])),
            _ => None,
        };
        let c = ctx(&[], &lookup, &FixedComplexDifficulty(3));

        let b = scorer.breakdown(&ItemMeta::new("q", 3), &state, &c);
        assert!((b.wrong_boost - 3.0).abs() < 1e-9);

        let z = scorer.breakdown(&ItemMeta::new("z", 3), &state, &c);
        assert_eq!(z.wrong_boost, 0.0);
    }

    #[test]
    fn total_applies_component_weights() {
        let b = ScoreBreakdown {
            base_value: 1.0,
            difficulty_fit: -0.5,
            review_bonus: 3.0,
            exploration_bonus: 2.0,
            knowledge_value: 0.3,
            similarity_penalty: 10.0,
            wrong_boost: 4.0,
        };
        assert!((b.total() - (1.0 - 0.5 + 3.0 + 1.0 + 0.3 - 3.0 + 2.0)).abs() < 1e-12);
    }

    #[test]
    fn score_is_idempotent() {
        let scorer = ItemScorer::default();
        let mut state = SessionState::default();
        state.record_answer("w", AnswerRecord::new(Some(false), NOW - 1));
        state.record_selection("q");
        let lookup = |_: &str| Some(Neighbors::new(vec!["q".into()], vec![0.8]));
        let recent = vec!["w".to_string()];
        let c = ctx(&recent, &lookup, &FixedComplexDifficulty(4));
        let item = ItemMeta::new("q", 2).with_knowledge_points(["kp"]);
        assert_eq!(
            scorer.score(&item, &state, &c),
            scorer.score(&item, &state, &c)
        );
    }

    #[test]
    fn update_value_moves_toward_reward() {
        let scorer = ItemScorer::default();
        let mut state = SessionState::default();
        let first = scorer.update_value(&mut state, "q", 1.0, 0.0);
        assert!((first - 0.1).abs() < 1e-12);
        for _ in 0..500 {
            scorer.update_value(&mut state, "q", 1.0, 0.0);
        }
        assert!((state.item_value("q") - 1.0).abs() < 1e-9);

        let wrong = scorer.update_value(&mut state, "fresh", reward_for(false), 0.0);
        assert!((wrong + 0.05).abs() < 1e-12);
    }

    #[test]
    fn update_value_bootstraps_next_value() {
        let scorer = ItemScorer::default();
        let mut state = SessionState::default();
        let v = scorer.update_value(&mut state, "q", 0.0, 1.0);
        assert!((v - 0.09).abs() < 1e-12);
    }

    #[test]
    fn history_seeds_values() {
        let scorer = ItemScorer::default();
        let mut state = SessionState::default();
        scorer.update_value(&mut state, "untouched", 1.0, 0.0);
        let rounds = vec![
            RoundSummary::new([("a".to_string(), Some(true)), ("b".to_string(), Some(false))]),
            RoundSummary::new([("a".to_string(), Some(false)), ("c".to_string(), None)]),
        ];
        scorer.initialize_from_history(&mut state, &rounds);
        assert!((state.item_value("a") - 0.5).abs() < 1e-12);
        assert!((state.item_value("b") + 2.0).abs() < 1e-12);
        assert_eq!(state.item_value("c"), 0.0);
        assert!((state.item_value("untouched") - 0.1).abs() < 1e-12);
    }

    #[test]
    fn score_all_preserves_order() {
        let scorer = ItemScorer::default();
        let state = SessionState::default();
        let c = ctx(&[], &NoNeighbors, &FixedComplexDifficulty(3));
        let items = vec![ItemMeta::new("a", 1), ItemMeta::new("b", 3), ItemMeta::new("c", 5)];
        let scores = scorer.score_all(&items, &state, &c);
        let expected: Vec<f64> = items.iter().map(|it| scorer.score(it, &state, &c)).collect();
        assert_eq!(scores, expected);
    }
}
