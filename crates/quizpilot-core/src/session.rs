//! One learner's adaptive session: rank candidates, fold answers back in.

use std::path::Path;

use serde::Serialize;

use crate::config::{AdaptiveParams, QuizpilotConfig};
use crate::error::PersistenceError;
use crate::history::load_recent_rounds;
use crate::model::{AnswerRecord, ItemMeta, Outcome, ReviewEntry};
use crate::persistence::{load_state, save_state};
use crate::scheduler::ReviewScheduler;
use crate::scorer::{reward_for, ItemScorer, ScoringContext};
use crate::selector::BanditSelector;
use crate::similarity::{ComplexDifficulty, NeighborLookup};
use crate::state::SessionState;

/// What a submitted answer changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub outcome: Outcome,
    /// Ability mean and variance after the update.
    pub ability: (f64, f64),
    /// New learned value of the item, for graded answers.
    pub value: Option<f64>,
    /// New review entry of the item, for graded answers.
    pub review: Option<ReviewEntry>,
}

/// Drives the decision components over a single [`SessionState`].
#[derive(Debug)]
pub struct AdaptiveSession {
    params: AdaptiveParams,
    state: SessionState,
    scheduler: ReviewScheduler,
    selector: BanditSelector,
}

impl AdaptiveSession {
    /// Start a fresh session.
    pub fn new(params: AdaptiveParams) -> Self {
        let state = SessionState::from_params(&params);
        Self::with_state(params, state)
    }

    /// Resume an existing session.
    pub fn with_state(params: AdaptiveParams, state: SessionState) -> Self {
        Self {
            selector: BanditSelector::new(params.clone()),
            scheduler: ReviewScheduler::new(),
            params,
            state,
        }
    }

    /// Resume with a seeded selector (for testing).
    pub fn with_seed(params: AdaptiveParams, state: SessionState, seed: u64) -> Self {
        Self {
            selector: BanditSelector::with_seed(params.clone(), seed),
            scheduler: ReviewScheduler::new(),
            params,
            state,
        }
    }

    /// Resume the session saved at the configured state path.
    ///
    /// When the saved session has no learned values yet, the value table is
    /// warm-started from the configured round history.
    pub fn from_config(config: &QuizpilotConfig) -> Self {
        let state = load_state(&config.files.state_path);
        let mut session = Self::with_state(config.params.clone(), state);
        if session.state.item_values().is_empty() {
            let rounds = load_recent_rounds(&config.files.history_path, config.params.history_rounds);
            session.warm_start(&rounds);
        }
        session
    }

    /// Seed the value table from past rounds.
    pub fn warm_start(&mut self, rounds: &[crate::history::RoundSummary]) {
        self.selector
            .scorer()
            .initialize_from_history(&mut self.state, rounds);
    }

    pub fn params(&self) -> &AdaptiveParams {
        &self.params
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    pub fn scorer(&self) -> &ItemScorer {
        self.selector.scorer()
    }

    /// Rank `candidates` and return up to `k`, best first.
    pub fn rank<'c>(
        &mut self,
        candidates: &'c [ItemMeta],
        neighbors: &dyn NeighborLookup,
        complex_difficulty: &dyn ComplexDifficulty,
        k: usize,
        now_ms: i64,
    ) -> Vec<&'c ItemMeta> {
        let ctx = ScoringContext {
            recent_correct_complex_ids: self.state.recent_correct_complex_ids(),
            neighbors,
            complex_difficulty,
            now_ms,
        };
        self.selector.choose(candidates, &self.state, &ctx, k)
    }

    /// Fold one answer into the session.
    ///
    /// Ungraded answers are recorded and counted as a presentation but
    /// leave ability, values, mastery and the review schedule untouched.
    pub fn submit(&mut self, item: &ItemMeta, is_correct: Option<bool>, now_ms: i64) -> SubmitOutcome {
        let record = AnswerRecord::new(is_correct, now_ms);
        let Some(correct) = is_correct else {
            self.state.record_answer(&item.id, record);
            self.state.record_selection(&item.id);
            tracing::debug!(item_id = %item.id, "ungraded answer recorded");
            return SubmitOutcome {
                outcome: Outcome::Ungraded,
                ability: (self.state.ability().mean, self.state.ability().variance),
                value: None,
                review: None,
            };
        };

        let ability = self.state.update_ability(correct, item.difficulty_f64());
        self.state.record_answer(&item.id, record);

        if correct {
            if item.difficulty >= self.params.complex_difficulty_min {
                self.state
                    .push_recent_correct_complex(&item.id, self.params.recent_window);
            }
            for kp in &item.knowledge_points {
                self.state.raise_mastery(kp, item.difficulty);
            }
        }

        let value = self
            .selector
            .scorer()
            .update_value(&mut self.state, &item.id, reward_for(correct), 0.0);
        self.state.record_selection(&item.id);

        let review = self
            .scheduler
            .on_result(self.state.review_entry(&item.id), correct, now_ms);
        self.state.set_review_entry(&item.id, review);

        tracing::info!(
            item_id = %item.id,
            correct,
            ability = ability.0,
            value,
            interval_days = review.interval_days,
            "answer submitted"
        );

        SubmitOutcome {
            outcome: Outcome::from(is_correct),
            ability,
            value: Some(value),
            review: Some(review),
        }
    }

    /// Persist the session state.
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        save_state(path, &self.state)
    }
}
