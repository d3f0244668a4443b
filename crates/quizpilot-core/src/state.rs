//! Per-learner session state.
//!
//! `SessionState` aggregates everything the decision components read and
//! write. Callers get read accessors; every mutation goes through a named
//! operation so the counters and tables stay consistent.

use std::collections::{BTreeSet, HashMap};

use crate::ability::AbilityEstimator;
use crate::config::AdaptiveParams;
use crate::model::{AnswerRecord, ReviewEntry};

/// All mutable state of one learner session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub(crate) ability: AbilityEstimator,
    pub(crate) answers_by_item: HashMap<String, AnswerRecord>,
    pub(crate) answered_items: BTreeSet<String>,
    pub(crate) review_schedule: HashMap<String, ReviewEntry>,
    pub(crate) kp_mastery: HashMap<String, u8>,
    pub(crate) item_values: HashMap<String, f64>,
    pub(crate) selection_counts: HashMap<String, u32>,
    pub(crate) total_selections: u64,
    pub(crate) recent_correct_complex_ids: Vec<String>,
}

impl SessionState {
    /// Fresh state with the given starting ability.
    pub fn new(ability: AbilityEstimator) -> Self {
        Self {
            ability,
            ..Self::default()
        }
    }

    /// Fresh state seeded from the configured initial ability.
    pub fn from_params(params: &AdaptiveParams) -> Self {
        Self::new(AbilityEstimator::new(
            params.ability_init,
            params.variance_init,
        ))
    }

    // -- ability --------------------------------------------------------------

    pub fn ability(&self) -> &AbilityEstimator {
        &self.ability
    }

    pub fn ability_mean(&self) -> f64 {
        self.ability.mean
    }

    /// Fold a graded answer into the ability estimate.
    pub fn update_ability(&mut self, is_correct: bool, difficulty: f64) -> (f64, f64) {
        self.ability.update(is_correct, difficulty)
    }

    // -- answers --------------------------------------------------------------

    pub fn answer(&self, item_id: &str) -> Option<&AnswerRecord> {
        self.answers_by_item.get(item_id)
    }

    pub fn answers(&self) -> impl Iterator<Item = (&str, &AnswerRecord)> {
        self.answers_by_item.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn answered_items(&self) -> &BTreeSet<String> {
        &self.answered_items
    }

    pub fn is_answered(&self, item_id: &str) -> bool {
        self.answered_items.contains(item_id) || self.answers_by_item.contains_key(item_id)
    }

    /// Store the latest answer for an item and mark it answered.
    pub fn record_answer(&mut self, item_id: &str, record: AnswerRecord) {
        self.answers_by_item.insert(item_id.to_string(), record);
        self.answered_items.insert(item_id.to_string());
    }

    /// Ids of the most recently wrong items, newest first, at most `limit`.
    pub fn recent_wrong_ids(&self, limit: usize) -> Vec<&str> {
        let mut wrong: Vec<(&str, i64)> = self
            .answers_by_item
            .iter()
            .filter(|(_, rec)| rec.is_correct == Some(false))
            .map(|(id, rec)| (id.as_str(), rec.timestamp_ms))
            .collect();
        wrong.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        wrong.into_iter().take(limit).map(|(id, _)| id).collect()
    }

    // -- review schedule ------------------------------------------------------

    pub fn review_entry(&self, item_id: &str) -> Option<&ReviewEntry> {
        self.review_schedule.get(item_id)
    }

    pub fn review_schedule(&self) -> &HashMap<String, ReviewEntry> {
        &self.review_schedule
    }

    /// Replace the review entry of an item.
    pub fn set_review_entry(&mut self, item_id: &str, entry: ReviewEntry) {
        self.review_schedule.insert(item_id.to_string(), entry);
    }

    /// Ids of reviewed items due at `now_ms`, most overdue first.
    pub fn due_items(&self, now_ms: i64) -> Vec<&str> {
        let mut due: Vec<(&str, i64)> = self
            .review_schedule
            .iter()
            .filter(|(_, entry)| entry.is_due(now_ms))
            .map(|(id, entry)| (id.as_str(), entry.next_due_ms))
            .collect();
        due.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        due.into_iter().map(|(id, _)| id).collect()
    }

    // -- knowledge points -----------------------------------------------------

    /// Mastery level of a knowledge point, 0 if never mastered.
    pub fn mastery(&self, knowledge_point: &str) -> u8 {
        self.kp_mastery.get(knowledge_point).copied().unwrap_or(0)
    }

    pub fn kp_mastery(&self) -> &HashMap<String, u8> {
        &self.kp_mastery
    }

    /// Raise a knowledge point to at least `level`. Mastery never decreases.
    pub fn raise_mastery(&mut self, knowledge_point: &str, level: u8) {
        let current = self.kp_mastery.entry(knowledge_point.to_string()).or_insert(0);
        *current = (*current).max(level);
    }

    // -- value table ----------------------------------------------------------

    /// Learned value of an item, 0.0 if never updated.
    pub fn item_value(&self, item_id: &str) -> f64 {
        self.item_values.get(item_id).copied().unwrap_or(0.0)
    }

    pub fn item_values(&self) -> &HashMap<String, f64> {
        &self.item_values
    }

    pub(crate) fn set_item_value(&mut self, item_id: &str, value: f64) {
        self.item_values.insert(item_id.to_string(), value);
    }

    // -- selection counters ---------------------------------------------------

    pub fn selection_count(&self, item_id: &str) -> u32 {
        self.selection_counts.get(item_id).copied().unwrap_or(0)
    }

    pub fn selection_counts(&self) -> &HashMap<String, u32> {
        &self.selection_counts
    }

    pub fn total_selections(&self) -> u64 {
        self.total_selections
    }

    /// Count one presentation of an item.
    pub fn record_selection(&mut self, item_id: &str) {
        *self.selection_counts.entry(item_id.to_string()).or_insert(0) += 1;
        self.total_selections += 1;
    }

    // -- recent complex items -------------------------------------------------

    /// Recently-correct complex items, newest first.
    pub fn recent_correct_complex_ids(&self) -> &[String] {
        &self.recent_correct_complex_ids
    }

    /// Move `item_id` to the front of the recent-complex list, keeping at most `window`.
    pub fn push_recent_correct_complex(&mut self, item_id: &str, window: usize) {
        self.recent_correct_complex_ids.retain(|id| id != item_id);
        self.recent_correct_complex_ids.insert(0, item_id.to_string());
        self.recent_correct_complex_ids.truncate(window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_empty() {
        let state = SessionState::default();
        assert_eq!(state.ability_mean(), 3.0);
        assert_eq!(state.total_selections(), 0);
        assert_eq!(state.item_value("x"), 0.0);
        assert_eq!(state.selection_count("x"), 0);
        assert_eq!(state.mastery("kp"), 0);
        assert!(state.review_entry("x").is_none());
        assert!(!state.is_answered("x"));
    }

    #[test]
    fn from_params_uses_initial_ability() {
        let params = AdaptiveParams {
            ability_init: 1.5,
            variance_init: 0.5,
            ..AdaptiveParams::default()
        };
        let state = SessionState::from_params(&params);
        assert_eq!(state.ability().mean, 1.5);
        assert_eq!(state.ability().variance, 0.5);
    }

    #[test]
    fn recent_wrong_ids_newest_first() {
        let mut state = SessionState::default();
        state.record_answer("a", AnswerRecord::new(Some(false), 100));
        state.record_answer("b", AnswerRecord::new(Some(true), 200));
        state.record_answer("c", AnswerRecord::new(Some(false), 300));
        state.record_answer("d", AnswerRecord::new(None, 400));
        state.record_answer("e", AnswerRecord::new(Some(false), 50));

        assert_eq!(state.recent_wrong_ids(10), vec!["c", "a", "e"]);
        assert_eq!(state.recent_wrong_ids(2), vec!["c", "a"]);
        assert!(state.is_answered("d"));
    }

    #[test]
    fn selection_counters() {
        let mut state = SessionState::default();
        state.record_selection("a");
        state.record_selection("a");
        state.record_selection("b");
        assert_eq!(state.selection_count("a"), 2);
        assert_eq!(state.selection_count("b"), 1);
        assert_eq!(state.total_selections(), 3);
    }

    #[test]
    fn mastery_never_decreases() {
        let mut state = SessionState::default();
        state.raise_mastery("kp", 4);
        state.raise_mastery("kp", 2);
        assert_eq!(state.mastery("kp"), 4);
    }

    #[test]
    fn recent_complex_window_dedupes_and_caps() {
        let mut state = SessionState::default();
        for id in ["a", "b", "c", "a"] {
            state.push_recent_correct_complex(id, 3);
        }
        assert_eq!(state.recent_correct_complex_ids(), ["a", "c", "b"]);
        state.push_recent_correct_complex("d", 3);
        assert_eq!(state.recent_correct_complex_ids(), ["d", "a", "c"]);
    }

    #[test]
    fn due_items_most_overdue_first() {
        let mut state = SessionState::default();
        let entry = |due| ReviewEntry {
            easiness_factor: 2.5,
            interval_days: 1.0,
            repetitions: 1,
            next_due_ms: due,
        };
        state.set_review_entry("later", entry(500));
        state.set_review_entry("early", entry(100));
        state.set_review_entry("future", entry(10_000));
        assert_eq!(state.due_items(1_000), vec!["early", "later"]);
    }
}
