//! JSON snapshots of a [`SessionState`].
//!
//! The on-disk layout is a flat camelCase record:
//!
//! ```json
//! {
//!   "ability": 3.2,
//!   "answersByItem": {"q1": {"isCorrect": true, "timestampMs": 1700000000000}},
//!   "answeredItems": ["q1"],
//!   "reviewSchedule": {"q1": {"easinessFactor": 2.6, "intervalDays": 1.0,
//!                             "repetitions": 1, "nextDueTimestampMs": 1700086400000}},
//!   "knowledgePointMastery": {"licensing": 3}
//! }
//! ```
//!
//! plus optional fields for the ability variance, value table, selection
//! counters and recent complex items. Older snake_case files, including the
//! four-bucket review entries, still load.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ability::AbilityEstimator;
use crate::error::PersistenceError;
use crate::model::{AnswerRecord, ReviewEntry};
use crate::scheduler::{MAX_INTERVAL_DAYS, MIN_EASINESS};
use crate::state::SessionState;

fn default_ability() -> f64 {
    AbilityEstimator::default().mean
}

/// One answer as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSnapshot {
    #[serde(default, alias = "is_correct")]
    pub is_correct: Option<bool>,
    #[serde(default, alias = "timestamp_ms", alias = "ts_ms")]
    pub timestamp_ms: i64,
}

/// One review entry as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSnapshot {
    #[serde(alias = "easiness_factor", alias = "ef")]
    pub easiness_factor: f64,
    #[serde(alias = "interval_days", alias = "interval")]
    pub interval_days: f64,
    #[serde(default)]
    pub repetitions: u32,
    #[serde(alias = "next_due_timestamp_ms", alias = "next_ts_ms")]
    pub next_due_timestamp_ms: i64,
}

/// Review entry as found on disk, possibly written by the old four-bucket
/// scheduler. Missing fields fall back to the values implied by `bucket`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredReview {
    #[serde(default, alias = "easiness_factor", alias = "ef")]
    easiness_factor: Option<f64>,
    #[serde(default, alias = "interval_days", alias = "interval")]
    interval_days: Option<f64>,
    #[serde(default)]
    repetitions: Option<u32>,
    #[serde(
        default,
        alias = "next_due_timestamp_ms",
        alias = "next_ts_ms",
        alias = "nextTsMs"
    )]
    next_due_timestamp_ms: Option<i64>,
    #[serde(default)]
    bucket: Option<u8>,
}

impl From<StoredReview> for ReviewSnapshot {
    fn from(stored: StoredReview) -> Self {
        let next_due = stored.next_due_timestamp_ms.unwrap_or(0);
        let fallback = ReviewEntry::from_bucket(stored.bucket.unwrap_or(0), next_due);
        Self {
            easiness_factor: stored.easiness_factor.unwrap_or(fallback.easiness_factor),
            interval_days: stored.interval_days.unwrap_or(fallback.interval_days),
            repetitions: stored.repetitions.unwrap_or(fallback.repetitions),
            next_due_timestamp_ms: next_due,
        }
    }
}

impl From<ReviewEntry> for ReviewSnapshot {
    fn from(entry: ReviewEntry) -> Self {
        Self {
            easiness_factor: entry.easiness_factor,
            interval_days: entry.interval_days,
            repetitions: entry.repetitions,
            next_due_timestamp_ms: entry.next_due_ms,
        }
    }
}

impl From<ReviewSnapshot> for ReviewEntry {
    fn from(snapshot: ReviewSnapshot) -> Self {
        Self {
            easiness_factor: snapshot.easiness_factor.max(MIN_EASINESS),
            interval_days: snapshot.interval_days.clamp(0.0, MAX_INTERVAL_DAYS),
            repetitions: snapshot.repetitions,
            next_due_ms: snapshot.next_due_timestamp_ms,
        }
    }
}

fn deserialize_reviews<'de, D>(deserializer: D) -> Result<BTreeMap<String, ReviewSnapshot>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let stored = BTreeMap::<String, StoredReview>::deserialize(deserializer)?;
    Ok(stored
        .into_iter()
        .map(|(id, review)| (id, ReviewSnapshot::from(review)))
        .collect())
}

/// Serializable form of a [`SessionState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default = "default_ability")]
    pub ability: f64,
    #[serde(default, alias = "ability_variance", skip_serializing_if = "Option::is_none")]
    pub ability_variance: Option<f64>,
    #[serde(default, alias = "answers_by_item")]
    pub answers_by_item: BTreeMap<String, AnswerSnapshot>,
    #[serde(default, alias = "answered_items")]
    pub answered_items: Vec<String>,
    #[serde(
        default,
        alias = "review_schedule",
        deserialize_with = "deserialize_reviews"
    )]
    pub review_schedule: BTreeMap<String, ReviewSnapshot>,
    #[serde(default, alias = "knowledge_point_mastery", alias = "kp_mastery")]
    pub knowledge_point_mastery: BTreeMap<String, u8>,
    #[serde(default, alias = "item_values")]
    pub item_values: BTreeMap<String, f64>,
    #[serde(default, alias = "selection_counts")]
    pub selection_counts: BTreeMap<String, u32>,
    #[serde(default, alias = "total_selections")]
    pub total_selections: u64,
    #[serde(default, alias = "recent_correct_complex_ids")]
    pub recent_correct_complex_ids: Vec<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::from_state(&SessionState::default())
    }
}

impl SessionSnapshot {
    /// Flatten a session into its on-disk form.
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            ability: state.ability.mean,
            ability_variance: Some(state.ability.variance),
            answers_by_item: state
                .answers_by_item
                .iter()
                .map(|(id, rec)| {
                    (
                        id.clone(),
                        AnswerSnapshot {
                            is_correct: rec.is_correct,
                            timestamp_ms: rec.timestamp_ms,
                        },
                    )
                })
                .collect(),
            answered_items: state.answered_items.iter().cloned().collect(),
            review_schedule: state
                .review_schedule
                .iter()
                .map(|(id, entry)| (id.clone(), ReviewSnapshot::from(*entry)))
                .collect(),
            knowledge_point_mastery: state.kp_mastery.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            item_values: state.item_values.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            selection_counts: state
                .selection_counts
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            total_selections: state.total_selections,
            recent_correct_complex_ids: state.recent_correct_complex_ids.clone(),
        }
    }

    /// Rebuild a session. Out-of-range ability and review values are clamped.
    pub fn into_state(self) -> SessionState {
        let variance = self
            .ability_variance
            .unwrap_or_else(|| AbilityEstimator::default().variance);
        let counted: u64 = self.selection_counts.values().map(|&c| u64::from(c)).sum();
        SessionState {
            ability: AbilityEstimator::new(self.ability, variance),
            answers_by_item: self
                .answers_by_item
                .into_iter()
                .map(|(id, a)| (id, AnswerRecord::new(a.is_correct, a.timestamp_ms)))
                .collect(),
            answered_items: self.answered_items.into_iter().collect(),
            review_schedule: self
                .review_schedule
                .into_iter()
                .map(|(id, r)| (id, ReviewEntry::from(r)))
                .collect(),
            kp_mastery: self.knowledge_point_mastery.into_iter().collect(),
            item_values: self.item_values.into_iter().collect(),
            selection_counts: self.selection_counts.into_iter().collect(),
            total_selections: self.total_selections.max(counted),
            recent_correct_complex_ids: self.recent_correct_complex_ids,
        }
    }
}

/// Load a session from `path`.
///
/// A missing, unreadable or malformed file yields a fresh session. The
/// problem is logged, never returned.
pub fn load_state(path: &Path) -> SessionState {
    if !path.exists() {
        tracing::debug!("no saved session at {}, starting fresh", path.display());
        return SessionState::default();
    }
    match read_snapshot(path) {
        Ok(snapshot) => snapshot.into_state(),
        Err(e) => {
            tracing::warn!("discarding saved session: {e:#}");
            SessionState::default()
        }
    }
}

fn read_snapshot(path: &Path) -> Result<SessionSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session state from {}", path.display()))?;
    let snapshot: SessionSnapshot =
        serde_json::from_str(&content).context("failed to parse session state JSON")?;
    Ok(snapshot)
}

/// Write a session to `path`, creating parent directories as needed.
///
/// The whole document is encoded before the file is touched.
pub fn save_state(path: &Path, state: &SessionState) -> Result<(), PersistenceError> {
    let json = serde_json::to_vec_pretty(&SessionSnapshot::from_state(state))?;
    let io_err = |source: std::io::Error| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut file = std::fs::File::create(path).map_err(io_err)?;
    file.write_all(&json).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    tracing::debug!(
        bytes = json.len(),
        "saved session state to {}",
        path.display()
    );
    Ok(())
}
