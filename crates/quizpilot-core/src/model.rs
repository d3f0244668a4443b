//! Core data model types for quizpilot.
//!
//! These are the records the decision core consumes from the host (item
//! metadata, answer events) and the per-item review state it produces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Milliseconds in one day.
pub const MS_PER_DAY: i64 = 86_400_000;

/// Lowest difficulty level an item can have.
pub const MIN_DIFFICULTY: u8 = 1;

/// Highest difficulty level an item can have.
pub const MAX_DIFFICULTY: u8 = 5;

/// Difficulty assumed when an item's label cannot be parsed.
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// Immutable description of a quiz item as seen by the core.
///
/// Only `id` participates in identity. The descriptive fields are passed
/// through for the host and never used to key state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMeta {
    /// Stable unique key.
    pub id: String,
    /// Difficulty level, 1 to 5.
    #[serde(deserialize_with = "deserialize_difficulty")]
    pub difficulty: u8,
    /// Syllabus concepts the item exercises, in order, without duplicates.
    #[serde(default)]
    pub knowledge_points: Vec<String>,
    /// Subject field the item belongs to.
    #[serde(default)]
    pub subject: Option<String>,
    /// Question type (single choice, fill blank, ...).
    #[serde(default)]
    pub item_type: Option<String>,
    /// Source document the item was drawn from.
    #[serde(default)]
    pub source_doc: Option<String>,
}

impl ItemMeta {
    /// Create item metadata with a clamped difficulty and no knowledge points.
    pub fn new(id: impl Into<String>, difficulty: u8) -> Self {
        Self {
            id: id.into(),
            difficulty: clamp_difficulty(i64::from(difficulty)),
            knowledge_points: Vec::new(),
            subject: None,
            item_type: None,
            source_doc: None,
        }
    }

    /// Attach knowledge points, dropping repeats while keeping first-seen order.
    pub fn with_knowledge_points<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kps: Vec<String> = Vec::new();
        for kp in points {
            let kp = kp.into();
            if !kps.contains(&kp) {
                kps.push(kp);
            }
        }
        self.knowledge_points = kps;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    pub fn with_source_doc(mut self, doc: impl Into<String>) -> Self {
        self.source_doc = Some(doc.into());
        self
    }

    /// Difficulty as a float, on the same scale as ability.
    pub fn difficulty_f64(&self) -> f64 {
        f64::from(self.difficulty)
    }
}

/// Accepts either a number or a label such as `"L4"`.
fn deserialize_difficulty<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match &raw {
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(clamp_difficulty)
            .unwrap_or(DEFAULT_DIFFICULTY),
        serde_json::Value::String(s) => parse_difficulty(Some(s)),
        _ => DEFAULT_DIFFICULTY,
    })
}

fn clamp_difficulty(value: i64) -> u8 {
    value.clamp(i64::from(MIN_DIFFICULTY), i64::from(MAX_DIFFICULTY)) as u8
}

/// Parse a difficulty label into a level.
///
/// Accepts `"L3"`-style labels (case-insensitive) and bare digits. Values are
/// clamped into 1..=5; anything unparseable, including a missing label, is 3.
pub fn parse_difficulty(label: Option<&str>) -> u8 {
    let Some(label) = label else {
        return DEFAULT_DIFFICULTY;
    };
    let upper = label.trim().to_uppercase();
    let digits = upper.strip_prefix('L').unwrap_or(&upper);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return DEFAULT_DIFFICULTY;
    }
    digits
        .parse::<i64>()
        .map(clamp_difficulty)
        .unwrap_or(DEFAULT_DIFFICULTY)
}

/// One submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// `None` when the answer could not be graded automatically.
    pub is_correct: Option<bool>,
    /// Submission time, Unix milliseconds.
    pub timestamp_ms: i64,
}

impl AnswerRecord {
    pub fn new(is_correct: Option<bool>, timestamp_ms: i64) -> Self {
        Self {
            is_correct,
            timestamp_ms,
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from(self.is_correct)
    }
}

/// Graded state of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Wrong,
    Ungraded,
}

impl From<Option<bool>> for Outcome {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Outcome::Correct,
            Some(false) => Outcome::Wrong,
            None => Outcome::Ungraded,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Correct => write!(f, "correct"),
            Outcome::Wrong => write!(f, "wrong"),
            Outcome::Ungraded => write!(f, "ungraded"),
        }
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "correct" | "right" | "true" => Ok(Outcome::Correct),
            "wrong" | "incorrect" | "false" => Ok(Outcome::Wrong),
            "ungraded" | "unknown" | "none" => Ok(Outcome::Ungraded),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

/// Spaced-repetition state for one item.
///
/// `easiness_factor >= 1.3` and `interval_days <= 180` always hold for
/// entries produced by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub easiness_factor: f64,
    pub interval_days: f64,
    /// Consecutive correct answers; reset to 0 by a wrong answer.
    pub repetitions: u32,
    /// When the item is next due, Unix milliseconds.
    pub next_due_ms: i64,
}

impl ReviewEntry {
    /// Whether the item is due for review at `now_ms`.
    pub fn is_due(&self, now_ms: i64) -> bool {
        now_ms >= self.next_due_ms
    }

    /// Days past the due time, or 0.0 if not yet due.
    pub fn overdue_days(&self, now_ms: i64) -> f64 {
        if self.is_due(now_ms) {
            (now_ms - self.next_due_ms) as f64 / MS_PER_DAY as f64
        } else {
            0.0
        }
    }

    /// Coarse bucket number matching the old four-bucket scheme.
    pub fn bucket(&self) -> u8 {
        if self.interval_days <= 1.0 {
            0
        } else if self.interval_days <= 3.0 {
            1
        } else if self.interval_days <= 7.0 {
            2
        } else {
            3
        }
    }

    /// Rebuild an entry from the old `{bucket, next_ts_ms}` form.
    pub fn from_bucket(bucket: u8, next_due_ms: i64) -> Self {
        const BUCKET_INTERVALS: [f64; 4] = [1.0, 3.0, 7.0, 21.0];
        let easiness_factor = if bucket == 0 {
            2.5
        } else {
            2.0 + f64::from(bucket) * 0.2
        };
        Self {
            easiness_factor,
            interval_days: BUCKET_INTERVALS[usize::from(bucket.min(3))],
            repetitions: u32::from(bucket),
            next_due_ms,
        }
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
