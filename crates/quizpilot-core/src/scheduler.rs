//! SM-2 style review scheduling with continuous intervals.
//!
//! The learner is never asked to rate recall, so the SM-2 quality grade is
//! fixed per outcome: a correct answer counts as quality 4, a wrong answer as
//! quality 2. Those grades move the easiness factor by +0.10 and -0.14.

use crate::model::{ReviewEntry, MS_PER_DAY};

/// Easiness factor assigned to a never-reviewed item.
pub const INITIAL_EASINESS: f64 = 2.5;
/// Easiness factor floor.
pub const MIN_EASINESS: f64 = 1.3;
/// Longest interval the scheduler will produce.
pub const MAX_INTERVAL_DAYS: f64 = 180.0;

/// Quality grade assumed for a correct answer.
pub const QUALITY_CORRECT: u8 = 4;
/// Quality grade assumed for a wrong answer.
pub const QUALITY_WRONG: u8 = 2;

/// Easiness update for an assumed quality grade, floored at 1.3.
///
/// The grade deficit is measured from [`QUALITY_CORRECT`], so quality 4
/// gains 0.10 and quality 2 loses 0.14.
pub fn next_easiness(easiness: f64, quality: u8) -> f64 {
    let deficit = f64::from(QUALITY_CORRECT) - f64::from(quality.min(5));
    (easiness + 0.1 - deficit * (0.08 + deficit * 0.02)).max(MIN_EASINESS)
}

/// Computes the next review entry for an item from its previous one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewScheduler;

impl ReviewScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Produce the replacement entry after an answer at `now_ms`.
    ///
    /// A missing prior entry is treated as a fresh item (EF 2.5, interval 1
    /// day, no repetitions).
    pub fn on_result(
        &self,
        prior: Option<&ReviewEntry>,
        is_correct: bool,
        now_ms: i64,
    ) -> ReviewEntry {
        let (mut easiness, mut interval, mut repetitions) = match prior {
            Some(entry) => (
                entry.easiness_factor,
                entry.interval_days,
                entry.repetitions,
            ),
            None => (INITIAL_EASINESS, 1.0, 0),
        };

        if is_correct {
            repetitions = repetitions.saturating_add(1);
            easiness = next_easiness(easiness, QUALITY_CORRECT);
            interval = match repetitions {
                1 => 1.0,
                2 => 6.0,
                _ => interval * easiness,
            };
        } else {
            repetitions = 0;
            interval = 1.0;
            easiness = next_easiness(easiness, QUALITY_WRONG);
        }

        let interval = interval.min(MAX_INTERVAL_DAYS);
        let next_due_ms = now_ms + (interval * MS_PER_DAY as f64).round() as i64;

        ReviewEntry {
            easiness_factor: easiness,
            interval_days: interval,
            repetitions,
            next_due_ms,
        }
    }
}
