//! Bayesian ability tracking.
//!
//! Ability is modelled as a normal belief `N(mean, variance)` on the same 1-5
//! scale as item difficulty. Each graded answer moves the mean by a step
//! scaled with the current uncertainty and the Fisher information of the
//! Bernoulli outcome, and shrinks the variance toward a floor.

use serde::{Deserialize, Serialize};

/// Lower bound of the ability scale.
pub const ABILITY_MIN: f64 = 1.0;
/// Upper bound of the ability scale.
pub const ABILITY_MAX: f64 = 5.0;
/// Variance never shrinks below this.
pub const VARIANCE_MIN: f64 = 0.1;
/// Variance never grows above this.
pub const VARIANCE_MAX: f64 = 2.0;

const STEP_MIN: f64 = 0.05;
const STEP_MAX: f64 = 0.5;
const VARIANCE_SHRINK: f64 = 0.1;

/// Confidence level used when none is given.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Numerically stable logistic function.
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// Running estimate of a learner's skill and its uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityEstimator {
    pub mean: f64,
    pub variance: f64,
}

impl Default for AbilityEstimator {
    fn default() -> Self {
        Self::new(3.0, 1.0)
    }
}

impl AbilityEstimator {
    /// Create an estimator, clamping both values into their allowed ranges.
    pub fn new(mean: f64, variance: f64) -> Self {
        Self {
            mean: mean.clamp(ABILITY_MIN, ABILITY_MAX),
            variance: variance.clamp(VARIANCE_MIN, VARIANCE_MAX),
        }
    }

    /// Probability of a correct answer to an item of the given difficulty.
    pub fn predicted_probability(&self, difficulty: f64) -> f64 {
        logistic(self.mean - difficulty)
    }

    /// Fold one graded answer into the estimate. Returns `(mean, variance)`.
    pub fn update(&mut self, is_correct: bool, difficulty: f64) -> (f64, f64) {
        let predicted = self.predicted_probability(difficulty);
        let observation = if is_correct { 1.0 } else { 0.0 };
        let error = observation - predicted;

        // Bernoulli curvature, largest when the prediction is a coin flip.
        let fisher_info = predicted * (1.0 - predicted);

        let step = (self.variance * fisher_info).clamp(STEP_MIN, STEP_MAX);
        self.mean = (self.mean + step * error).clamp(ABILITY_MIN, ABILITY_MAX);
        self.variance = (self.variance * (1.0 - fisher_info * self.variance * VARIANCE_SHRINK))
            .clamp(VARIANCE_MIN, VARIANCE_MAX);

        tracing::debug!(
            is_correct,
            difficulty,
            predicted,
            mean = self.mean,
            variance = self.variance,
            "ability updated"
        );

        (self.mean, self.variance)
    }

    /// Interval `mean ± z·σ`, clamped to the ability scale.
    ///
    /// Only two levels are distinguished: exactly 0.95 uses z = 1.96, every
    /// other level uses z = 2.58.
    pub fn confidence_interval(&self, confidence: f64) -> (f64, f64) {
        let z = if confidence == DEFAULT_CONFIDENCE {
            1.96
        } else {
            2.58
        };
        let margin = z * self.variance.sqrt();
        (
            (self.mean - margin).max(ABILITY_MIN),
            (self.mean + margin).min(ABILITY_MAX),
        )
    }
}

/// Functional form of [`AbilityEstimator::update`].
pub fn update_ability(mean: f64, variance: f64, is_correct: bool, difficulty: f64) -> (f64, f64) {
    let mut estimator = AbilityEstimator { mean, variance };
    estimator.update(is_correct, difficulty)
}
