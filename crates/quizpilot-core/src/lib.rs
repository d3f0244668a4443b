//! quizpilot-core — Adaptive decision core for quiz sessions.
//!
//! Tracks learner ability, schedules spaced reviews, scores candidate items
//! and picks the next ones with an upper-confidence-bound policy. All
//! decisions are synchronous functions over an in-memory [`SessionState`];
//! the host supplies similarity lookups and persists snapshots.

pub mod ability;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod persistence;
pub mod scheduler;
pub mod scorer;
pub mod selector;
pub mod session;
pub mod similarity;
pub mod state;

pub use ability::{logistic, AbilityEstimator};
pub use config::{AdaptiveParams, FilesConfig, QuizpilotConfig};
pub use error::{ConfigError, PersistenceError};
pub use history::RoundSummary;
pub use model::{AnswerRecord, ItemMeta, Outcome, ReviewEntry};
pub use scheduler::ReviewScheduler;
pub use scorer::{ItemScorer, ScoreBreakdown, ScoringContext};
pub use selector::BanditSelector;
pub use session::{AdaptiveSession, SubmitOutcome};
pub use similarity::{ComplexDifficulty, FixedComplexDifficulty, NeighborLookup, Neighbors, NoNeighbors};
pub use state::SessionState;
