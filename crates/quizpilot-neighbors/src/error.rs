//! Neighbor table error types.

use thiserror::Error;

/// Errors that can occur while reading a neighbor table.
#[derive(Debug, Error)]
pub enum NeighborError {
    /// The table file could not be read.
    #[error("failed to read neighbor table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A line is not a valid neighbor record.
    #[error("invalid neighbor record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A record lists a different number of neighbors and scores.
    #[error("neighbor record `{id}` has {ids} ids but {scores} scores")]
    LengthMismatch { id: String, ids: usize, scores: usize },
}
