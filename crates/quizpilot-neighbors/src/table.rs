//! Precomputed nearest-neighbor table.
//!
//! One JSON object per line:
//!
//! ```json
//! {"id": "q17", "neighbors": ["q3", "q41"], "scores": [0.91, 0.78]}
//! ```
//!
//! Neighbors are expected in descending similarity order. Each list is cut to
//! the configured top-k when loaded.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use quizpilot_core::similarity::{NeighborLookup, Neighbors};
use serde::Deserialize;

use crate::error::NeighborError;

#[derive(Debug, Deserialize)]
struct NeighborRecord {
    id: String,
    #[serde(default)]
    neighbors: Vec<String>,
    #[serde(default, alias = "similarities")]
    scores: Vec<f64>,
}

/// In-memory neighbor lists keyed by item id.
#[derive(Debug, Clone, Default)]
pub struct NeighborTable {
    entries: HashMap<String, Neighbors>,
    top_k: usize,
}

impl NeighborTable {
    /// Empty table keeping at most `top_k` neighbors per item.
    pub fn new(top_k: usize) -> Self {
        Self {
            entries: HashMap::new(),
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add or replace the neighbors of `id`.
    pub fn insert(&mut self, id: impl Into<String>, mut neighbors: Neighbors) {
        neighbors.truncate(self.top_k);
        self.entries.insert(id.into(), neighbors);
    }

    pub fn get(&self, id: &str) -> Option<&Neighbors> {
        self.entries.get(id)
    }

    /// Load a JSONL table. Unparseable lines are skipped with a warning.
    pub fn load_jsonl(path: &Path, top_k: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| NeighborError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_jsonl_str(&content, top_k);
        tracing::info!(
            items = table.len(),
            top_k,
            "loaded neighbor table from {}",
            path.display()
        );
        Ok(table)
    }

    /// Build a table from JSONL content.
    pub fn from_jsonl_str(content: &str, top_k: usize) -> Self {
        let mut table = Self::new(top_k);
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(line, idx + 1) {
                Ok((id, neighbors)) => table.insert(id, neighbors),
                Err(e) => tracing::warn!("skipping neighbor record: {e}"),
            }
        }
        table
    }
}

/// Parse one JSONL record into an id and its neighbors.
pub fn parse_record(line: &str, line_no: usize) -> Result<(String, Neighbors), NeighborError> {
    let record: NeighborRecord =
        serde_json::from_str(line).map_err(|source| NeighborError::Parse {
            line: line_no,
            source,
        })?;
    if record.neighbors.len() != record.scores.len() {
        return Err(NeighborError::LengthMismatch {
            id: record.id,
            ids: record.neighbors.len(),
            scores: record.scores.len(),
        });
    }
    Ok((record.id, Neighbors::new(record.neighbors, record.scores)))
}

impl NeighborLookup for NeighborTable {
    fn neighbors(&self, id: &str) -> Option<Neighbors> {
        self.entries.get(id).cloned()
    }
}

/// Open the table at `path`, or an empty table if it cannot be read.
///
/// An empty table answers "absent" for every id.
pub fn open_lookup(path: &Path, top_k: usize) -> NeighborTable {
    NeighborTable::load_jsonl(path, top_k).unwrap_or_else(|e| {
        tracing::warn!("similarity disabled: {e:#}");
        NeighborTable::new(top_k)
    })
}
