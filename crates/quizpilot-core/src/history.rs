//! Past round summaries used to warm-start the value table.
//!
//! The host appends one JSON object per finished round to a JSONL file. Only
//! the per-item outcomes matter here; any other keys in a round are ignored.

use std::collections::{BTreeMap, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Outcome of one item within a past round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundItem {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "isCorrect")]
    pub is_correct: Option<bool>,
}

/// One past round: the items it contained and how they went.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    #[serde(default)]
    pub items: Vec<RoundItem>,
}

impl RoundSummary {
    pub fn new(items: impl IntoIterator<Item = (String, Option<bool>)>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(id, is_correct)| RoundItem { id, is_correct })
                .collect(),
        }
    }
}

/// Correct and total counts for one item across rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemTally {
    pub correct: u32,
    pub total: u32,
}

impl ItemTally {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total)
        }
    }
}

/// Count graded outcomes per item. Items with an empty id or no grade are skipped.
pub fn tally_outcomes(rounds: &[RoundSummary]) -> BTreeMap<String, ItemTally> {
    let mut tallies: BTreeMap<String, ItemTally> = BTreeMap::new();
    for item in rounds.iter().flat_map(|r| r.items.iter()) {
        let Some(is_correct) = item.is_correct else {
            continue;
        };
        if item.id.is_empty() {
            continue;
        }
        let tally = tallies.entry(item.id.clone()).or_default();
        tally.total += 1;
        if is_correct {
            tally.correct += 1;
        }
    }
    tallies
}

/// Append one finished round to a JSONL history file.
pub fn append_round(path: &Path, round: &RoundSummary) -> Result<()> {
    let mut line = serde_json::to_string(round).context("failed to serialize round")?;
    line.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open round history {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("failed to append to round history {}", path.display()))?;
    Ok(())
}

/// Read the last `limit` rounds from a JSONL file, oldest first.
///
/// A missing or unreadable file yields no rounds; unparseable lines are
/// skipped.
pub fn load_recent_rounds(path: &Path, limit: usize) -> Vec<RoundSummary> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("no round history at {}: {e}", path.display());
            return Vec::new();
        }
    };
    parse_recent_rounds(&content, limit)
}

/// Parse the last `limit` rounds out of JSONL content, oldest first.
pub fn parse_recent_rounds(content: &str, limit: usize) -> Vec<RoundSummary> {
    if limit == 0 {
        return Vec::new();
    }
    let mut rounds: VecDeque<RoundSummary> = VecDeque::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RoundSummary>(line) {
            Ok(round) => {
                if rounds.len() == limit {
                    rounds.pop_front();
                }
                rounds.push_back(round);
            }
            Err(e) => tracing::warn!("skipping round history line {}: {e}", idx + 1),
        }
    }
    rounds.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY: &str = r#"
{"round": 1, "items": [{"id": "q1", "is_correct": true}, {"id": "q2", "is_correct": false}]}
not json at all
{"round": 2, "items": [{"id": "q1", "isCorrect": false}, {"id": "q3", "is_correct": null}]}

{"round": 3, "items": [{"id": "q1", "is_correct": true}, {"id": "", "is_correct": true}]}
"#;

    #[test]
    fn keeps_last_rounds_in_order() {
        let rounds = parse_recent_rounds(HISTORY, 2);
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].items[0].is_correct, Some(false));
        assert_eq!(rounds[1].items[0].is_correct, Some(true));
    }

    #[test]
    fn zero_limit_is_empty() {
        assert!(parse_recent_rounds(HISTORY, 0).is_empty());
    }

    #[test]
    fn tally_skips_ungraded_and_blank_ids() {
        let rounds = parse_recent_rounds(HISTORY, 10);
        assert_eq!(rounds.len(), 3);
        let tallies = tally_outcomes(&rounds);
        assert_eq!(tallies["q1"], ItemTally { correct: 2, total: 3 });
        assert_eq!(tallies["q2"], ItemTally { correct: 0, total: 1 });
        assert!(!tallies.contains_key("q3"));
        assert!(!tallies.contains_key(""));
        assert!((tallies["q1"].accuracy() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_recent_rounds(&dir.path().join("rounds.jsonl"), 15).is_empty());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.jsonl");
        std::fs::write(&path, HISTORY).unwrap();
        assert_eq!(load_recent_rounds(&path, 15).len(), 3);
    }

    #[test]
    fn appended_rounds_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history").join("rounds.jsonl");
        let first = RoundSummary::new([("q1".to_string(), Some(true))]);
        let second = RoundSummary::new([("q2".to_string(), None)]);
        append_round(&path, &first).unwrap();
        append_round(&path, &second).unwrap();
        assert_eq!(load_recent_rounds(&path, 15), vec![first, second]);
    }
}
