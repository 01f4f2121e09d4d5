//! Per-stage scoring model.
//!
//! Soft-stage failure is data, not control flow: each stage produces a
//! [`StageOutcome`] and the pipeline converts it into a [`Score`] entry,
//! so "continue past soft failure" is an explicit data-flow property.

use serde::{Deserialize, Serialize};

/// Tagged outcome of a single verification stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage subprocess exited 0.
    Passed,

    /// The stage failed; `diagnostic` is the combined stdout+stderr of
    /// the subprocess (or the spawn/timeout error text).
    Failed { diagnostic: String },
}

impl StageOutcome {
    /// Whether this outcome is a pass.
    pub fn passed(&self) -> bool {
        matches!(self, StageOutcome::Passed)
    }

    /// Diagnostic payload, if the stage failed.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            StageOutcome::Passed => None,
            StageOutcome::Failed { diagnostic } => Some(diagnostic),
        }
    }
}

/// A single named pass/fail entry in the score vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Score {
    /// Stage label, e.g. `Valid filesystem output`.
    pub label: String,

    /// 1 for pass, 0 for fail.
    pub value: u8,

    /// Diagnostic text for failed stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl Score {
    /// A passing entry.
    pub fn pass(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: 1,
            diagnostic: None,
        }
    }

    /// A failing entry with diagnostic payload.
    pub fn fail(label: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: 0,
            diagnostic: Some(diagnostic.into()),
        }
    }

    /// Build a score entry from a stage outcome.
    pub fn from_outcome(label: impl Into<String>, outcome: &StageOutcome) -> Self {
        match outcome {
            StageOutcome::Passed => Self::pass(label),
            StageOutcome::Failed { diagnostic } => Self::fail(label, diagnostic.clone()),
        }
    }

    /// Whether this entry is a pass.
    pub fn passed(&self) -> bool {
        self.value == 1
    }
}

/// Ordered, append-only sequence of per-stage scores for one evaluation.
///
/// A hard-stage failure leaves the vector short; soft stages always
/// contribute an entry regardless of earlier soft failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreVector {
    entries: Vec<Score>,
}

impl ScoreVector {
    /// Create an empty score vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a score entry.
    pub fn push(&mut self, score: Score) {
        self.entries.push(score);
    }

    /// Record a stage outcome under the given label.
    pub fn record(&mut self, label: impl Into<String>, outcome: &StageOutcome) {
        self.push(Score::from_outcome(label, outcome));
    }

    /// Ordered entries.
    pub fn entries(&self) -> &[Score] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of passing entries.
    pub fn passed_count(&self) -> usize {
        self.entries.iter().filter(|s| s.passed()).count()
    }

    /// Number of failing entries.
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|s| !s.passed()).count()
    }

    /// Look up an entry by label.
    pub fn get(&self, label: &str) -> Option<&Score> {
        self.entries.iter().find(|s| s.label == label)
    }

    /// Flatten to the external (label, 0|1) reporting shape.
    pub fn as_pairs(&self) -> Vec<(String, u8)> {
        self.entries
            .iter()
            .map(|s| (s.label.clone(), s.value))
            .collect()
    }
}

impl IntoIterator for ScoreVector {
    type Item = Score;
    type IntoIter = std::vec::IntoIter<Score>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_from_outcome() {
        let pass = Score::from_outcome("Passes tsc", &StageOutcome::Passed);
        assert_eq!(pass.value, 1);
        assert!(pass.diagnostic.is_none());

        let fail = Score::from_outcome(
            "Passes tsc",
            &StageOutcome::Failed {
                diagnostic: "TS2322: type error".to_string(),
            },
        );
        assert_eq!(fail.value, 0);
        assert!(fail.diagnostic.as_deref().unwrap().contains("TS2322"));
    }

    #[test]
    fn test_score_vector_counts() {
        let mut scores = ScoreVector::new();
        scores.push(Score::pass("Valid filesystem output"));
        scores.push(Score::fail("Passes eslint", "no-unused-vars"));
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.passed_count(), 1);
        assert_eq!(scores.failed_count(), 1);
    }

    #[test]
    fn test_score_vector_preserves_order() {
        let mut scores = ScoreVector::new();
        scores.push(Score::pass("Valid filesystem output"));
        scores.push(Score::pass("`bun install` succeeds"));
        scores.push(Score::fail("Passes tsc", "boom"));

        let pairs = scores.as_pairs();
        assert_eq!(
            pairs,
            vec![
                ("Valid filesystem output".to_string(), 1),
                ("`bun install` succeeds".to_string(), 1),
                ("Passes tsc".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_score_vector_lookup() {
        let mut scores = ScoreVector::new();
        scores.record(
            "Tests pass",
            &StageOutcome::Failed {
                diagnostic: "1 failed".to_string(),
            },
        );
        let entry = scores.get("Tests pass").expect("entry missing");
        assert!(!entry.passed());
        assert!(scores.get("Passes tsc").is_none());
    }

    #[test]
    fn test_score_serde_skips_empty_diagnostic() {
        let json = serde_json::to_string(&Score::pass("Tests pass")).expect("serialize");
        assert!(!json.contains("diagnostic"));
    }
}
