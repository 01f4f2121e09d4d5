//! Score report artifacts for downstream aggregation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::domain::{ScoreVector, TaskMeta};

/// Single score entry in the persisted report artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntryArtifact {
    pub label: String,
    pub value: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// Canonical per-evaluation report written for aggregation and review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreReportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub eval_id: Uuid,
    pub model: String,
    pub category: String,
    pub task: String,
    pub artifact_digest: String,
    pub scores: Vec<ScoreEntryArtifact>,
    /// Fatal, unscored error (reference environment failure), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl ScoreReportArtifact {
    /// Current artifact schema version.
    pub const SCHEMA_VERSION: &'static str = "1";

    /// Build a report from an evaluation's score vector.
    pub fn new(
        model: impl Into<String>,
        meta: &TaskMeta,
        artifact_digest: impl Into<String>,
        scores: &ScoreVector,
        fatal: Option<String>,
    ) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            eval_id: Uuid::new_v4(),
            model: model.into(),
            category: meta.category.clone(),
            task: meta.name.clone(),
            artifact_digest: artifact_digest.into(),
            scores: scores
                .entries()
                .iter()
                .map(|s| ScoreEntryArtifact {
                    label: s.label.clone(),
                    value: s.value,
                    diagnostic: s.diagnostic.clone(),
                })
                .collect(),
            fatal,
        }
    }

    /// Total score over recorded entries, as (passed, total).
    pub fn tally(&self) -> (usize, usize) {
        let passed = self.scores.iter().filter(|s| s.value == 1).count();
        (passed, self.scores.len())
    }
}

/// Write a score report in pretty JSON format.
pub fn write_score_report_json(path: &Path, artifact: &ScoreReportArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize score report")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
