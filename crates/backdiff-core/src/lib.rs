//! backdiff Core Library
//!
//! Domain model and filesystem primitives for the backdiff evaluation
//! harness:
//! - Task corpus loading with eager validation
//! - Candidate artifact materialization with containment checks
//! - Per-stage score model (ordered pass/fail vector)
//! - Score report artifacts for downstream aggregation

pub mod corpus;
pub mod domain;
pub mod materialize;
pub mod reporting;
pub mod telemetry;

pub use corpus::{copy_answer_files, CorpusLoader, CORPUS_GRADER_FILE, CORPUS_TASK_FILE};
pub use domain::{
    Artifact, EvalError, Result, Score, ScoreVector, StageOutcome, Task, TaskMeta,
};
pub use materialize::write_artifact;
pub use reporting::{write_score_report_json, ScoreEntryArtifact, ScoreReportArtifact};
pub use telemetry::init_tracing;

/// backdiff version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
