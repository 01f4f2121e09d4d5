//! Domain-level error taxonomy for backdiff.

use std::path::PathBuf;

/// backdiff domain errors.
///
/// The taxonomy separates three failure classes with very different
/// handling policies:
/// - `Containment` — hard materialization failure, terminates the
///   evaluation with only the materialization stage scored.
/// - `ReferenceEnvironment` — a failure while preparing or deploying the
///   trusted reference. Intentionally *not* convertible into a stage
///   score: the reference is assumed correct, so its failure is an
///   infrastructure problem, not a candidate defect.
/// - everything else — ordinary operational errors surfaced to the
///   caller.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("containment violation: {path:?} resolves outside project root {root:?}")]
    Containment { root: PathBuf, path: String },

    #[error("invalid corpus entry {entry}: {reason}")]
    Corpus { entry: String, reason: String },

    #[error("sandbox for {dir:?} never became ready: {reason}")]
    SandboxUnavailable { dir: PathBuf, reason: String },

    #[error("reference environment failure in '{stage}': {diagnostic}")]
    ReferenceEnvironment { stage: String, diagnostic: String },

    #[error("artifact generation failed: {0}")]
    Generation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for backdiff domain operations.
pub type Result<T> = std::result::Result<T, EvalError>;
