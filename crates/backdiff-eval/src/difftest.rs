//! Differential test execution.
//!
//! Invokes the task's external grader program once, with both sandboxes'
//! ports and the shared credential in its environment. The grader's
//! internal assertions (schema comparison, function surface, behavior)
//! are opaque here; its exit status is the only signal.

use std::path::Path;

use tracing::info;

use backdiff_core::domain::StageOutcome;

use crate::backend::Sandbox;
use crate::config::EvalConfig;
use crate::runner::StageRunner;
use crate::stage;

/// Run the grader against the candidate and reference sandboxes and
/// return the soft-stage outcome for `Tests pass`.
pub async fn run_grader(
    config: &EvalConfig,
    grader_path: &Path,
    candidate: &Sandbox,
    reference: &Sandbox,
) -> StageOutcome {
    info!(
        grader = %grader_path.display(),
        candidate_port = candidate.port,
        reference_port = reference.port,
        "running differential test"
    );
    let exec = stage::difftest(config, grader_path, candidate, reference);
    StageRunner::execute(&exec).await.outcome
}
