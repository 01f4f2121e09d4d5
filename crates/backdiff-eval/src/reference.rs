//! Trusted reference preparation.
//!
//! Fault tolerance here is deliberately asymmetric to the candidate
//! pipeline: reference steps are not scored and their failures are not
//! caught. The reference is checked into the corpus and assumed correct,
//! so a failure on this path is an environment problem that must surface
//! as a loud error — scoring it would silently blame the candidate.
//! Do not "fix" this into symmetric handling.

use std::path::Path;

use tracing::info;

use backdiff_core::corpus::copy_answer_files;
use backdiff_core::domain::{EvalError, Result, Task};

use crate::backend::Sandbox;
use crate::config::EvalConfig;
use crate::runner::{StageRun, StageRunner};
use crate::stage::{self, StageExec};

/// Copy the trusted answer files verbatim into the reference project
/// directory and prepare it: dependency resolution, then code
/// generation.
///
/// Any stage failure aborts the evaluation with
/// [`EvalError::ReferenceEnvironment`].
pub async fn prepare_reference(config: &EvalConfig, task: &Task, project_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(project_dir)?;

    let copied = copy_answer_files(&task.answer_dir, project_dir)?;
    info!(task = %task.meta, files = copied, "reference materialized");

    run_fatal(stage::install_deps(config, project_dir)).await?;
    run_fatal(stage::codegen(config, project_dir)).await?;
    Ok(())
}

/// Deploy the prepared reference project against its sandbox, unguarded.
pub async fn deploy_reference(
    config: &EvalConfig,
    project_dir: &Path,
    sandbox: &Sandbox,
) -> Result<()> {
    run_fatal(stage::deploy(config, project_dir, sandbox)).await?;
    Ok(())
}

/// Execute a stage and promote failure to a fatal reference error.
async fn run_fatal(exec: StageExec) -> Result<StageRun> {
    let run = StageRunner::execute(&exec).await;
    if !run.passed() {
        return Err(EvalError::ReferenceEnvironment {
            stage: exec.label,
            diagnostic: run.output,
        });
    }
    Ok(run)
}
