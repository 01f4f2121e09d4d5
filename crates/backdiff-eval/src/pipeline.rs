//! Candidate soft-stage pipeline.
//!
//! Runs the ordered soft stages against a materialized candidate project,
//! appending exactly one score entry per stage. No stage's failure
//! affects whether later stages run: the vector is diagnostic, meant to
//! localize which capability the candidate lacks.

use std::path::Path;

use tracing::{info, warn};

use backdiff_core::domain::ScoreVector;

use crate::backend::Sandbox;
use crate::config::EvalConfig;
use crate::runner::{StageRun, StageRunner};
use crate::stage::{self, StageExec};

/// Candidate pipeline orchestrator.
pub struct CandidatePipeline;

impl CandidatePipeline {
    /// Ordered pre-deploy soft stages for a candidate project: dependency
    /// resolution, code generation, type verification, lint verification.
    ///
    /// None of these need a live sandbox, so they run before one is
    /// provisioned; their scores survive a provisioning outage.
    pub fn verification_plan(config: &EvalConfig, project_dir: &Path) -> Vec<StageExec> {
        vec![
            stage::install_deps(config, project_dir),
            stage::codegen(config, project_dir),
            stage::typecheck(config, project_dir),
            stage::lint(config, project_dir),
        ]
    }

    /// Execute a stage sequence, scoring every stage and never
    /// short-circuiting. Returns the individual runs for diagnostics.
    pub async fn run_stages(stages: &[StageExec], scores: &mut ScoreVector) -> Vec<StageRun> {
        let mut runs = Vec::with_capacity(stages.len());
        for exec in stages {
            info!(stage = %exec.label, "executing stage");
            let run = StageRunner::execute(exec).await;
            if !run.passed() {
                warn!(stage = %exec.label, exit_code = run.exit_code, "stage failed");
            }
            scores.record(&exec.label, &run.outcome);
            runs.push(run);
        }
        runs
    }

    /// Plan and execute the pre-deploy candidate soft stages.
    pub async fn run_verification(
        config: &EvalConfig,
        project_dir: &Path,
        scores: &mut ScoreVector,
    ) -> Vec<StageRun> {
        let plan = Self::verification_plan(config, project_dir);
        Self::run_stages(&plan, scores).await
    }

    /// Deploy the candidate against its live sandbox, as a scored soft
    /// stage.
    ///
    /// Attempted unconditionally — even when code generation failed
    /// there is nothing to skip, because the differential test wants its
    /// own, more specific signal afterwards.
    pub async fn run_deploy(
        config: &EvalConfig,
        project_dir: &Path,
        sandbox: &Sandbox,
        scores: &mut ScoreVector,
    ) -> Vec<StageRun> {
        let exec = stage::deploy(config, project_dir, sandbox);
        Self::run_stages(std::slice::from_ref(&exec), scores).await
    }
}
