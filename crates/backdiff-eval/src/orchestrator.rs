//! Evaluation orchestration.
//!
//! Composes materialization, the candidate soft-stage pipeline, reference
//! preparation, dual-sandbox deployment, and the differential test into a
//! single evaluation of one (model, task) pair. Concurrency across
//! evaluations belongs to the calling framework; this function owns no
//! shared mutable state.

use tracing::{info, warn};

use backdiff_core::domain::{
    Artifact, EvalError, Result, Score, ScoreVector, Task, TaskMeta,
};
use backdiff_core::materialize::write_artifact;

use crate::backend::SandboxProvisioner;
use crate::config::EvalConfig;
use crate::difftest::run_grader;
use crate::generate::CandidateGenerator;
use crate::pipeline::CandidatePipeline;
use crate::reference::{deploy_reference, prepare_reference};
use crate::stage::EvalStage;

/// Score label for the hard materialization stage.
pub const FILESYSTEM_STAGE_LABEL: &str = "Valid filesystem output";

/// Completed evaluation of one (model, task) pair.
#[derive(Debug, Clone)]
pub struct EvalRecord {
    /// Candidate-generating model identifier.
    pub model: String,

    /// Task identity.
    pub meta: TaskMeta,

    /// Digest of the evaluated artifact.
    pub artifact_digest: String,

    /// Ordered per-stage scores.
    pub scores: ScoreVector,
}

/// Fatal, unscored evaluation failure (reference environment or
/// infrastructure). Carries the scores recorded before the failure so
/// the caller can still flush partial results.
#[derive(Debug)]
pub struct EvalFailure {
    /// Scores recorded before the fatal error.
    pub partial: ScoreVector,

    /// The underlying error.
    pub error: EvalError,
}

impl std::fmt::Display for EvalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "evaluation aborted after {} scored stage(s): {}",
            self.partial.len(),
            self.error
        )
    }
}

impl std::error::Error for EvalFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Per-(model, task) evaluation orchestrator.
pub struct Evaluator<P: SandboxProvisioner> {
    config: EvalConfig,
    provisioner: P,
}

impl<P: SandboxProvisioner> Evaluator<P> {
    /// Create an evaluator with the given configuration and sandbox
    /// provisioner.
    pub fn new(config: EvalConfig, provisioner: P) -> Self {
        Self {
            config,
            provisioner,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Obtain a candidate artifact from the generator and evaluate it.
    pub async fn evaluate_generated<G: CandidateGenerator>(
        &self,
        model: &str,
        task: &Task,
        generator: &G,
    ) -> std::result::Result<EvalRecord, EvalFailure> {
        let artifact = generator.generate(task).await.map_err(|error| EvalFailure {
            partial: ScoreVector::new(),
            error,
        })?;
        self.evaluate(model, task, &artifact).await
    }

    /// Evaluate one candidate artifact against one task.
    ///
    /// Returns `Ok` with the full (possibly short) score vector, or an
    /// [`EvalFailure`] when the reference path or evaluation
    /// infrastructure fails — never a zero score for those.
    pub async fn evaluate(
        &self,
        model: &str,
        task: &Task,
        artifact: &Artifact,
    ) -> std::result::Result<EvalRecord, EvalFailure> {
        info!(model, task = %task.meta, digest = %artifact.digest(), "starting evaluation");
        let mut scores = ScoreVector::new();

        match self.evaluate_inner(model, task, artifact, &mut scores).await {
            Ok(()) => Ok(EvalRecord {
                model: model.to_string(),
                meta: task.meta.clone(),
                artifact_digest: artifact.digest(),
                scores,
            }),
            Err(error) => {
                warn!(model, task = %task.meta, %error, "evaluation aborted");
                Err(EvalFailure {
                    partial: scores,
                    error,
                })
            }
        }
    }

    async fn evaluate_inner(
        &self,
        model: &str,
        task: &Task,
        artifact: &Artifact,
        scores: &mut ScoreVector,
    ) -> Result<()> {
        let candidate_dir = self.config.candidate_project_dir(model, &task.meta);
        std::fs::create_dir_all(&candidate_dir)?;

        // Hard stage: a containment violation (or any write failure)
        // terminates the evaluation with only this stage scored. No
        // sandbox is provisioned past this point on failure.
        match write_artifact(&candidate_dir, artifact) {
            Ok(()) => scores.push(Score::pass(FILESYSTEM_STAGE_LABEL)),
            Err(e) => {
                warn!(task = %task.meta, "materialization rejected: {e}");
                scores.push(Score::fail(FILESYSTEM_STAGE_LABEL, e.to_string()));
                return Ok(());
            }
        }

        // Pre-deploy soft stages need no sandbox; running them first
        // keeps their scores even when provisioning fails below.
        CandidatePipeline::run_verification(&self.config, &candidate_dir, scores).await;

        let candidate_guard = self
            .provisioner
            .acquire(&self.config.candidate_backend_dir(model, &task.meta))
            .await?;
        CandidatePipeline::run_deploy(&self.config, &candidate_dir, candidate_guard.sandbox(), scores)
            .await;

        // Reference path: unguarded by design. The candidate sandbox
        // stays open — both sandboxes coexist for the comparison.
        let reference_dir = self.config.reference_project_dir(model, &task.meta);
        prepare_reference(&self.config, task, &reference_dir).await?;

        let reference_guard = self
            .provisioner
            .acquire(&self.config.reference_backend_dir(model, &task.meta))
            .await?;
        deploy_reference(&self.config, &reference_dir, reference_guard.sandbox()).await?;

        let outcome = run_grader(
            &self.config,
            &task.grader_path,
            candidate_guard.sandbox(),
            reference_guard.sandbox(),
        )
        .await;
        scores.record(EvalStage::DiffTest.label(), &outcome);

        reference_guard.release().await;
        candidate_guard.release().await;
        Ok(())
    }
}
