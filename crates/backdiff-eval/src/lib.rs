//! backdiff Eval - staged evaluation pipeline with dual-sandbox
//! differential testing.
//!
//! Provides the per-(model, task) evaluation machinery:
//! - Soft verification stages executed as subprocesses, scored
//!   independently so one failure never hides another
//! - Sandbox provisioning with scoped, drop-safe teardown
//! - Unguarded reference preparation (reference failures are
//!   infrastructure errors, never candidate scores)
//! - Differential grader execution against both live sandboxes

pub mod backend;
pub mod config;
pub mod difftest;
pub mod fakes;
pub mod generate;
pub mod orchestrator;
pub mod pipeline;
pub mod reference;
pub mod runner;
pub mod stage;

// Re-export key types
pub use backend::{LocalBackend, Sandbox, SandboxGuard, SandboxProvisioner};
pub use config::{EvalConfig, DEFAULT_ADMIN_KEY};
pub use difftest::run_grader;
pub use generate::{CandidateGenerator, DirArtifactSource};
pub use orchestrator::{EvalFailure, EvalRecord, Evaluator, FILESYSTEM_STAGE_LABEL};
pub use pipeline::CandidatePipeline;
pub use reference::{deploy_reference, prepare_reference};
pub use runner::{StageRun, StageRunner};
pub use stage::{EvalStage, StageExec};
