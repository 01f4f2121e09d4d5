//! Verification stage definitions.
//!
//! Each stage is an external subprocess with a fixed score label. Stage
//! order is fixed by the pipeline; every stage here is *soft* (failure is
//! scored, the pipeline continues). The single hard stage, artifact
//! materialization, lives in `backdiff-core::materialize` and runs
//! in-process before any of these.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::Sandbox;
use crate::config::{absolutize, EvalConfig};

/// Soft verification stages, in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvalStage {
    /// bun install
    InstallDeps,

    /// bunx convex codegen --typecheck disable --init
    Codegen,

    /// bunx tsc -noEmit -p <project>/convex
    Typecheck,

    /// bunx eslint -c <config> convex
    Lint,

    /// bunx convex dev --once against the sandbox
    Deploy,

    /// bunx vitest run <grader> against both sandboxes
    DiffTest,
}

impl EvalStage {
    /// Score label for this stage.
    pub fn label(&self) -> &'static str {
        match self {
            EvalStage::InstallDeps => "`bun install` succeeds",
            EvalStage::Codegen => "`convex codegen` succeeds",
            EvalStage::Typecheck => "Passes tsc",
            EvalStage::Lint => "Passes eslint",
            EvalStage::Deploy => "`convex dev` succeeds",
            EvalStage::DiffTest => "Tests pass",
        }
    }

    /// Short machine name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            EvalStage::InstallDeps => "install_deps",
            EvalStage::Codegen => "codegen",
            EvalStage::Typecheck => "typecheck",
            EvalStage::Lint => "lint",
            EvalStage::Deploy => "deploy",
            EvalStage::DiffTest => "difftest",
        }
    }
}

/// A fully resolved stage invocation: command, working directory,
/// environment, and timeout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageExec {
    /// Stage label used for scoring and logging.
    pub label: String,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,

    /// Working directory for the subprocess.
    pub cwd: std::path::PathBuf,

    /// Extra environment variables.
    pub env: Vec<(String, String)>,

    /// Timeout in seconds (0 = unbounded).
    pub timeout_secs: u64,
}

impl StageExec {
    /// A custom invocation with no extra environment.
    pub fn custom(
        label: impl Into<String>,
        command: Vec<String>,
        cwd: impl Into<std::path::PathBuf>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            label: label.into(),
            command,
            cwd: cwd.into(),
            env: Vec::new(),
            timeout_secs,
        }
    }
}

/// `bun install` in the project directory.
pub fn install_deps(config: &EvalConfig, project_dir: &Path) -> StageExec {
    StageExec::custom(
        EvalStage::InstallDeps.label(),
        vec![config.bun_binary.clone(), "install".into()],
        project_dir,
        config.stage_timeout_secs,
    )
}

/// Platform code generation with type-checking disabled; type errors
/// must not block this pass.
pub fn codegen(config: &EvalConfig, project_dir: &Path) -> StageExec {
    StageExec::custom(
        EvalStage::Codegen.label(),
        vec![
            config.bunx_binary.clone(),
            "convex".into(),
            "codegen".into(),
            "--typecheck".into(),
            "disable".into(),
            "--init".into(),
        ],
        project_dir,
        config.stage_timeout_secs,
    )
}

/// Type-check only the generated source subtree.
pub fn typecheck(config: &EvalConfig, project_dir: &Path) -> StageExec {
    let convex_dir = absolutize(&project_dir.join("convex"));
    StageExec::custom(
        EvalStage::Typecheck.label(),
        vec![
            config.bunx_binary.clone(),
            "tsc".into(),
            "-noEmit".into(),
            "-p".into(),
            convex_dir.to_string_lossy().into_owned(),
        ],
        project_dir,
        config.stage_timeout_secs,
    )
}

/// Lint the generated source subtree with the fixed external config.
pub fn lint(config: &EvalConfig, project_dir: &Path) -> StageExec {
    let eslint_config = absolutize(&config.eslint_config);
    StageExec::custom(
        EvalStage::Lint.label(),
        vec![
            config.bunx_binary.clone(),
            "eslint".into(),
            "-c".into(),
            eslint_config.to_string_lossy().into_owned(),
            "convex".into(),
        ],
        project_dir,
        config.stage_timeout_secs,
    )
}

/// Deploy the project directory against a live sandbox.
pub fn deploy(config: &EvalConfig, project_dir: &Path, sandbox: &Sandbox) -> StageExec {
    StageExec::custom(
        EvalStage::Deploy.label(),
        vec![
            config.bunx_binary.clone(),
            "convex".into(),
            "dev".into(),
            "--once".into(),
            "--admin-key".into(),
            sandbox.admin_key.clone(),
            "--url".into(),
            format!("http://localhost:{}", sandbox.port),
        ],
        project_dir,
        config.stage_timeout_secs,
    )
}

/// Run the differential grader against both sandboxes. The grader learns
/// the two ports (and the shared credential) via its environment.
pub fn difftest(
    config: &EvalConfig,
    grader_path: &Path,
    candidate: &Sandbox,
    reference: &Sandbox,
) -> StageExec {
    let grader = absolutize(grader_path);
    let mut exec = StageExec::custom(
        EvalStage::DiffTest.label(),
        vec![
            config.bunx_binary.clone(),
            "vitest".into(),
            "run".into(),
            grader.to_string_lossy().into_owned(),
            "--no-color".into(),
        ],
        &config.grader_workdir,
        config.stage_timeout_secs,
    );
    exec.env = vec![
        ("CONVEX_PORT".into(), candidate.port.to_string()),
        ("CONVEX_ANSWER_PORT".into(), reference.port.to_string()),
        ("CONVEX_ADMIN_KEY".into(), config.admin_key.clone()),
    ];
    exec
}
