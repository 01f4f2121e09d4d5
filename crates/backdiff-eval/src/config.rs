//! Evaluation run configuration.
//!
//! All scratch locations derive from an explicit `output_root` passed in
//! at construction; there is no process-global temp state. Two concurrent
//! evaluations never share a keyed subpath because every project and
//! backend directory is keyed by (model, category, name) and role.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use backdiff_core::domain::TaskMeta;

/// Fixed administrative credential accepted by the Convex local backend
/// in dev mode. Read-only, process-wide configuration.
pub const DEFAULT_ADMIN_KEY: &str = "0135d8598650f8f5cb0f30c34ec2e2bb62793bc28717c8eb6fb577996d50be5f4281b59181095065c5d0f86a2c31ddbe9b597ec62b47ded69782cd";

/// Configuration for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalConfig {
    /// Scratch root for all project and backend directories. Created
    /// once per run, never shared across runs.
    pub output_root: PathBuf,

    /// Administrative credential for backend deployments.
    pub admin_key: String,

    /// Path to the local backend server binary.
    pub backend_binary: PathBuf,

    /// Package manager binary used for dependency resolution.
    pub bun_binary: String,

    /// Package runner binary used for codegen, typecheck, lint, deploy,
    /// and grader execution.
    pub bunx_binary: String,

    /// Lint configuration passed to eslint with `-c`.
    pub eslint_config: PathBuf,

    /// Working directory for grader execution (where vitest and its
    /// node_modules live).
    pub grader_workdir: PathBuf,

    /// Per-stage subprocess timeout in seconds (0 = unbounded).
    pub stage_timeout_secs: u64,

    /// How long to wait for a provisioned backend to answer its health
    /// endpoint.
    pub ready_timeout_secs: u64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("/tmp/backdiff"),
            admin_key: DEFAULT_ADMIN_KEY.to_string(),
            backend_binary: PathBuf::from("convex-local-backend"),
            bun_binary: "bun".to_string(),
            bunx_binary: "bunx".to_string(),
            eslint_config: PathBuf::from("eslint.config.mjs"),
            grader_workdir: PathBuf::from("."),
            stage_timeout_secs: 300,
            ready_timeout_secs: 30,
        }
    }
}

impl EvalConfig {
    /// Create a config with the given scratch root and defaults elsewhere.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    /// Candidate project directory for (model, task).
    pub fn candidate_project_dir(&self, model: &str, meta: &TaskMeta) -> PathBuf {
        self.keyed(model, meta, "output")
    }

    /// Reference project directory for (model, task). Distinct root from
    /// the candidate's.
    pub fn reference_project_dir(&self, model: &str, meta: &TaskMeta) -> PathBuf {
        self.keyed(model, meta, "answer")
    }

    /// Candidate backend (sandbox) working directory for (model, task).
    pub fn candidate_backend_dir(&self, model: &str, meta: &TaskMeta) -> PathBuf {
        self.keyed(model, meta, "backends/output")
    }

    /// Reference backend (sandbox) working directory for (model, task).
    pub fn reference_backend_dir(&self, model: &str, meta: &TaskMeta) -> PathBuf {
        self.keyed(model, meta, "backends/answer")
    }

    fn keyed(&self, model: &str, meta: &TaskMeta, role: &str) -> PathBuf {
        self.output_root
            .join(role)
            .join(model)
            .join(meta.keyed_path())
    }
}

/// Assert the four per-evaluation directories are pairwise distinct.
/// Violation would let candidate and reference trample each other.
pub fn assert_disjoint_dirs(config: &EvalConfig, model: &str, meta: &TaskMeta) -> bool {
    let dirs = [
        config.candidate_project_dir(model, meta),
        config.reference_project_dir(model, meta),
        config.candidate_backend_dir(model, meta),
        config.reference_backend_dir(model, meta),
    ];
    for (i, a) in dirs.iter().enumerate() {
        for b in dirs.iter().skip(i + 1) {
            if a == b || a.starts_with(b) || b.starts_with(a) {
                return false;
            }
        }
    }
    true
}

/// Make a path absolute relative to the current directory, without
/// touching the filesystem.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
