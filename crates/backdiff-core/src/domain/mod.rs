//! Domain types for backdiff evaluations.

pub mod artifact;
pub mod error;
pub mod score;
pub mod task;

pub use artifact::Artifact;
pub use error::{EvalError, Result};
pub use score::{Score, ScoreVector, StageOutcome};
pub use task::{Task, TaskMeta};
