//! Task corpus records.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of a task within the corpus, discovered from the
/// `<corpus>/<category>/<name>/` directory structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskMeta {
    /// Task category (first-level corpus directory).
    pub category: String,

    /// Task name (second-level corpus directory).
    pub name: String,
}

impl TaskMeta {
    /// Create new task metadata.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    /// Relative keyed subpath for this task, e.g. `data/chess`.
    pub fn keyed_path(&self) -> PathBuf {
        PathBuf::from(&self.category).join(&self.name)
    }
}

impl std::fmt::Display for TaskMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// An immutable unit of evaluation work, loaded once per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Task identity.
    pub meta: TaskMeta,

    /// Natural-language description handed to the candidate generator.
    pub description: String,

    /// Trusted reference file mapping for expectation checks: relative
    /// path -> trimmed content. Not what gets deployed; see `answer_dir`.
    pub answer: BTreeMap<String, String>,

    /// Corpus directory holding the reference files verbatim.
    pub answer_dir: PathBuf,

    /// Absolute path to the differential test program for this task.
    pub grader_path: PathBuf,
}
