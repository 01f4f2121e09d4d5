//! Candidate artifact: a proposed solution as a named file set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A candidate's proposed solution: relative path -> file content.
///
/// Produced by a code-generation collaborator and consumed exactly once
/// by the materializer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    /// File entries, keyed by path relative to the project root.
    pub files: BTreeMap<String, String>,
}

impl Artifact {
    /// Create an empty artifact.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file entry.
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Number of file entries.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the artifact has no entries.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Deterministic SHA-256 digest over ordered (path, content) pairs.
    ///
    /// Stable across identical artifacts, used to key diagnostics and
    /// report records.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, content) in &self.files {
            hasher.update(path.as_bytes());
            hasher.update(b"\0");
            hasher.update(content.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }
}

impl FromIterator<(String, String)> for Artifact {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
