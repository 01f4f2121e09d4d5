//! Candidate artifact sources.
//!
//! The code-generation collaborator is behind an async trait so the
//! orchestrator never depends on a concrete model client. The shipped
//! implementation reads pre-generated artifacts from disk, which is how
//! batch runs hand generated file sets to the harness.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use backdiff_core::domain::{Artifact, EvalError, Result, Task};

/// External collaborator producing a candidate artifact for a task.
#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    /// Generate (or fetch) the candidate file set for a task description.
    async fn generate(&self, task: &Task) -> Result<Artifact>;
}

/// Artifact source backed by a directory of pre-generated candidates,
/// laid out as `<root>/<category>/<name>/...` file trees.
#[derive(Debug, Clone)]
pub struct DirArtifactSource {
    root: PathBuf,
}

impl DirArtifactSource {
    /// Create a source rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CandidateGenerator for DirArtifactSource {
    async fn generate(&self, task: &Task) -> Result<Artifact> {
        let dir = self.root.join(task.meta.keyed_path());
        if !dir.is_dir() {
            return Err(EvalError::Generation(format!(
                "no candidate directory for task {} under {:?}",
                task.meta, self.root
            )));
        }

        let mut files = Vec::new();
        collect_files(&dir, &dir, &mut files)?;
        if files.is_empty() {
            return Err(EvalError::Generation(format!(
                "candidate directory for task {} is empty",
                task.meta
            )));
        }
        Ok(files.into_iter().collect())
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, String)>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if path.is_dir() {
            if name == "node_modules" || name == "_generated" {
                continue;
            }
            collect_files(root, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .map_err(|_| {
                    EvalError::Generation(format!("candidate file {path:?} outside {root:?}"))
                })?
                .to_string_lossy()
                .into_owned();
            let content = std::fs::read_to_string(&path)?;
            out.push((relative, content));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdiff_core::domain::TaskMeta;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn task() -> Task {
        Task {
            meta: TaskMeta::new("data", "chess"),
            description: "desc".to_string(),
            answer: BTreeMap::new(),
            answer_dir: PathBuf::from("/corpus/data/chess/answer"),
            grader_path: PathBuf::from("/corpus/data/chess/grader.test.ts"),
        }
    }

    #[tokio::test]
    async fn test_dir_source_reads_candidate_tree() {
        let root = TempDir::new().unwrap();
        let candidate = root.path().join("data/chess/convex");
        std::fs::create_dir_all(&candidate).unwrap();
        std::fs::write(candidate.join("index.ts"), "export const x = 1;").unwrap();

        let artifact = DirArtifactSource::new(root.path())
            .generate(&task())
            .await
            .expect("generate failed");
        assert_eq!(artifact.len(), 1);
        assert_eq!(artifact.files["convex/index.ts"], "export const x = 1;");
    }

    #[tokio::test]
    async fn test_dir_source_missing_candidate() {
        let root = TempDir::new().unwrap();
        let err = DirArtifactSource::new(root.path())
            .generate(&task())
            .await
            .expect_err("generate succeeded");
        assert!(matches!(err, EvalError::Generation(_)));
    }

    #[tokio::test]
    async fn test_dir_source_skips_generated_dirs() {
        let root = TempDir::new().unwrap();
        let candidate = root.path().join("data/chess");
        std::fs::create_dir_all(candidate.join("convex/_generated")).unwrap();
        std::fs::create_dir_all(candidate.join("node_modules/dep")).unwrap();
        std::fs::write(candidate.join("convex/index.ts"), "x").unwrap();
        std::fs::write(candidate.join("convex/_generated/api.ts"), "gen").unwrap();
        std::fs::write(candidate.join("node_modules/dep/i.ts"), "dep").unwrap();

        let artifact = DirArtifactSource::new(root.path())
            .generate(&task())
            .await
            .expect("generate failed");
        assert_eq!(artifact.len(), 1);
    }
}
