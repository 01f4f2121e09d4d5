//! Artifact materialization with path containment.
//!
//! Writes a candidate file set into an isolated project root. Every
//! relative path is resolved lexically before any write: `..` escapes,
//! absolute paths, and prefix components are containment violations.
//! Candidate paths name files that do not exist yet, so resolution
//! cannot rely on `canonicalize`.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::domain::{Artifact, EvalError, Result};

/// Lexically resolve `relative` under `root`, rejecting any path that
/// escapes the root.
pub fn resolve_contained(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut resolved = root.to_path_buf();
    let mut depth: usize = 0;

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(EvalError::Containment {
                        root: root.to_path_buf(),
                        path: relative.to_string(),
                    });
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(EvalError::Containment {
                    root: root.to_path_buf(),
                    path: relative.to_string(),
                });
            }
        }
    }

    if depth == 0 {
        // Resolved back to the root itself; nothing to write there.
        return Err(EvalError::Containment {
            root: root.to_path_buf(),
            path: relative.to_string(),
        });
    }

    Ok(resolved)
}

/// Write each artifact entry as a file under `root`, creating
/// intermediate directories as needed.
///
/// This is the single **hard** stage of the pipeline: a containment
/// violation terminates the evaluation and nothing written so far may be
/// trusted by the caller. Files already written before the violating
/// entry are not rolled back.
pub fn write_artifact(root: &Path, artifact: &Artifact) -> Result<()> {
    for (relative, content) in &artifact.files {
        let destination = resolve_contained(root, relative)?;

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&destination, content)?;
        debug!(path = %destination.display(), bytes = content.len(), "materialized file");
    }
    Ok(())
}
