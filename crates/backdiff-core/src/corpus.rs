//! Task corpus loading with eager validation.
//!
//! The corpus is a directory tree of `<corpus>/<category>/<name>/`
//! entries, each holding a task description, a trusted reference answer,
//! and a differential grader program. Every required piece is validated
//! at load time so a malformed entry fails the run up front instead of
//! mid-pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{EvalError, Result, Task, TaskMeta};

/// Required task description file within each corpus entry.
pub const CORPUS_TASK_FILE: &str = "TASK.txt";

/// Required differential test program within each corpus entry.
pub const CORPUS_GRADER_FILE: &str = "grader.test.ts";

/// Subdirectory holding the trusted reference file set.
const CORPUS_ANSWER_DIR: &str = "answer";

/// Directories excluded when collecting reference answer files.
const SKIPPED_DIRS: [&str; 2] = ["node_modules", "_generated"];

/// Loads and validates the task corpus.
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    root: PathBuf,
}

impl CorpusLoader {
    /// Create a loader rooted at the given corpus directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Corpus root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load all tasks, sorted by (category, name).
    ///
    /// A missing description, answer directory, or grader in any entry is
    /// a load-time error for the whole corpus.
    pub fn load(&self) -> Result<Vec<Task>> {
        if !self.root.is_dir() {
            return Err(EvalError::Corpus {
                entry: self.root.display().to_string(),
                reason: "corpus root is not a directory".to_string(),
            });
        }

        let mut tasks = Vec::new();
        for category in sorted_subdirs(&self.root)? {
            let category_name = dir_name(&category);
            for entry in sorted_subdirs(&category)? {
                let meta = TaskMeta::new(&category_name, dir_name(&entry));
                tasks.push(self.load_entry(&entry, meta)?);
            }
        }

        debug!(count = tasks.len(), root = %self.root.display(), "loaded task corpus");
        Ok(tasks)
    }

    /// Load a single task entry by (category, name).
    pub fn load_task(&self, category: &str, name: &str) -> Result<Task> {
        let meta = TaskMeta::new(category, name);
        let dir = self.root.join(meta.keyed_path());
        if !dir.is_dir() {
            return Err(EvalError::Corpus {
                entry: meta.to_string(),
                reason: "no such corpus entry".to_string(),
            });
        }
        self.load_entry(&dir, meta)
    }

    fn load_entry(&self, dir: &Path, meta: TaskMeta) -> Result<Task> {
        let task_file = dir.join(CORPUS_TASK_FILE);
        let description = std::fs::read_to_string(&task_file).map_err(|_| EvalError::Corpus {
            entry: meta.to_string(),
            reason: format!("missing {CORPUS_TASK_FILE}"),
        })?;

        let answer_dir = dir.join(CORPUS_ANSWER_DIR);
        if !answer_dir.is_dir() {
            return Err(EvalError::Corpus {
                entry: meta.to_string(),
                reason: format!("missing {CORPUS_ANSWER_DIR}/ directory"),
            });
        }
        let answer = collect_answer_files(&answer_dir)?;
        if answer.is_empty() {
            return Err(EvalError::Corpus {
                entry: meta.to_string(),
                reason: "answer directory contains no source files".to_string(),
            });
        }

        let grader_path = dir.join(CORPUS_GRADER_FILE);
        if !grader_path.is_file() {
            return Err(EvalError::Corpus {
                entry: meta.to_string(),
                reason: format!("missing {CORPUS_GRADER_FILE}"),
            });
        }

        Ok(Task {
            meta,
            description,
            answer,
            answer_dir,
            grader_path,
        })
    }
}

/// Copy the reference file set from `answer_dir` into `dest` byte-exact,
/// with the same filtering as the loaded answer map. The trimmed
/// `Task::answer` map is for expectation checks only; anything run or
/// deployed must see the files verbatim.
pub fn copy_answer_files(answer_dir: &Path, dest: &Path) -> Result<usize> {
    let mut paths = Vec::new();
    walk_answer(answer_dir, &mut paths)?;

    let mut copied = 0;
    for path in &paths {
        let relative = match path.strip_prefix(answer_dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(path, &target)?;
        copied += 1;
    }
    Ok(copied)
}

/// Collect the reference file set under `answer_dir`: `package.json` and
/// `*.ts` files, skipping `node_modules` and `_generated`, with trimmed
/// contents keyed by relative path.
fn collect_answer_files(answer_dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut paths = Vec::new();
    walk_answer(answer_dir, &mut paths)?;

    let mut files = BTreeMap::new();
    for path in paths {
        let relative = match path.strip_prefix(answer_dir) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => continue,
        };
        let content = std::fs::read_to_string(&path)?;
        files.insert(relative, content.trim().to_string());
    }
    Ok(files)
}

fn walk_answer(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if path.is_dir() {
            if SKIPPED_DIRS.contains(&name.as_str()) {
                continue;
            }
            walk_answer(&path, out)?;
        } else if name == "package.json" || name.ends_with(".ts") {
            out.push(path);
        }
    }
    Ok(())
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
