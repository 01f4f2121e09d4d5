//! Subprocess stage execution.
//!
//! A stage's only failure signal is a non-zero exit status; its combined
//! stdout+stderr is the diagnostic payload. Spawn failures and timeouts
//! fold into a failed outcome rather than an error, so the caller decides
//! the policy (soft stages score the failure, the reference path treats
//! it as fatal).

use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::debug;

use backdiff_core::domain::StageOutcome;

use crate::stage::StageExec;

/// Result of one stage subprocess execution.
#[derive(Debug, Clone)]
pub struct StageRun {
    /// Stage label.
    pub label: String,

    /// Exit code (-1 when the process was killed or never spawned).
    pub exit_code: i32,

    /// Combined stdout+stderr.
    pub output: String,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Pass/fail outcome with diagnostic.
    pub outcome: StageOutcome,
}

impl StageRun {
    /// Whether the stage passed.
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }

    fn failed(label: &str, exit_code: i32, output: String, duration_ms: u64) -> Self {
        Self {
            label: label.to_string(),
            exit_code,
            outcome: StageOutcome::Failed {
                diagnostic: output.clone(),
            },
            output,
            duration_ms,
        }
    }
}

/// Stage runner executing one subprocess per invocation.
pub struct StageRunner;

impl StageRunner {
    /// Execute a stage and fold every failure mode into its outcome.
    pub async fn execute(exec: &StageExec) -> StageRun {
        let start = Instant::now();

        if exec.command.is_empty() {
            return StageRun::failed(&exec.label, -1, "empty stage command".to_string(), 0);
        }

        let program = &exec.command[0];
        let args = &exec.command[1..];

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&exec.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &exec.env {
            command.env(key, value);
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                return StageRun::failed(
                    &exec.label,
                    -1,
                    format!("failed to spawn '{program}': {e}"),
                    duration_ms,
                );
            }
        };

        let waited = if exec.timeout_secs > 0 {
            match tokio::time::timeout(
                std::time::Duration::from_secs(exec.timeout_secs),
                child.wait_with_output(),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    return StageRun::failed(
                        &exec.label,
                        -1,
                        format!(
                            "stage '{}' timed out after {} seconds",
                            exec.label, exec.timeout_secs
                        ),
                        duration_ms,
                    );
                }
            }
        } else {
            child.wait_with_output().await
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let output = match waited {
            Ok(output) => output,
            Err(e) => {
                return StageRun::failed(
                    &exec.label,
                    -1,
                    format!("failed to collect output: {e}"),
                    duration_ms,
                );
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        debug!(stage = %exec.label, exit_code, duration_ms, "stage finished");

        let outcome = if output.status.success() {
            StageOutcome::Passed
        } else {
            StageOutcome::Failed {
                diagnostic: combined.clone(),
            }
        };

        StageRun {
            label: exec.label.clone(),
            exit_code,
            output: combined,
            duration_ms,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(command: Vec<&str>) -> StageExec {
        StageExec::custom(
            "test_stage",
            command.into_iter().map(String::from).collect(),
            std::env::temp_dir(),
            60,
        )
    }

    #[tokio::test]
    async fn test_execute_passing_command() {
        let run = StageRunner::execute(&exec(vec!["echo", "hello"])).await;
        assert!(run.passed());
        assert_eq!(run.exit_code, 0);
        assert!(run.output.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let run = StageRunner::execute(&exec(vec!["false"])).await;
        assert!(!run.passed());
        assert_ne!(run.exit_code, 0);
    }

    #[tokio::test]
    async fn test_stderr_merged_into_diagnostic() {
        let run = StageRunner::execute(&exec(vec![
            "sh",
            "-c",
            "echo out; echo err >&2; exit 3",
        ]))
        .await;
        assert_eq!(run.exit_code, 3);
        assert!(run.output.contains("out"));
        assert!(run.output.contains("err"));
        assert!(run.outcome.diagnostic().unwrap().contains("err"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_failed_outcome() {
        let run = StageRunner::execute(&exec(vec!["definitely-not-a-binary-xyz"])).await;
        assert!(!run.passed());
        assert_eq!(run.exit_code, -1);
        assert!(run.output.contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_timeout_is_failed_outcome() {
        let mut stage = exec(vec!["sleep", "5"]);
        stage.timeout_secs = 1;
        let run = StageRunner::execute(&stage).await;
        assert!(!run.passed());
        assert!(run.output.contains("timed out"));
    }

    #[tokio::test]
    async fn test_env_passed_to_subprocess() {
        let mut stage = exec(vec!["sh", "-c", "echo $BACKDIFF_TEST_VAR"]);
        stage.env = vec![("BACKDIFF_TEST_VAR".into(), "42".into())];
        let run = StageRunner::execute(&stage).await;
        assert!(run.passed());
        assert!(run.output.contains("42"));
    }
}
