//! End-to-end evaluation tests with the fake sandbox provisioner.

use std::collections::BTreeMap;

use backdiff_core::domain::{Artifact, EvalError, Task, TaskMeta};
use backdiff_eval::fakes::{FailingProvisioner, FakeProvisioner};
use backdiff_eval::{EvalConfig, Evaluator, FILESYSTEM_STAGE_LABEL};
use tempfile::TempDir;

fn sample_task(root: &std::path::Path) -> Task {
    let grader_path = root.join("grader.test.ts");
    std::fs::write(&grader_path, "// grader").unwrap();

    let answer_dir = root.join("corpus-answer");
    std::fs::create_dir_all(answer_dir.join("convex")).unwrap();
    std::fs::write(answer_dir.join("package.json"), "{}").unwrap();
    std::fs::write(
        answer_dir.join("convex/index.ts"),
        "export const x = 1;\n",
    )
    .unwrap();

    let mut answer = BTreeMap::new();
    answer.insert("package.json".to_string(), "{}".to_string());
    answer.insert(
        "convex/index.ts".to_string(),
        "export const x = 1;".to_string(),
    );
    Task {
        meta: TaskMeta::new("data", "chess"),
        description: "Build a chess backend".to_string(),
        answer,
        answer_dir,
        grader_path,
    }
}

/// Config whose stage binaries are stubs: `true` makes every subprocess
/// stage pass, `false` makes it fail.
fn stub_config(root: &std::path::Path, bun: &str, bunx: &str) -> EvalConfig {
    EvalConfig {
        bun_binary: bun.to_string(),
        bunx_binary: bunx.to_string(),
        grader_workdir: std::env::temp_dir(),
        ..EvalConfig::new(root)
    }
}

/// Scenario: a well-formed single-file artifact materializes, passes the
/// full pipeline, and lands on disk byte-exact.
#[tokio::test]
async fn test_successful_evaluation_end_to_end() {
    let root = TempDir::new().unwrap();
    let task = sample_task(root.path());
    let config = stub_config(root.path(), "true", "true");
    let provisioner = FakeProvisioner::new();
    let evaluator = Evaluator::new(config.clone(), provisioner);

    let artifact = Artifact::new().with_file("convex/index.ts", "export const x = 1;");
    let record = evaluator
        .evaluate("gpt-4o", &task, &artifact)
        .await
        .expect("evaluation failed");

    // Hard stage + 5 candidate soft stages + differential test.
    assert_eq!(record.scores.len(), 7);
    assert_eq!(record.scores.passed_count(), 7);
    assert_eq!(
        record.scores.get(FILESYSTEM_STAGE_LABEL).unwrap().value,
        1
    );
    assert_eq!(record.scores.get("Tests pass").unwrap().value, 1);

    // Round-trip: the materialized file equals the artifact content.
    let written = config
        .candidate_project_dir("gpt-4o", &task.meta)
        .join("convex/index.ts");
    assert_eq!(
        std::fs::read_to_string(written).unwrap(),
        "export const x = 1;"
    );
}

/// Scenario: a path escaping the project root yields exactly one score
/// entry and provisions no sandbox.
#[tokio::test]
async fn test_containment_violation_scores_single_entry() {
    let root = TempDir::new().unwrap();
    let task = sample_task(root.path());
    let provisioner = FakeProvisioner::new();
    let evaluator = Evaluator::new(stub_config(root.path(), "true", "true"), provisioner);

    let artifact = Artifact::new().with_file("../escape.ts", "bad");
    let record = evaluator
        .evaluate("gpt-4o", &task, &artifact)
        .await
        .expect("evaluation failed");

    assert_eq!(
        record.scores.as_pairs(),
        vec![(FILESYSTEM_STAGE_LABEL.to_string(), 0)]
    );
}

/// No sandbox is ever provisioned when materialization fails.
#[tokio::test]
async fn test_containment_violation_provisions_no_sandbox() {
    let root = TempDir::new().unwrap();
    let task = sample_task(root.path());
    let provisioner = FakeProvisioner::new();
    let counters = FakeProvisionerCounters::of(&provisioner);
    let evaluator = Evaluator::new(stub_config(root.path(), "true", "true"), provisioner);

    let artifact = Artifact::new().with_file("../escape.ts", "bad");
    evaluator
        .evaluate("gpt-4o", &task, &artifact)
        .await
        .expect("evaluation failed");

    assert_eq!(counters.acquired(), 0, "no sandbox after hard failure");
}

/// Exactly one sandbox per role, both released by the time evaluate
/// returns.
#[tokio::test]
async fn test_sandbox_lifecycle_counts() {
    let root = TempDir::new().unwrap();
    let task = sample_task(root.path());
    let config = stub_config(root.path(), "true", "true");
    let provisioner = FakeProvisioner::new();

    // Keep handles to the shared counters before moving the provisioner.
    let counters = FakeProvisionerCounters::of(&provisioner);
    let evaluator = Evaluator::new(config, provisioner);

    let artifact = Artifact::new().with_file("convex/index.ts", "export const x = 1;");
    evaluator
        .evaluate("gpt-4o", &task, &artifact)
        .await
        .expect("evaluation failed");

    assert_eq!(counters.acquired(), 2, "one sandbox per role");
    assert_eq!(counters.released(), 2, "both sandboxes released");
}

/// Reference preparation failure aborts the evaluation with a raised
/// error, not a zero score — and the partial score vector is preserved.
#[tokio::test]
async fn test_reference_failure_aborts_with_partial_scores() {
    let root = TempDir::new().unwrap();
    let task = sample_task(root.path());
    // bun fails: the candidate's dependency stage is scored 0, but the
    // reference's dependency stage is fatal.
    let config = stub_config(root.path(), "false", "true");
    let provisioner = FakeProvisioner::new();
    let counters = FakeProvisionerCounters::of(&provisioner);
    let evaluator = Evaluator::new(config, provisioner);

    let artifact = Artifact::new().with_file("convex/index.ts", "export const x = 1;");
    let failure = evaluator
        .evaluate("gpt-4o", &task, &artifact)
        .await
        .expect_err("evaluation succeeded");

    assert!(matches!(
        failure.error,
        EvalError::ReferenceEnvironment { .. }
    ));

    // Partial vector: materialization + 5 candidate soft stages, no
    // differential-test entry.
    assert_eq!(failure.partial.len(), 6);
    assert!(failure.partial.get("Tests pass").is_none());
    let deps = failure.partial.get("`bun install` succeeds").unwrap();
    assert_eq!(deps.value, 0, "candidate dep failure is scored, not fatal");

    // The candidate sandbox was acquired and released even though the
    // error propagated out of the reference path.
    assert_eq!(counters.acquired(), 1);
    assert_eq!(counters.released(), 1);
}

/// A sandbox provisioning outage is fatal, but every pre-deploy soft
/// stage has already contributed its score entry by then.
#[tokio::test]
async fn test_provisioner_failure_keeps_pre_deploy_scores() {
    let root = TempDir::new().unwrap();
    let task = sample_task(root.path());
    let evaluator = Evaluator::new(stub_config(root.path(), "true", "true"), FailingProvisioner);

    let artifact = Artifact::new().with_file("convex/index.ts", "export const x = 1;");
    let failure = evaluator
        .evaluate("gpt-4o", &task, &artifact)
        .await
        .expect_err("evaluation succeeded without a sandbox");

    assert!(matches!(
        failure.error,
        EvalError::SandboxUnavailable { .. }
    ));
    assert_eq!(
        failure.partial.as_pairs(),
        vec![
            (FILESYSTEM_STAGE_LABEL.to_string(), 1),
            ("`bun install` succeeds".to_string(), 1),
            ("`convex codegen` succeeds".to_string(), 1),
            ("Passes tsc".to_string(), 1),
            ("Passes eslint".to_string(), 1),
        ]
    );
}

/// An empty artifact materializes successfully (zero files) and every
/// soft stage still runs and contributes an entry.
#[tokio::test]
async fn test_empty_artifact_scores_all_soft_stages() {
    let root = TempDir::new().unwrap();
    let task = sample_task(root.path());
    // Nothing to install or generate: all subprocess stages fail.
    let config = stub_config(root.path(), "false", "false");
    let provisioner = FakeProvisioner::new();
    let evaluator = Evaluator::new(config, provisioner);

    let failure = evaluator
        .evaluate("gpt-4o", &task, &Artifact::new())
        .await
        .expect_err("reference should fail with stub binaries");

    let partial = &failure.partial;
    assert_eq!(partial.len(), 6);
    assert_eq!(partial.get(FILESYSTEM_STAGE_LABEL).unwrap().value, 1);
    assert_eq!(partial.failed_count(), 5, "every soft stage failed");
}

/// A generator error surfaces as a fatal failure with an empty partial
/// vector.
#[tokio::test]
async fn test_generator_failure_has_empty_partial() {
    use backdiff_eval::DirArtifactSource;

    let root = TempDir::new().unwrap();
    let task = sample_task(root.path());
    let evaluator = Evaluator::new(
        stub_config(root.path(), "true", "true"),
        FakeProvisioner::new(),
    );

    let empty_source = DirArtifactSource::new(root.path().join("no-candidates"));
    let failure = evaluator
        .evaluate_generated("gpt-4o", &task, &empty_source)
        .await
        .expect_err("generation succeeded");

    assert!(failure.partial.is_empty());
    assert!(matches!(failure.error, EvalError::Generation(_)));
}

/// Shared-counter view over a `FakeProvisioner` that survives moving the
/// provisioner into the evaluator.
struct FakeProvisionerCounters {
    acquired: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    released: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl FakeProvisionerCounters {
    fn of(provisioner: &FakeProvisioner) -> Self {
        Self {
            acquired: provisioner.acquired_counter(),
            released: provisioner.released_counter(),
        }
    }

    fn acquired(&self) -> usize {
        self.acquired.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn released(&self) -> usize {
        self.released.load(std::sync::atomic::Ordering::SeqCst)
    }
}
