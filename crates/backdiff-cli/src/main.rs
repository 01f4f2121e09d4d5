//! backdiff - Differential evaluation harness CLI
//!
//! Evaluates AI-generated Convex backend artifacts against a trusted
//! task corpus.
//!
//! ## Commands
//!
//! - `run`: evaluate candidate artifacts for every corpus task
//! - `list`: show the loaded task corpus
//! - `score`: summarise a written score report

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};

use backdiff_core::reporting::{write_score_report_json, ScoreReportArtifact};
use backdiff_core::{init_tracing, CorpusLoader};
use backdiff_eval::{
    DirArtifactSource, EvalConfig, Evaluator, LocalBackend, DEFAULT_ADMIN_KEY,
};

#[derive(Parser)]
#[command(name = "backdiff")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Differential evaluation of AI-generated Convex backends", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate candidate artifacts for every task in the corpus
    Run {
        /// Candidate-generating model identifier
        #[arg(short, long)]
        model: String,

        /// Task corpus root directory
        #[arg(long, default_value = "evals")]
        corpus: PathBuf,

        /// Directory of pre-generated candidate artifacts
        /// (`<dir>/<category>/<name>/...`)
        #[arg(long)]
        candidates: PathBuf,

        /// Scratch root for project and backend directories
        #[arg(short, long, default_value = "/tmp/backdiff")]
        output: PathBuf,

        /// Local backend server binary
        #[arg(long, default_value = "convex-local-backend")]
        backend_binary: PathBuf,

        /// Administrative credential for deployments
        #[arg(long, env = "CONVEX_ADMIN_KEY", default_value = DEFAULT_ADMIN_KEY, hide_default_value = true)]
        admin_key: String,

        /// Lint configuration file
        #[arg(long, default_value = "eslint.config.mjs")]
        eslint_config: PathBuf,

        /// Working directory for grader execution
        #[arg(long, default_value = ".")]
        grader_workdir: PathBuf,

        /// Per-stage subprocess timeout in seconds
        #[arg(long, default_value_t = 300)]
        stage_timeout: u64,

        /// Only evaluate tasks in this category
        #[arg(long)]
        category: Option<String>,

        /// Only evaluate the task with this name
        #[arg(long)]
        task: Option<String>,
    },

    /// List the tasks in the corpus
    List {
        /// Task corpus root directory
        #[arg(long, default_value = "evals")]
        corpus: PathBuf,
    },

    /// Summarise a written score report
    Score {
        /// Path to a score report JSON file
        report: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            model,
            corpus,
            candidates,
            output,
            backend_binary,
            admin_key,
            eslint_config,
            grader_workdir,
            stage_timeout,
            category,
            task,
        } => {
            let mut config = EvalConfig::new(&output);
            config.admin_key = admin_key;
            config.backend_binary = backend_binary;
            config.eslint_config = eslint_config;
            config.grader_workdir = grader_workdir;
            config.stage_timeout_secs = stage_timeout;
            run_evals(&model, &corpus, &candidates, config, category, task).await
        }
        Commands::List { corpus } => list_tasks(&corpus),
        Commands::Score { report } => summarise_report(&report),
    }
}

async fn run_evals(
    model: &str,
    corpus: &Path,
    candidates: &Path,
    config: EvalConfig,
    category: Option<String>,
    task_name: Option<String>,
) -> Result<()> {
    let tasks = CorpusLoader::new(corpus)
        .load()
        .context("failed to load task corpus")?;
    let tasks: Vec<_> = tasks
        .into_iter()
        .filter(|t| category.as_deref().map_or(true, |c| t.meta.category == c))
        .filter(|t| task_name.as_deref().map_or(true, |n| t.meta.name == n))
        .collect();
    anyhow::ensure!(!tasks.is_empty(), "no corpus tasks match the given filters");

    std::fs::create_dir_all(&config.output_root)
        .with_context(|| format!("create {:?}", config.output_root))?;

    let provisioner = LocalBackend::new(
        config.backend_binary.clone(),
        config.admin_key.clone(),
        Duration::from_secs(config.ready_timeout_secs),
    );
    let source = DirArtifactSource::new(candidates);
    let report_root = config.output_root.join("reports").join(model);
    let evaluator = Evaluator::new(config, provisioner);

    let mut fatal_count = 0usize;
    for task in &tasks {
        info!(task = %task.meta, "evaluating");
        let report = match evaluator.evaluate_generated(model, task, &source).await {
            Ok(record) => ScoreReportArtifact::new(
                model,
                &task.meta,
                record.artifact_digest,
                &record.scores,
                None,
            ),
            Err(failure) => {
                error!(task = %task.meta, "evaluation aborted: {}", failure.error);
                fatal_count += 1;
                ScoreReportArtifact::new(
                    model,
                    &task.meta,
                    String::new(),
                    &failure.partial,
                    Some(failure.error.to_string()),
                )
            }
        };

        let path = report_root
            .join(task.meta.keyed_path())
            .with_extension("json");
        write_score_report_json(&path, &report)?;

        let (passed, total) = report.tally();
        println!("{}: {passed}/{total}", task.meta);
    }

    println!(
        "\nEvaluated {} task(s); reports under {}",
        tasks.len(),
        report_root.display()
    );
    anyhow::ensure!(
        fatal_count == 0,
        "{fatal_count} evaluation(s) aborted on infrastructure errors"
    );
    Ok(())
}

fn list_tasks(corpus: &Path) -> Result<()> {
    let tasks = CorpusLoader::new(corpus)
        .load()
        .context("failed to load task corpus")?;
    for task in &tasks {
        let first_line = task.description.lines().next().unwrap_or_default();
        println!(
            "{:<40} {:>3} answer file(s)  {}",
            task.meta.to_string(),
            task.answer.len(),
            first_line
        );
    }
    println!("\n{} task(s) in {}", tasks.len(), corpus.display());
    Ok(())
}

fn summarise_report(path: &Path) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read report {:?}", path))?;
    let report: ScoreReportArtifact =
        serde_json::from_str(&content).context("parse score report")?;

    println!("{} {}/{} ({})", report.model, report.category, report.task, report.eval_id);
    for entry in &report.scores {
        let mark = if entry.value == 1 { "pass" } else { "FAIL" };
        println!("  [{mark}] {}", entry.label);
    }
    if let Some(fatal) = &report.fatal {
        println!("  [fatal] {fatal}");
    }
    let (passed, total) = report.tally();
    println!("  {passed}/{total} stages passed");
    Ok(())
}
