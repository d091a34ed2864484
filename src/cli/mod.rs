//! Command-line interface for spanjudge.
//!
//! Provides commands for scoring a single document, scoring a dataset of
//! documents, inspecting pair similarities, and replaying exported ledgers.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{CommandJudge, JudgeBackend, OpenAiJudge};
use crate::config::{self, JudgeBackendKind, JudgeSettings, ResolvedConfig};
use crate::core::{BatchOptions, Evaluation, EvaluationMode, Evaluator};
use crate::dataset::{load_annotations, load_documents};
use crate::domain::MatchStatus;
use crate::ledger::LedgerStore;
use crate::report::BatchSummary;
use crate::text::{containment, jaccard, labels_compatible, token_f1};

pub mod ledger;

/// Fabric pattern used by the command judge when no command is configured
pub const DEFAULT_FABRIC_PATTERN: &str = "judge_span";

/// spanjudge - Annotation span matching and scoring
#[derive(Parser, Debug)]
#[command(name = "spanjudge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score one prediction file against one ground-truth file
    Evaluate {
        /// Ground-truth annotations (JSON or JSONL)
        #[arg(short, long)]
        ground_truth: PathBuf,

        /// Predicted annotations (JSON, JSONL, or raw model output)
        #[arg(short, long)]
        predictions: PathBuf,

        /// Evaluation mode (judged when a judge is configured, else strict)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Export the decision ledger
        #[arg(long)]
        ledger: bool,

        /// Document ID used in the exported ledger
        #[arg(long, default_value = "document")]
        document_id: String,

        /// Print the evaluation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score every document of a dataset and print averaged metrics
    Batch {
        /// Dataset of documents (JSON or JSONL)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Evaluation mode (judged when a judge is configured, else strict)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Maximum number of documents to score
        #[arg(short, long)]
        limit: Option<usize>,

        /// Document IDs to skip (comma-separated)
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Export the decision ledgers
        #[arg(long)]
        ledger: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show similarity scores for a pair of spans
    Score {
        /// Predicted span
        prediction: String,

        /// Reference span
        reference: String,

        /// Label of the prediction
        #[arg(long)]
        label_a: Option<String>,

        /// Label of the reference
        #[arg(long)]
        label_b: Option<String>,
    },

    /// Inspect exported decision ledgers
    Ledger {
        #[command(subcommand)]
        command: ledger::LedgerCommands,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Evaluation mode for CLI (maps to EvaluationMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Containment ladder with judge escalation
    Judged,

    /// Deterministic token-F1 / Jaccard matching
    Strict,
}

impl From<ModeArg> for EvaluationMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Judged => EvaluationMode::Judged,
            ModeArg::Strict => EvaluationMode::Strict,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Evaluate {
                ground_truth,
                predictions,
                mode,
                ledger,
                document_id,
                json,
            } => {
                evaluate_pair(&ground_truth, &predictions, mode, ledger, &document_id, json).await
            }
            Commands::Batch {
                dataset,
                mode,
                limit,
                ignore,
                ledger,
                json,
            } => {
                let options = BatchOptions {
                    limit,
                    ignore: ignore.into_iter().map(|s| s.trim().to_string()).collect(),
                };
                evaluate_batch(&dataset, mode, options, ledger, json).await
            }
            Commands::Score {
                prediction,
                reference,
                label_a,
                label_b,
            } => {
                show_scores(&prediction, &reference, label_a.as_deref(), label_b.as_deref());
                Ok(())
            }
            Commands::Ledger { command } => execute_ledger(command).await,
            Commands::Config => show_config(),
        }
    }
}

/// Execute ledger subcommands
async fn execute_ledger(command: ledger::LedgerCommands) -> Result<()> {
    match command {
        ledger::LedgerCommands::Show { run_id, document } => {
            ledger::execute_show(&run_id, document.as_deref())
        }
        ledger::LedgerCommands::List => ledger::execute_list(),
    }
}

/// Build the configured judge backend, if any
pub fn build_backend(settings: &JudgeSettings) -> Result<Option<Arc<dyn JudgeBackend>>> {
    match settings.backend {
        JudgeBackendKind::None => Ok(None),
        JudgeBackendKind::OpenAi => {
            let judge = OpenAiJudge::from_env(&settings.model, settings.timeout())
                .context("Failed to create OpenAI-compatible judge")?;
            Ok(Some(Arc::new(judge)))
        }
        JudgeBackendKind::Command => {
            // Without an explicit command line, use the Fabric judging pattern
            let judge = match settings.command {
                Some(ref command_line) => CommandJudge::from_command_line(command_line)?,
                None => CommandJudge::fabric(DEFAULT_FABRIC_PATTERN),
            };
            Ok(Some(Arc::new(judge.with_timeout(settings.timeout()))))
        }
    }
}

/// Build an evaluator for the requested (or default) mode
async fn build_evaluator(cfg: &ResolvedConfig, mode: Option<ModeArg>) -> Result<Evaluator> {
    let backend = build_backend(&cfg.judge)?;

    let mode = match mode {
        Some(m) => m.into(),
        None if backend.is_some() => EvaluationMode::Judged,
        None => EvaluationMode::Strict,
    };

    match mode {
        EvaluationMode::Judged => {
            let Some(backend) = backend else {
                bail!(
                    "Judged mode needs a judge backend. Set judge.backend in .spanjudge/config.yaml or {}",
                    config::JUDGE_BACKEND_ENV
                );
            };
            if let Err(e) = backend.health_check().await {
                warn!(backend = backend.name(), error = %e, "Judge health check failed");
            }
            info!(backend = backend.name(), "Using judged evaluation");
            Ok(Evaluator::judged(backend, cfg.matching.clone())?)
        }
        EvaluationMode::Strict => {
            info!(similarity = cfg.strict.similarity.as_str(), "Using strict evaluation");
            Ok(Evaluator::strict(cfg.strict.clone())?)
        }
    }
}

/// Score one document
async fn evaluate_pair(
    ground_truth: &Path,
    predictions: &Path,
    mode: Option<ModeArg>,
    export_ledger: bool,
    document_id: &str,
    json: bool,
) -> Result<()> {
    let cfg = config::config()?;

    let references = load_annotations(ground_truth)?;
    let predicted = load_annotations(predictions)?;

    let mut evaluator = build_evaluator(cfg, mode).await?;
    let evaluation = evaluator.evaluate(&references, &predicted).await;

    if export_ledger {
        let store = LedgerStore::open(&cfg.ledger_dir, Uuid::new_v4())?;
        store.append_ledger(document_id, &evaluation.decisions)?;
        eprintln!("[Ledger {} written to {}]", store.run_id(), store.ledger_path().display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print_evaluation(&evaluation);
    }

    Ok(())
}

/// Score a dataset with one evaluator
async fn evaluate_batch(
    dataset: &Path,
    mode: Option<ModeArg>,
    options: BatchOptions,
    export_ledger: bool,
    json: bool,
) -> Result<()> {
    let cfg = config::config()?;

    let documents = load_documents(dataset)?;
    if documents.is_empty() {
        bail!("Dataset {} contains no documents", dataset.display());
    }

    let mut evaluator = build_evaluator(cfg, mode).await?;
    let results = evaluator.evaluate_documents(&documents, &options).await;

    if export_ledger {
        let store = LedgerStore::open(&cfg.ledger_dir, Uuid::new_v4())?;
        for result in &results {
            store.append_ledger(&result.document_id, &result.evaluation.decisions)?;
        }
        eprintln!("[Ledger {} written to {}]", store.run_id(), store.ledger_path().display());
    }

    let summary = BatchSummary::new(evaluator.mode(), &results, evaluator.cache_stats());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{:<24} {:>9} {:>9} {:>9}", "DOCUMENT", "PRECISION", "RECALL", "F1");
        println!("{}", "-".repeat(54));
        for result in &results {
            let m = result.evaluation.metrics;
            println!(
                "{:<24} {:>9.3} {:>9.3} {:>9.3}",
                result.document_id, m.precision, m.recall, m.f1
            );
        }
        println!();
        print!("{}", summary);
    }

    Ok(())
}

fn print_evaluation(evaluation: &Evaluation) {
    let colored = std::io::stdout().is_terminal();

    for (i, decision) in evaluation.decisions.iter().enumerate() {
        let status = decision.status.as_str();
        let status = if colored {
            let code = match decision.status {
                MatchStatus::Wrong => "31",
                MatchStatus::CorrectAi => "33",
                _ => "32",
            };
            format!("\x1b[{}m{:<19}\x1b[0m", code, status)
        } else {
            format!("{:<19}", status)
        };

        println!("{:>3}. {} [{}] {}", i + 1, status, decision.label, truncate(&decision.text, 80));
        for m in &decision.matches {
            println!("       -> #{} {}", m.index, truncate(&m.text, 80));
        }
        if let (Some(closest), Some(score)) = (&decision.closest_match, decision.closest_score) {
            println!("       closest ({:.2}): {}", score, truncate(closest, 70));
        }
        if let Some(ref rationale) = decision.rationale {
            println!("       why: {}", truncate(rationale, 100));
        }
    }

    if !evaluation.unmatched.is_empty() {
        println!("\nUnmatched references:");
        for reference in &evaluation.unmatched {
            println!("  [{}] {}", reference.label, truncate(&reference.text, 80));
        }
    }

    println!("\n{}", evaluation.metrics.rounded());
    if let Some(counts) = evaluation.counts {
        println!(
            "TP={} FP={} FN={}",
            counts.true_positives, counts.false_positives, counts.false_negatives
        );
    }
}

fn show_scores(prediction: &str, reference: &str, label_a: Option<&str>, label_b: Option<&str>) {
    println!("Containment (reference in prediction): {:.3}", containment(prediction, reference));
    println!("Containment (prediction in reference): {:.3}", containment(reference, prediction));
    println!("Token F1:                              {:.3}", token_f1(prediction, reference));
    println!("Jaccard:                               {:.3}", jaccard(prediction, reference));
    if let (Some(a), Some(b)) = (label_a, label_b) {
        println!("Labels compatible:                     {}", labels_compatible(a, b));
    }
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("spanjudge configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", cfg.home.display());
    println!("  Ledgers: {}", cfg.ledger_dir.display());
    println!();
    println!("Matching:");
    println!("  Containment accept: {}", cfg.matching.containment_accept);
    println!("  Escalate above:     {}", cfg.matching.escalate_above);
    println!("  Report floor:       {}", cfg.matching.report_floor);
    println!();
    println!("Judge:");
    println!("  Backend:   {:?}", cfg.judge.backend);
    println!("  Model:     {}", cfg.judge.model);
    println!("  Threshold: {}", cfg.matching.judge_threshold);
    println!("  Timeout:   {}s", cfg.judge.timeout_seconds);
    if let Some(ref command) = cfg.judge.command {
        println!("  Command:   {}", command);
    }
    println!();
    println!("Strict:");
    println!("  Similarity: {}", cfg.strict.similarity.as_str());
    println!("  Threshold:  {}", cfg.strict.effective_threshold());

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
