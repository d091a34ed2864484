//! Ledger CLI subcommands for inspecting exported decision ledgers.
//!
//! Provides commands to:
//! - `show`: Replay a run's ledger with per-status counts
//! - `list`: List runs in the ledger directory

use anyhow::{Context, Result};
use clap::Subcommand;
use uuid::Uuid;

use crate::domain::MatchStatus;
use crate::ledger::{summarize, LedgerStore};

/// Ledger-related subcommands
#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// Replay and summarize a run's ledger
    Show {
        /// Run ID (UUID)
        run_id: String,

        /// Only show decisions for this document
        #[arg(short, long)]
        document: Option<String>,
    },

    /// List runs with an exported ledger
    List,
}

pub fn execute_show(run_id_str: &str, document: Option<&str>) -> Result<()> {
    let run_id = Uuid::parse_str(run_id_str)
        .with_context(|| format!("Invalid run ID: {}", run_id_str))?;

    let dir = crate::config::ledger_dir()?;
    let run_dir = dir.join(run_id.to_string());
    if !run_dir.join("ledger.jsonl").exists() {
        anyhow::bail!("No ledger for run {} in {}", run_id, dir.display());
    }
    let store = LedgerStore::open(&dir, run_id)?;

    let entries = match document {
        Some(doc) => store.document_entries(doc)?,
        None => store.replay()?,
    };

    println!("Run: {}", run_id);
    println!("Ledger: {}", store.ledger_path().display());
    println!();
    println!("{:<18} {:<24} {:>5} {:<19}", "ENTRY", "DOCUMENT", "#", "STATUS");
    println!("{}", "-".repeat(70));
    for entry in &entries {
        println!(
            "{:<18} {:<24} {:>5} {:<19}",
            entry.id,
            entry.document_id,
            entry.index,
            entry.decision.status.as_str()
        );
    }

    // Counts cover only the rows listed above
    let summary = summarize(&entries);
    println!();
    for status in MatchStatus::all() {
        println!("{:<19} {}", status.as_str(), summary.get(status));
    }
    println!("{:<19} {}", "TOTAL", summary.total());

    Ok(())
}

pub fn execute_list() -> Result<()> {
    let dir = crate::config::ledger_dir()?;
    let runs = LedgerStore::list_runs(&dir)?;

    if runs.is_empty() {
        println!("No ledgers found in {}", dir.display());
        return Ok(());
    }

    println!("{:<38} {:>9}", "RUN ID", "DECISIONS");
    println!("{}", "-".repeat(48));
    for run_id in runs {
        let store = LedgerStore::open(&dir, run_id)?;
        println!("{:<38} {:>9}", run_id, store.summary()?.total());
    }

    Ok(())
}
