//! spanjudge - Annotation span matching and scoring
//!
//! Decides whether machine-extracted text spans correspond to human-authored
//! reference spans, aggregates the decisions into precision/recall/F1, and
//! keeps a per-prediction ledger explaining every accept and reject.
//!
//! # Architecture
//!
//! Matching is a cost-aware ladder:
//! - Deterministic containment (reference inside prediction)
//! - Deterministic substring (prediction inside reference)
//! - Semantic judge for borderline pairs, memoized per evaluator
//!
//! A deterministic token-F1/Jaccard mode is available when no judge is
//! configured.
//!
//! # Modules
//!
//! - `text`: Normalization, label compatibility, similarity scorers
//! - `domain`: Data structures (Annotation, Decision, Metrics)
//! - `adapters`: Judge backends (OpenAI-compatible HTTP, subprocess)
//! - `core`: Matching pipeline, judge cache, aggregation, evaluator
//! - `ledger`: Decision ledger and JSONL export
//! - `dataset`: Document files and model-output parsing
//! - `report`: Batch averages
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Score one document
//! spanjudge evaluate --ground-truth gt.json --predictions pred.json
//!
//! # Score a dataset with the configured judge and export the ledger
//! spanjudge batch --dataset policies.jsonl --mode judged --ledger
//!
//! # Replay an exported ledger
//! spanjudge ledger show <run-id>
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod dataset;
pub mod domain;
pub mod ledger;
pub mod report;
pub mod text;

// Re-export main types at crate root for convenience
pub use adapters::{JudgeBackend, JudgeReply, JudgeRequest};
pub use core::{Evaluation, EvaluationMode, Evaluator, MatchPolicy, StrictPolicy};
pub use dataset::Document;
pub use domain::{Annotation, Decision, MatchStatus, Metrics};
pub use ledger::{DecisionLedger, LedgerStore};
