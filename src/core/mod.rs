//! Matching and scoring engine.
//!
//! This module contains:
//! - Policy: Decision thresholds and validation
//! - Judge: Cached, fault-contained semantic judge
//! - Pipeline: Tiered containment/substring/judge ladder
//! - Aggregate: Precision/recall/F1 and unmatched references
//! - Strict: Deterministic one-to-one evaluator
//! - Evaluator: Entry point owning the engine and judge cache

pub mod aggregate;
pub mod evaluator;
pub mod judge;
pub mod pipeline;
pub mod policy;
pub mod strict;

// Re-export commonly used types
pub use aggregate::{aggregate, unmatched_references, Aggregate};
pub use evaluator::{BatchOptions, DocumentEvaluation, Evaluation, EvaluationMode, Evaluator};
pub use judge::{CacheKey, CacheStats, JudgeCache, JudgeVerdict, SemanticJudge};
pub use pipeline::{MatchingPipeline, PairScores, PipelineOutput, Tier};
pub use policy::{MatchPolicy, PolicyViolation, StrictPolicy};
pub use strict::{StrictEvaluator, StrictOutput};
