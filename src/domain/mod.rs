//! Domain types for span evaluation.
//!
//! This module contains the core data structures:
//! - Annotation: a labelled span, either reference or prediction
//! - Decision: the per-prediction outcome of matching
//! - Metrics: precision/recall/F1 records

pub mod annotation;
pub mod decision;
pub mod metrics;

// Re-export commonly used types
pub use annotation::{Annotation, LABEL_KEYS, TEXT_KEYS};
pub use decision::{Decision, MatchStatus, MatchedReference};
pub use metrics::{MatchCounts, Metrics};
