//! Metrics over a document's decisions.

use std::collections::BTreeSet;

use crate::domain::{Annotation, Metrics};
use crate::ledger::DecisionLedger;

/// Metrics plus the references no prediction matched
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub metrics: Metrics,
    pub unmatched: Vec<Annotation>,
}

/// Compute precision, recall and F1 from a decision ledger.
///
/// Precision counts accepted predictions; recall counts distinct matched
/// references, so one prediction covering two references lifts recall twice
/// and two predictions on the same reference lift it once.
pub fn aggregate(
    references: &[Annotation],
    decisions: &DecisionLedger,
    matched: &BTreeSet<usize>,
) -> Aggregate {
    let unmatched = unmatched_references(references, matched);

    let metrics = if references.is_empty() && decisions.is_empty() {
        Metrics::perfect()
    } else if decisions.is_empty() {
        Metrics::zero()
    } else {
        let precision = decisions.true_positives() as f64 / decisions.len() as f64;
        let recall = if references.is_empty() {
            0.0
        } else {
            matched.iter().filter(|&&i| i < references.len()).count() as f64
                / references.len() as f64
        };
        Metrics::from_precision_recall(precision, recall)
    };

    Aggregate { metrics, unmatched }
}

/// References whose index is absent from `matched`, in original order
pub fn unmatched_references(references: &[Annotation], matched: &BTreeSet<usize>) -> Vec<Annotation> {
    references
        .iter()
        .enumerate()
        .filter(|(i, _)| !matched.contains(i))
        .map(|(_, r)| r.clone())
        .collect()
}
