//! Batch summaries.
//!
//! Documents whose metrics are all zero are treated as failed runs (for
//! example an unparsable model response) and left out of the averages so
//! they do not drag down every model equally.

use serde::{Deserialize, Serialize};

use crate::core::{CacheStats, DocumentEvaluation, EvaluationMode};
use crate::domain::Metrics;
use crate::ledger::StatusCounts;

/// Averaged metrics over a batch of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub mode: EvaluationMode,

    /// Documents that entered the average
    pub documents: usize,

    /// Mean metrics over the included documents
    pub average: Metrics,

    /// Documents excluded for all-zero metrics
    pub excluded: Vec<String>,

    /// Decision counts over every document
    pub statuses: StatusCounts,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

impl BatchSummary {
    pub fn new(
        mode: EvaluationMode,
        results: &[DocumentEvaluation],
        cache: Option<CacheStats>,
    ) -> Self {
        let (average, excluded) = average_metrics(results);
        let statuses = StatusCounts::from_decisions(
            results.iter().flat_map(|r| r.evaluation.decisions.iter()),
        );

        Self {
            mode,
            documents: results.len() - excluded.len(),
            average,
            excluded,
            statuses,
            cache,
        }
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mode:      {}", self.mode)?;
        writeln!(f, "Documents: {}", self.documents)?;
        writeln!(f, "Average:   {}", self.average.rounded())?;
        if !self.excluded.is_empty() {
            writeln!(
                f,
                "Excluded:  {} ({})",
                self.excluded.len(),
                self.excluded.join(", ")
            )?;
        }
        if self.statuses.total() > 0 {
            writeln!(
                f,
                "Decisions: {} containment, {} substring, {} ai, {} wrong",
                self.statuses.correct_containment,
                self.statuses.correct_substring,
                self.statuses.correct_ai,
                self.statuses.wrong
            )?;
        }
        if let Some(cache) = &self.cache {
            writeln!(
                f,
                "Judge:     {} cached, {} hits, {} misses, {} faults",
                cache.entries, cache.hits, cache.misses, cache.faults
            )?;
        }
        Ok(())
    }
}

/// Mean metrics over documents with any non-zero metric.
///
/// Returns the mean and the IDs of excluded documents. The mean is zero when
/// nothing is left to average.
pub fn average_metrics(results: &[DocumentEvaluation]) -> (Metrics, Vec<String>) {
    let (kept, failed): (Vec<_>, Vec<_>) = results
        .iter()
        .partition(|r| !r.evaluation.metrics.is_all_zero());

    let excluded = failed.iter().map(|r| r.document_id.clone()).collect();

    if kept.is_empty() {
        return (Metrics::zero(), excluded);
    }

    let n = kept.len() as f64;
    let sum = |f: fn(&Metrics) -> f64| kept.iter().map(|r| f(&r.evaluation.metrics)).sum::<f64>();

    let average = Metrics {
        precision: sum(|m| m.precision) / n,
        recall: sum(|m| m.recall) / n,
        f1: sum(|m| m.f1) / n,
    };

    (average, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Evaluation;
    use crate::ledger::DecisionLedger;

    fn doc(id: &str, precision: f64, recall: f64) -> DocumentEvaluation {
        DocumentEvaluation {
            document_id: id.to_string(),
            evaluation: Evaluation {
                metrics: Metrics::from_precision_recall(precision, recall),
                counts: None,
                decisions: DecisionLedger::new(),
                unmatched: Vec::new(),
            },
        }
    }

    #[test]
    fn test_all_zero_documents_excluded() {
        let results = vec![doc("a", 1.0, 0.5), doc("b", 0.0, 0.0), doc("c", 0.5, 0.5)];
        let (avg, excluded) = average_metrics(&results);

        assert_eq!(excluded, vec!["b".to_string()]);
        assert!((avg.precision - 0.75).abs() < 1e-9);
        assert!((avg.recall - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_nothing_to_average() {
        let (avg, excluded) = average_metrics(&[doc("x", 0.0, 0.0)]);
        assert_eq!(avg, Metrics::zero());
        assert_eq!(excluded.len(), 1);

        let summary = BatchSummary::new(EvaluationMode::Strict, &[doc("x", 0.0, 0.0)], None);
        assert_eq!(summary.documents, 0);
    }
}
