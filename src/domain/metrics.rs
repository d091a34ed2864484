//! Precision/recall/F1 records.

use serde::{Deserialize, Serialize};

/// Precision, recall and F1 for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Metrics {
    /// Perfect score, used when there is nothing to predict and nothing predicted
    pub fn perfect() -> Self {
        Self {
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
        }
    }

    pub fn zero() -> Self {
        Self {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        }
    }

    /// Build from precision and recall; F1 is 0 when both are 0
    pub fn from_precision_recall(precision: f64, recall: f64) -> Self {
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
        }
    }

    /// Copy rounded to three decimals, for display
    pub fn rounded(&self) -> Self {
        Self {
            precision: round3(self.precision),
            recall: round3(self.recall),
            f1: round3(self.f1),
        }
    }

    /// Returns `true` if every value is exactly zero
    pub fn is_all_zero(&self) -> bool {
        self.precision == 0.0 && self.recall == 0.0 && self.f1 == 0.0
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "P={:.3} R={:.3} F1={:.3}",
            self.precision, self.recall, self.f1
        )
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Raw counts reported by the deterministic evaluator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl MatchCounts {
    /// Convert counts into metrics; no predictions and no references is perfect
    pub fn metrics(&self) -> Metrics {
        let predicted = self.true_positives + self.false_positives;
        let relevant = self.true_positives + self.false_negatives;

        if predicted == 0 && relevant == 0 {
            return Metrics::perfect();
        }

        let precision = if predicted > 0 {
            self.true_positives as f64 / predicted as f64
        } else {
            0.0
        };
        let recall = if relevant > 0 {
            self.true_positives as f64 / relevant as f64
        } else {
            0.0
        };

        Metrics::from_precision_recall(precision, recall)
    }
}
