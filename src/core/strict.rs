//! Deterministic evaluation without a judge.
//!
//! Each prediction, in order, takes the best-scoring label-compatible
//! reference still in the pool. A reference is consumed by the first
//! prediction that clears the threshold against it, so every reference
//! matches at most one prediction.

use std::collections::BTreeSet;

use tracing::debug;

use super::policy::StrictPolicy;
use crate::domain::{Annotation, MatchCounts};
use crate::text::labels_compatible;

/// Result of a strict evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrictOutput {
    pub counts: MatchCounts,

    /// Per prediction: the reference it consumed and the score
    pub assignments: Vec<Option<(usize, f64)>>,

    /// Consumed reference indices
    pub matched: BTreeSet<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct StrictEvaluator {
    policy: StrictPolicy,
}

impl StrictEvaluator {
    pub fn new(policy: StrictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &StrictPolicy {
        &self.policy
    }

    pub fn evaluate(&self, references: &[Annotation], predictions: &[Annotation]) -> StrictOutput {
        let threshold = self.policy.effective_threshold();
        let similarity = self.policy.similarity;

        let mut output = StrictOutput::default();

        for prediction in predictions {
            let mut best: Option<(usize, f64)> = None;

            for (index, reference) in references.iter().enumerate() {
                if output.matched.contains(&index)
                    || !labels_compatible(&prediction.label, &reference.label)
                {
                    continue;
                }
                let score = similarity.score(&prediction.text, &reference.text);
                if score > best.map_or(0.0, |(_, s)| s) {
                    best = Some((index, score));
                }
            }

            match best {
                Some((index, score)) if score >= threshold => {
                    debug!(reference = index, score, "Strict match");
                    output.counts.true_positives += 1;
                    output.matched.insert(index);
                    output.assignments.push(Some((index, score)));
                }
                _ => {
                    output.counts.false_positives += 1;
                    output.assignments.push(None);
                }
            }
        }

        output.counts.false_negatives = references.len() - output.matched.len();
        output
    }
}
