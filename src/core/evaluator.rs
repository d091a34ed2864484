//! Evaluation entry point.
//!
//! An [`Evaluator`] owns one scoring engine for its whole lifetime. In judged
//! mode that includes the judge cache, so scoring many documents with the
//! same evaluator asks the judge about each distinct pair only once.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::aggregate::{aggregate, unmatched_references};
use super::judge::{CacheStats, SemanticJudge};
use super::pipeline::MatchingPipeline;
use super::policy::{MatchPolicy, PolicyViolation, StrictPolicy};
use super::strict::StrictEvaluator;
use crate::adapters::JudgeBackend;
use crate::dataset::Document;
use crate::domain::{Annotation, MatchCounts, Metrics};
use crate::ledger::DecisionLedger;

/// Which engine scores the predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Containment ladder with judge escalation
    Judged,
    /// Token-F1 or Jaccard with greedy one-to-one matching
    Strict,
}

impl EvaluationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationMode::Judged => "judged",
            EvaluationMode::Strict => "strict",
        }
    }
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub metrics: Metrics,

    /// Raw counts, reported in strict mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<MatchCounts>,

    /// One decision per prediction; empty in strict mode
    pub decisions: DecisionLedger,

    /// References nothing matched, in original order
    pub unmatched: Vec<Annotation>,
}

/// Evaluation of one document in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEvaluation {
    pub document_id: String,
    pub evaluation: Evaluation,
}

/// Document selection for batch runs
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Stop after this many evaluated documents.
    ///
    /// Ignored documents and documents without ground truth are not counted,
    /// so `Some(n)` always yields up to `n` scored documents rather than
    /// stopping after the first `n` dataset entries.
    pub limit: Option<usize>,

    /// Document IDs to skip
    pub ignore: HashSet<String>,
}

enum Engine {
    Judged(MatchingPipeline),
    Strict(StrictEvaluator),
}

pub struct Evaluator {
    engine: Engine,
}

impl Evaluator {
    /// Containment + judge evaluator; thresholds are checked up front
    pub fn judged(backend: Arc<dyn JudgeBackend>, policy: MatchPolicy) -> Result<Self, PolicyViolation> {
        policy.validate()?;
        let judge = SemanticJudge::new(backend, policy.judge_threshold);
        Ok(Self {
            engine: Engine::Judged(MatchingPipeline::new(policy, judge)),
        })
    }

    /// Deterministic evaluator, no judge involved
    pub fn strict(policy: StrictPolicy) -> Result<Self, PolicyViolation> {
        policy.validate()?;
        Ok(Self {
            engine: Engine::Strict(StrictEvaluator::new(policy)),
        })
    }

    pub fn mode(&self) -> EvaluationMode {
        match &self.engine {
            Engine::Judged(_) => EvaluationMode::Judged,
            Engine::Strict(_) => EvaluationMode::Strict,
        }
    }

    /// Judge cache counters; `None` in strict mode
    pub fn cache_stats(&self) -> Option<CacheStats> {
        match &self.engine {
            Engine::Judged(p) => Some(p.judge().stats()),
            Engine::Strict(_) => None,
        }
    }

    /// Score predictions against references
    #[instrument(skip_all, fields(mode = %self.mode(), references = references.len(), predictions = predictions.len()))]
    pub async fn evaluate(&mut self, references: &[Annotation], predictions: &[Annotation]) -> Evaluation {
        let evaluation = match &mut self.engine {
            Engine::Judged(pipeline) => {
                let output = pipeline.run(references, predictions).await;
                let agg = aggregate(references, &output.decisions, &output.matched);
                Evaluation {
                    metrics: agg.metrics,
                    counts: None,
                    decisions: output.decisions,
                    unmatched: agg.unmatched,
                }
            }
            Engine::Strict(strict) => {
                let output = strict.evaluate(references, predictions);
                Evaluation {
                    metrics: output.counts.metrics(),
                    counts: Some(output.counts),
                    decisions: DecisionLedger::new(),
                    unmatched: unmatched_references(references, &output.matched),
                }
            }
        };

        info!(metrics = %evaluation.metrics, "Evaluation complete");
        evaluation
    }

    /// Score documents in order with this evaluator.
    ///
    /// Documents without ground truth or listed in `options.ignore` are
    /// skipped and do not count toward the limit.
    pub async fn evaluate_documents(
        &mut self,
        documents: &[Document],
        options: &BatchOptions,
    ) -> Vec<DocumentEvaluation> {
        let mut results = Vec::new();

        for document in documents {
            if options.limit.is_some_and(|limit| results.len() >= limit) {
                break;
            }
            if options.ignore.contains(&document.id) {
                info!(document_id = %document.id, "Skipping ignored document");
                continue;
            }
            if document.ground_truth.is_empty() {
                info!(document_id = %document.id, "Skipping document without ground truth");
                continue;
            }

            let evaluation = self
                .evaluate(&document.ground_truth, &document.predictions)
                .await;
            results.push(DocumentEvaluation {
                document_id: document.id.clone(),
                evaluation,
            });
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_policy_fails_fast() {
        let policy = StrictPolicy {
            threshold: Some(1.5),
            ..Default::default()
        };
        assert!(Evaluator::strict(policy).is_err());
    }

    #[tokio::test]
    async fn test_strict_mode_reports_counts() {
        let mut evaluator = Evaluator::strict(StrictPolicy::default()).unwrap();
        assert_eq!(evaluator.mode(), EvaluationMode::Strict);
        assert!(evaluator.cache_stats().is_none());

        let refs = vec![
            Annotation::new("Retention", "logs are kept for thirty days"),
            Annotation::new("Sharing", "no sale of personal data"),
        ];
        let preds = vec![Annotation::new("Retention", "logs kept thirty days")];

        let eval = evaluator.evaluate(&refs, &preds).await;
        let counts = eval.counts.unwrap();
        assert_eq!(counts.true_positives, 1);
        assert_eq!(counts.false_negatives, 1);
        assert!(eval.decisions.is_empty());
        assert_eq!(eval.unmatched, vec![refs[1].clone()]);
    }
}
