//! Tiered matching of predictions against reference spans.
//!
//! Every candidate pair climbs a short decision ladder, cheapest rung first:
//!
//! 1. **Containment**: the reference is (almost) entirely inside the
//!    prediction. Accepted as `CORRECT_CONTAINMENT`.
//! 2. **Substring**: the prediction is (almost) entirely inside the
//!    reference. Accepted as `CORRECT_SUBSTRING`.
//! 3. **Judge**: the pair overlaps enough to be worth asking the semantic
//!    judge. Accepted as `CORRECT_AI` or rejected with the judge's rationale.
//!
//! The first rung that settles a pair wins. Pairs that reach the end of the
//! ladder unsettled are rejected without a judge call.

use std::collections::BTreeSet;

use tracing::debug;

use super::judge::SemanticJudge;
use super::policy::MatchPolicy;
use crate::domain::{Annotation, Decision, MatchStatus, MatchedReference};
use crate::ledger::DecisionLedger;
use crate::text::{containment, labels_compatible};

/// Directional containment scores of one candidate pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScores {
    /// How much of the reference the prediction covers
    pub recall: f64,

    /// How much of the prediction the reference covers
    pub precision: f64,
}

impl PairScores {
    pub fn compute(prediction: &str, reference: &str) -> Self {
        Self {
            recall: containment(prediction, reference),
            precision: containment(reference, prediction),
        }
    }

    pub fn average(&self) -> f64 {
        (self.recall + self.precision) / 2.0
    }
}

/// Rungs of the decision ladder, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Containment,
    Substring,
    Judge,
}

impl Tier {
    pub const LADDER: [Tier; 3] = [Tier::Containment, Tier::Substring, Tier::Judge];
}

/// How one candidate pair was settled
#[derive(Debug, Clone, PartialEq)]
enum PairOutcome {
    Accepted {
        status: MatchStatus,
        rationale: Option<String>,
    },
    Rejected {
        rationale: Option<String>,
    },
}

/// Decisions and match set for one document
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub decisions: DecisionLedger,

    /// Reference indices accepted by at least one prediction
    pub matched: BTreeSet<usize>,
}

/// Containment ladder with judge escalation
pub struct MatchingPipeline {
    policy: MatchPolicy,
    judge: SemanticJudge,
}

impl MatchingPipeline {
    pub fn new(policy: MatchPolicy, judge: SemanticJudge) -> Self {
        Self { policy, judge }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn judge(&self) -> &SemanticJudge {
        &self.judge
    }

    /// Score every prediction, in order, against the references
    pub async fn run(
        &mut self,
        references: &[Annotation],
        predictions: &[Annotation],
    ) -> PipelineOutput {
        let mut output = PipelineOutput::default();

        for prediction in predictions {
            let decision = self.decide(references, prediction).await;
            output.matched.extend(decision.matched_indices());
            output.decisions.push(decision);
        }

        output
    }

    /// Produce the decision for a single prediction
    pub async fn decide(&mut self, references: &[Annotation], prediction: &Annotation) -> Decision {
        let mut matches: Vec<MatchedReference> = Vec::new();
        let mut ai_rationales: Vec<(usize, String)> = Vec::new();
        let mut rejections: Vec<String> = Vec::new();
        let mut closest: Option<usize> = None;
        let mut best_score = 0.0_f64;

        let candidates = references
            .iter()
            .enumerate()
            .filter(|(_, r)| labels_compatible(&prediction.label, &r.label));

        for (index, reference) in candidates {
            let scores = PairScores::compute(&prediction.text, &reference.text);
            if scores.average() > best_score {
                best_score = scores.average();
                closest = Some(index);
            }

            match self.climb(prediction, reference, scores).await {
                PairOutcome::Accepted { status, rationale } => {
                    debug!(
                        reference = index,
                        status = status.as_str(),
                        recall = scores.recall,
                        precision = scores.precision,
                        "Candidate accepted"
                    );
                    if let Some(r) = rationale {
                        ai_rationales.push((index, r));
                    }
                    matches.push(MatchedReference {
                        index,
                        text: reference.text.clone(),
                        status,
                    });
                }
                PairOutcome::Rejected { rationale } => {
                    debug!(
                        reference = index,
                        recall = scores.recall,
                        precision = scores.precision,
                        "Candidate rejected"
                    );
                    rejections.extend(rationale);
                }
            }
        }

        if matches.is_empty() {
            let closest_match = closest
                .filter(|_| best_score > self.policy.report_floor)
                .map(|i| references[i].text.clone());
            return Decision::rejected(
                prediction,
                closest_match,
                best_score,
                rejections.into_iter().next(),
            );
        }

        // Rationale of the first matched reference, when it came from the judge
        let first = matches[0].index;
        let rationale = ai_rationales
            .into_iter()
            .find(|(i, _)| *i == first)
            .map(|(_, r)| r);

        Decision::accepted(prediction, matches, rationale)
    }

    async fn climb(
        &mut self,
        prediction: &Annotation,
        reference: &Annotation,
        scores: PairScores,
    ) -> PairOutcome {
        for tier in Tier::LADDER {
            match tier {
                Tier::Containment if scores.recall >= self.policy.containment_accept => {
                    return PairOutcome::Accepted {
                        status: MatchStatus::CorrectContainment,
                        rationale: None,
                    };
                }
                Tier::Substring if scores.precision >= self.policy.containment_accept => {
                    return PairOutcome::Accepted {
                        status: MatchStatus::CorrectSubstring,
                        rationale: None,
                    };
                }
                Tier::Judge
                    if scores.recall > self.policy.escalate_above
                        || scores.precision > self.policy.escalate_above =>
                {
                    let verdict = self
                        .judge
                        .judge(&prediction.text, &reference.text, &prediction.label)
                        .await;
                    return if verdict.is_match {
                        PairOutcome::Accepted {
                            status: MatchStatus::CorrectAi,
                            rationale: Some(verdict.rationale),
                        }
                    } else {
                        PairOutcome::Rejected {
                            rationale: Some(verdict.rationale),
                        }
                    };
                }
                _ => continue,
            }
        }

        PairOutcome::Rejected { rationale: None }
    }
}
