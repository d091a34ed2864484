//! Decision thresholds for span matching.
//!
//! Configurable limits for:
//! - Deterministic containment/substring acceptance
//! - Escalation to the semantic judge
//! - Judge acceptance
//! - Reporting of the closest reference on rejection
//! - The deterministic token-F1/Jaccard evaluator

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::SimilarityKind;

/// Thresholds for the containment + judge ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPolicy {
    /// Containment score that accepts a pair without the judge (default: 0.9)
    #[serde(default = "default_containment_accept")]
    pub containment_accept: f64,

    /// Either direction must exceed this to escalate to the judge (default: 0.4)
    #[serde(default = "default_escalate_above")]
    pub escalate_above: f64,

    /// Closest reference is reported only above this average score (default: 0.1)
    #[serde(default = "default_report_floor")]
    pub report_floor: f64,

    /// Judge score that counts as a match (default: 0.6)
    #[serde(default = "default_judge_threshold")]
    pub judge_threshold: f64,
}

fn default_containment_accept() -> f64 {
    0.9
}
fn default_escalate_above() -> f64 {
    0.4
}
fn default_report_floor() -> f64 {
    0.1
}
fn default_judge_threshold() -> f64 {
    0.6
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            containment_accept: default_containment_accept(),
            escalate_above: default_escalate_above(),
            report_floor: default_report_floor(),
            judge_threshold: default_judge_threshold(),
        }
    }
}

impl MatchPolicy {
    /// Check ranges and ordering of the thresholds
    pub fn validate(&self) -> Result<(), PolicyViolation> {
        check_unit("containment_accept", self.containment_accept)?;
        check_unit("escalate_above", self.escalate_above)?;
        check_unit("report_floor", self.report_floor)?;
        check_unit("judge_threshold", self.judge_threshold)?;

        if self.escalate_above >= self.containment_accept {
            return Err(PolicyViolation::EscalationAboveAccept {
                escalate_above: self.escalate_above,
                containment_accept: self.containment_accept,
            });
        }

        Ok(())
    }
}

/// Settings for the deterministic evaluator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrictPolicy {
    /// Similarity used to score pairs
    #[serde(default)]
    pub similarity: SimilarityKind,

    /// Acceptance threshold; defaults to the similarity's own threshold
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl StrictPolicy {
    pub fn new(similarity: SimilarityKind) -> Self {
        Self {
            similarity,
            threshold: None,
        }
    }

    /// Threshold actually applied
    pub fn effective_threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.similarity.default_threshold())
    }

    pub fn validate(&self) -> Result<(), PolicyViolation> {
        check_unit("strict.threshold", self.effective_threshold())
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), PolicyViolation> {
    if !(0.0..=1.0).contains(&value) {
        return Err(PolicyViolation::OutOfRange { name, value });
    }
    Ok(())
}

/// Invalid threshold configuration
#[derive(Debug, Clone, Error)]
pub enum PolicyViolation {
    #[error("Threshold {name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("escalate_above ({escalate_above}) must be below containment_accept ({containment_accept})")]
    EscalationAboveAccept {
        escalate_above: f64,
        containment_accept: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = MatchPolicy::default();
        assert_eq!(policy.containment_accept, 0.9);
        assert_eq!(policy.escalate_above, 0.4);
        assert_eq!(policy.report_floor, 0.1);
        assert_eq!(policy.judge_threshold, 0.6);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let policy: MatchPolicy = serde_yaml::from_str("escalate_above: 0.5").unwrap();
        assert_eq!(policy.escalate_above, 0.5);
        assert_eq!(policy.containment_accept, 0.9);
    }

    #[test]
    fn test_out_of_range() {
        let policy = MatchPolicy {
            judge_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(PolicyViolation::OutOfRange {
                name: "judge_threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_escalation_must_be_below_accept() {
        let policy = MatchPolicy {
            escalate_above: 0.95,
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(PolicyViolation::EscalationAboveAccept { .. })
        ));
    }

    #[test]
    fn test_strict_threshold() {
        assert_eq!(StrictPolicy::default().effective_threshold(), 0.3);
        assert_eq!(
            StrictPolicy::new(SimilarityKind::Jaccard).effective_threshold(),
            0.5
        );
        let custom = StrictPolicy {
            similarity: SimilarityKind::TokenF1,
            threshold: Some(0.45),
        };
        assert_eq!(custom.effective_threshold(), 0.45);

        let bad = StrictPolicy {
            threshold: Some(-0.1),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
