//! Per-prediction matching decisions.
//!
//! Every prediction produces exactly one [`Decision`]. Accepted decisions
//! carry at least one matched reference; rejected ones carry the closest
//! reference seen (if any) for debugging.

use serde::{Deserialize, Serialize};

use super::annotation::Annotation;

/// Outcome of matching one prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// A reference is (almost) fully contained in the prediction
    CorrectContainment,
    /// The prediction is (almost) fully contained in a reference
    CorrectSubstring,
    /// The judge accepted the pair
    CorrectAi,
    /// No reference accepted
    Wrong,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::CorrectContainment => "CORRECT_CONTAINMENT",
            MatchStatus::CorrectSubstring => "CORRECT_SUBSTRING",
            MatchStatus::CorrectAi => "CORRECT_AI",
            MatchStatus::Wrong => "WRONG",
        }
    }

    /// Returns `true` for any accepted status
    pub fn is_correct(&self) -> bool {
        !matches!(self, MatchStatus::Wrong)
    }

    /// Returns `true` when acceptance came from a deterministic tier
    pub fn is_deterministic(&self) -> bool {
        matches!(
            self,
            MatchStatus::CorrectContainment | MatchStatus::CorrectSubstring
        )
    }

    /// Strength of evidence, used to pick the displayed status
    pub fn priority(&self) -> u8 {
        match self {
            MatchStatus::CorrectContainment => 3,
            MatchStatus::CorrectSubstring => 2,
            MatchStatus::CorrectAi => 1,
            MatchStatus::Wrong => 0,
        }
    }

    /// All statuses, strongest first
    pub fn all() -> [MatchStatus; 4] {
        [
            MatchStatus::CorrectContainment,
            MatchStatus::CorrectSubstring,
            MatchStatus::CorrectAi,
            MatchStatus::Wrong,
        ]
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference accepted for a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedReference {
    /// Index into the reference list
    pub index: usize,

    /// Reference text
    pub text: String,

    /// Tier that accepted the pair
    pub status: MatchStatus,
}

/// The ledger record for one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Prediction label
    pub label: String,

    /// Prediction text
    pub text: String,

    /// Strongest status among accepted references, or WRONG
    pub status: MatchStatus,

    /// Text of the first accepted reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_with: Option<String>,

    /// Every accepted reference, in reference order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchedReference>,

    /// Number of accepted references (0 iff WRONG)
    pub matched_count: usize,

    /// Judge rationale. For accepted decisions only present when no
    /// deterministic tier matched; for rejected ones the first judge rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    /// Closest reference text for rejected predictions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest_match: Option<String>,

    /// Average containment score of the closest reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest_score: Option<f64>,
}

impl Decision {
    /// Create an accepted decision.
    ///
    /// The displayed status is the strongest one among `matches` and the
    /// rationale is dropped if any match is deterministic. Empty `matches`
    /// yields a `WRONG` decision with no closest reference.
    pub fn accepted(
        prediction: &Annotation,
        matches: Vec<MatchedReference>,
        rationale: Option<String>,
    ) -> Self {
        if matches.is_empty() {
            return Self::rejected(prediction, None, 0.0, rationale);
        }

        let status = matches
            .iter()
            .map(|m| m.status)
            .fold(MatchStatus::CorrectAi, |best, s| {
                if s.priority() > best.priority() {
                    s
                } else {
                    best
                }
            });

        let rationale = if status.is_deterministic() {
            None
        } else {
            rationale
        };

        Self {
            label: prediction.label.clone(),
            text: prediction.text.clone(),
            status,
            match_with: matches.first().map(|m| m.text.clone()),
            matched_count: matches.len(),
            matches,
            rationale,
            closest_match: None,
            closest_score: None,
        }
    }

    /// Create a rejected decision
    pub fn rejected(
        prediction: &Annotation,
        closest_match: Option<String>,
        closest_score: f64,
        rationale: Option<String>,
    ) -> Self {
        Self {
            label: prediction.label.clone(),
            text: prediction.text.clone(),
            status: MatchStatus::Wrong,
            match_with: None,
            matches: Vec::new(),
            matched_count: 0,
            rationale,
            closest_match,
            closest_score: Some(closest_score),
        }
    }

    /// Returns `true` if the prediction is a true positive
    pub fn is_correct(&self) -> bool {
        self.status.is_correct()
    }

    /// Indices of accepted references
    pub fn matched_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.matches.iter().map(|m| m.index)
    }
}
