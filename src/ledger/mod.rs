//! Decision ledger: the per-prediction audit trail.
//!
//! [`DecisionLedger`] is the in-memory, ordered record produced by one
//! evaluation. [`LedgerStore`] exports ledgers as JSONL for reporting tools.

pub mod store;

use serde::{Deserialize, Serialize};

use crate::domain::{Decision, MatchStatus};

pub use store::{compute_entry_id, summarize, LedgerEntry, LedgerStore};

/// Ordered decisions, one per prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionLedger {
    decisions: Vec<Decision>,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decision: Decision) {
        self.decisions.push(decision);
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Decision> {
        self.decisions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decision> {
        self.decisions.iter()
    }

    pub fn as_slice(&self) -> &[Decision] {
        &self.decisions
    }

    /// Number of accepted predictions
    pub fn true_positives(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_correct()).count()
    }

    /// Decisions with a given status
    pub fn with_status(&self, status: MatchStatus) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(move |d| d.status == status)
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::from_decisions(self.decisions.iter())
    }
}

impl IntoIterator for DecisionLedger {
    type Item = Decision;
    type IntoIter = std::vec::IntoIter<Decision>;

    fn into_iter(self) -> Self::IntoIter {
        self.decisions.into_iter()
    }
}

impl<'a> IntoIterator for &'a DecisionLedger {
    type Item = &'a Decision;
    type IntoIter = std::slice::Iter<'a, Decision>;

    fn into_iter(self) -> Self::IntoIter {
        self.decisions.iter()
    }
}

impl FromIterator<Decision> for DecisionLedger {
    fn from_iter<I: IntoIterator<Item = Decision>>(iter: I) -> Self {
        Self {
            decisions: iter.into_iter().collect(),
        }
    }
}

/// Decision counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub correct_containment: usize,
    pub correct_substring: usize,
    pub correct_ai: usize,
    pub wrong: usize,
}

impl StatusCounts {
    pub fn from_decisions<'a>(decisions: impl Iterator<Item = &'a Decision>) -> Self {
        let mut counts = Self::default();
        for decision in decisions {
            counts.record(decision.status);
        }
        counts
    }

    pub fn record(&mut self, status: MatchStatus) {
        match status {
            MatchStatus::CorrectContainment => self.correct_containment += 1,
            MatchStatus::CorrectSubstring => self.correct_substring += 1,
            MatchStatus::CorrectAi => self.correct_ai += 1,
            MatchStatus::Wrong => self.wrong += 1,
        }
    }

    pub fn get(&self, status: MatchStatus) -> usize {
        match status {
            MatchStatus::CorrectContainment => self.correct_containment,
            MatchStatus::CorrectSubstring => self.correct_substring,
            MatchStatus::CorrectAi => self.correct_ai,
            MatchStatus::Wrong => self.wrong,
        }
    }

    pub fn total(&self) -> usize {
        self.correct_containment + self.correct_substring + self.correct_ai + self.wrong
    }
}
