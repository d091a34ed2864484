//! Adapter interfaces for semantic judges.
//!
//! A judge compares a predicted span with a reference span under a label and
//! returns a score in `[0, 1]` with a rationale. The matching engine only sees
//! the [`JudgeBackend`] trait; concrete backends live in submodules.

pub mod command;
pub mod openai;
pub mod reply;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use command::CommandJudge;
pub use openai::{OpenAiJudge, Provider};
pub use reply::{JudgeReply, ReplyParseError};

/// Name of the comparison task sent to judges
pub const TASK_NAME: &str = "Extraction Equivalence";

/// Acceptance criteria given to the judge, in order
pub const CRITERIA: &[&str] = &[
    "If the Actual Output contains the Expected Output (even if it has extra surrounding text), it is CORRECT.",
    "If the Actual Output is a list or table and the Expected Output is one item from that list, it is CORRECT.",
    "If the Actual Output is a substring of the Expected Output that preserves the main meaning, it is CORRECT.",
];

/// One comparison handed to a judge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Label the prediction was extracted for
    pub label: String,

    /// Predicted span (actual output)
    pub prediction: String,

    /// Reference span (expected output)
    pub reference: String,
}

impl JudgeRequest {
    pub fn new(
        prediction: impl Into<String>,
        reference: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            prediction: prediction.into(),
            reference: reference.into(),
        }
    }

    /// Instructions for the judge
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are an impartial evaluator performing the task \"{}\".\n\
             Compare the Actual Output (a model prediction) with the Expected Output (ground truth).\n",
            TASK_NAME
        );
        for (i, criterion) in CRITERIA.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, criterion));
        }
        prompt.push_str(
            "Otherwise judge whether both outputs express the same provision.\n\
             Respond with JSON only: {\"score\": <number between 0 and 1>, \"reason\": \"<one or two sentences>\"}",
        );
        prompt
    }

    /// The comparison itself
    pub fn user_prompt(&self) -> String {
        format!(
            "Input: Extract text for label: {}\n\nActual Output:\n{}\n\nExpected Output:\n{}",
            self.label, self.prediction, self.reference
        )
    }

    /// System and user prompt joined, for backends that take a single text
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system_prompt(), self.user_prompt())
    }
}

/// Trait for judge backends
#[async_trait]
pub trait JudgeBackend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Score one comparison
    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeReply>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
