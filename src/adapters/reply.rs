//! Parsing of judge output.
//!
//! Models wrap JSON in markdown fences or prose often enough that the parser
//! looks for the first JSON object anywhere in the text.

use serde_json::Value;
use thiserror::Error;

/// Keys accepted for the rationale, in priority order
const REASON_KEYS: &[&str] = &["reason", "reasoning", "rationale", "explanation"];

/// A parsed judge verdict
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeReply {
    /// Score in [0, 1]
    pub score: f64,

    /// Free-text rationale
    pub reason: String,
}

impl JudgeReply {
    pub fn new(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score,
            reason: reason.into(),
        }
    }

    /// Parse a raw model response.
    ///
    /// Scores on a 0-10 scale are divided by ten.
    pub fn parse(raw: &str) -> Result<Self, ReplyParseError> {
        let body = extract_json(raw).ok_or_else(|| ReplyParseError::NoJson {
            excerpt: excerpt(raw),
        })?;

        let value: Value = serde_json::from_str(body)?;

        let score = match value.get("score") {
            Some(Value::Number(n)) => n.as_f64().ok_or(ReplyParseError::MissingScore)?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ReplyParseError::MissingScore)?,
            _ => return Err(ReplyParseError::MissingScore),
        };

        let score = normalize_score(score)?;

        let reason = REASON_KEYS
            .iter()
            .find_map(|k| value.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(Self { score, reason })
    }
}

fn normalize_score(score: f64) -> Result<f64, ReplyParseError> {
    if !score.is_finite() || score < 0.0 || score > 10.0 {
        return Err(ReplyParseError::ScoreOutOfRange(score));
    }
    if score > 1.0 {
        Ok(score / 10.0)
    } else {
        Ok(score)
    }
}

/// Locate the JSON object in a response: fenced block first, then the
/// outermost braces.
fn extract_json(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find("```") {
        let after = &raw[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(100).collect()
}

/// Judge output could not be turned into a score
#[derive(Debug, Error)]
pub enum ReplyParseError {
    #[error("no JSON object in judge output: {excerpt}")]
    NoJson { excerpt: String },

    #[error("invalid JSON in judge output: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("judge output has no numeric score")]
    MissingScore,

    #[error("judge score out of range: {0}")]
    ScoreOutOfRange(f64),
}
