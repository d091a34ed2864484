//! Document files and annotation records.
//!
//! A dataset file is JSON (an array of documents or a single document) or
//! JSONL (one document per line). Annotation records inside are probed
//! tolerantly, see [`Annotation`].

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::Annotation;

/// One policy document with its references and predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    /// Full source text, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub ground_truth: Vec<Annotation>,

    #[serde(default)]
    pub predictions: Vec<Annotation>,
}

/// A reference span tagged with the coder who wrote it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorRow {
    pub annotator: String,

    #[serde(flatten)]
    pub annotation: Annotation,
}

/// Load documents from a JSON or JSONL file
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    let documents: Vec<Document> = if is_jsonl(path) {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("Failed to parse document on line {} of {}", n + 1, path.display())
                })
            })
            .collect::<Result<_>>()?
    } else {
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;
        match value {
            Value::Array(_) => serde_json::from_value(value)
                .with_context(|| format!("Invalid document list in {}", path.display()))?,
            Value::Object(_) => vec![serde_json::from_value(value)
                .with_context(|| format!("Invalid document in {}", path.display()))?],
            _ => bail!("Dataset {} must hold a document or a list of documents", path.display()),
        }
    };

    debug!(count = documents.len(), path = %path.display(), "Loaded documents");
    Ok(documents)
}

/// Load a list of annotations from a JSON, JSONL or raw model-output file
pub fn load_annotations(path: &Path) -> Result<Vec<Annotation>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read annotations: {}", path.display()))?;

    if is_jsonl(path) {
        return content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let value: Value = serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse annotation line: {}", line))?;
                Ok(Annotation::from_value(&value))
            })
            .collect();
    }

    extract_records(&content)
        .map(|records| records.iter().map(Annotation::from_value).collect())
        .with_context(|| format!("Failed to parse annotations: {}", path.display()))
}

/// Parse annotation records out of a model response.
///
/// Accepts a ```json fenced block or bare JSON; a list yields one annotation
/// per element and a single object yields one annotation. Anything else
/// yields an empty list.
pub fn parse_prediction_output(raw: &str) -> Vec<Annotation> {
    match extract_records(raw) {
        Ok(records) => records.iter().map(Annotation::from_value).collect(),
        Err(e) => {
            let excerpt: String = raw.chars().take(100).collect();
            warn!(error = %e, excerpt = %excerpt, "Unparsable prediction output");
            Vec::new()
        }
    }
}

fn extract_records(raw: &str) -> Result<Vec<Value>> {
    let body = fenced_json(raw).unwrap_or(raw).trim();
    let value: Value = serde_json::from_str(body).context("Response is not valid JSON")?;

    Ok(match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    })
}

fn fenced_json(raw: &str) -> Option<&str> {
    let start = raw.find("```json")? + "```json".len();
    let rest = &raw[start..];
    let end = rest.find("```")?;
    Some(&rest[..end])
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("jsonl")
}

/// Keep only the rows of the coder with the most annotated text.
///
/// Completeness is the total character count of a coder's spans. Ties go to
/// the coder seen first.
pub fn select_most_complete_annotator(rows: &[AnnotatorRow]) -> Vec<Annotation> {
    let mut totals: Vec<(&str, usize)> = Vec::new();
    for row in rows {
        let len = row.annotation.text.chars().count();
        match totals.iter_mut().find(|(a, _)| *a == row.annotator) {
            Some((_, total)) => *total += len,
            None => totals.push((row.annotator.as_str(), len)),
        }
    }

    let best = totals
        .iter()
        .fold(None::<(&str, usize)>, |best, &(a, total)| match best {
            Some((_, b)) if b >= total => best,
            _ => Some((a, total)),
        });

    match best {
        Some((annotator, _)) => rows
            .iter()
            .filter(|r| r.annotator == annotator)
            .map(|r| Annotation::new(r.annotation.label.trim(), r.annotation.text.trim()))
            .collect(),
        None => Vec::new(),
    }
}
