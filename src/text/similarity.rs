//! Span similarity scorers.
//!
//! All scorers are total: any pair of strings, including empty ones, yields a
//! score in `[0, 1]`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::normalize::{normalize, tokenize};

/// Function words plus domain-generic terms that carry no signal when
/// comparing policy spans.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "by", "can", "do", "does", "for", "from",
    "has", "have", "if", "in", "is", "it", "its", "may", "of", "on", "or", "our", "such", "that",
    "the", "their", "this", "to", "us", "was", "we", "were", "which", "will", "with", "you",
    "your", "data", "information", "info", "service", "services", "privacy", "policy",
];

/// Whether a normalized token is filtered out by token-F1.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Fraction of `inner` that is contained in `outer`.
///
/// Returns 1.0 when the normalized `inner` is a literal substring of the
/// normalized `outer`. Otherwise returns the share of `inner` tokens found in
/// the token set of `outer`. Empty `inner` scores 0.
pub fn containment(outer: &str, inner: &str) -> f64 {
    let outer_norm = normalize(outer);
    let inner_norm = normalize(inner);

    if inner_norm.is_empty() {
        return 0.0;
    }

    if outer_norm.contains(&inner_norm) {
        return 1.0;
    }

    let outer_tokens: HashSet<&str> = outer_norm.split(' ').collect();
    let inner_tokens: Vec<&str> = inner_norm.split(' ').collect();

    let found = inner_tokens
        .iter()
        .filter(|t| outer_tokens.contains(*t))
        .count();

    found as f64 / inner_tokens.len() as f64
}

/// Token-level F1 over stopword-filtered multisets.
///
/// Scores 0 when either filtered list is empty or nothing overlaps.
pub fn token_f1(prediction: &str, reference: &str) -> f64 {
    let pred_tokens = content_tokens(prediction);
    let ref_tokens = content_tokens(reference);

    if pred_tokens.is_empty() || ref_tokens.is_empty() {
        return 0.0;
    }

    let mut ref_counts: HashMap<&str, usize> = HashMap::new();
    for token in &ref_tokens {
        *ref_counts.entry(token.as_str()).or_default() += 1;
    }

    let mut overlap = 0usize;
    for token in &pred_tokens {
        if let Some(count) = ref_counts.get_mut(token.as_str()) {
            if *count > 0 {
                *count -= 1;
                overlap += 1;
            }
        }
    }

    if overlap == 0 {
        return 0.0;
    }

    let precision = overlap as f64 / pred_tokens.len() as f64;
    let recall = overlap as f64 / ref_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Jaccard similarity (intersection over union) of lowercased whitespace
/// token sets. Two empty spans are identical.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let set_a: HashSet<&str> = a_lower.split_whitespace().collect();
    let set_b: HashSet<&str> = b_lower.split_whitespace().collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stopword(t))
        .collect()
}

/// Similarity used by the deterministic evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    /// Stopword-filtered token F1
    #[default]
    TokenF1,
    /// Set intersection over union
    Jaccard,
}

impl SimilarityKind {
    /// Score a prediction against a reference
    pub fn score(&self, prediction: &str, reference: &str) -> f64 {
        match self {
            SimilarityKind::TokenF1 => token_f1(prediction, reference),
            SimilarityKind::Jaccard => jaccard(prediction, reference),
        }
    }

    /// Acceptance threshold each similarity was tuned with
    pub fn default_threshold(&self) -> f64 {
        match self {
            SimilarityKind::TokenF1 => 0.3,
            SimilarityKind::Jaccard => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityKind::TokenF1 => "token_f1",
            SimilarityKind::Jaccard => "jaccard",
        }
    }
}
