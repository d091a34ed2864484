//! Cached, fault-contained access to a judge backend.
//!
//! The matching pipeline calls [`SemanticJudge::judge`] only for pairs the
//! deterministic tiers could not settle. Results are memoized on the exact
//! `(prediction, reference, label)` strings for the lifetime of the judge,
//! so re-scoring a document never asks the backend twice. Backend faults
//! become non-matches and are not cached.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapters::{JudgeBackend, JudgeRequest};

/// Outcome of one judged comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    /// Score cleared the acceptance threshold
    pub is_match: bool,

    /// Score in [0, 1]
    pub score: f64,

    /// Judge rationale, or "Error: ..." on fault
    pub rationale: String,
}

impl JudgeVerdict {
    /// Non-match produced when the backend fails
    pub fn fault(description: impl std::fmt::Display) -> Self {
        Self {
            is_match: false,
            score: 0.0,
            rationale: format!("Error: {}", description),
        }
    }
}

/// Exact-string cache key: (prediction text, reference text, label)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub prediction: String,
    pub reference: String,
    pub label: String,
}

impl CacheKey {
    pub fn new(prediction: &str, reference: &str, label: &str) -> Self {
        Self {
            prediction: prediction.to_string(),
            reference: reference.to_string(),
            label: label.to_string(),
        }
    }
}

/// Cache usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub faults: u64,
}

/// Unbounded memo of judge verdicts
#[derive(Debug, Default)]
pub struct JudgeCache {
    entries: HashMap<CacheKey, JudgeVerdict>,
    hits: u64,
    misses: u64,
}

impl JudgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a verdict, counting the hit or miss
    pub fn get(&mut self, key: &CacheKey) -> Option<JudgeVerdict> {
        match self.entries.get(key) {
            Some(verdict) => {
                self.hits += 1;
                Some(verdict.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, verdict: JudgeVerdict) {
        self.entries.insert(key, verdict);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Judge adapter owned by one evaluator
pub struct SemanticJudge {
    backend: Arc<dyn JudgeBackend>,
    threshold: f64,
    cache: JudgeCache,
    faults: u64,
}

impl std::fmt::Debug for SemanticJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticJudge")
            .field("backend", &self.backend.name())
            .field("threshold", &self.threshold)
            .field("cache_entries", &self.cache.len())
            .finish()
    }
}

impl SemanticJudge {
    /// Create a judge with an empty cache
    pub fn new(backend: Arc<dyn JudgeBackend>, threshold: f64) -> Self {
        Self {
            backend,
            threshold,
            cache: JudgeCache::new(),
            faults: 0,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn cache(&self) -> &JudgeCache {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            hits: self.cache.hits,
            misses: self.cache.misses,
            faults: self.faults,
        }
    }

    /// Judge one pair. Never fails: backend errors yield a non-match whose
    /// rationale starts with "Error:".
    pub async fn judge(&mut self, prediction: &str, reference: &str, label: &str) -> JudgeVerdict {
        let key = CacheKey::new(prediction, reference, label);
        if let Some(verdict) = self.cache.get(&key) {
            debug!(is_match = verdict.is_match, "Judge cache hit");
            return verdict;
        }

        let request = JudgeRequest::new(prediction, reference, label);
        let reply = self.backend.judge(&request).await.and_then(|reply| {
            if reply.score.is_finite() && (0.0..=1.0).contains(&reply.score) {
                Ok(reply)
            } else {
                Err(anyhow::anyhow!("judge score {} is outside [0, 1]", reply.score))
            }
        });

        match reply {
            Ok(reply) => {
                let verdict = JudgeVerdict {
                    is_match: reply.score >= self.threshold,
                    score: reply.score,
                    rationale: reply.reason,
                };
                debug!(
                    backend = self.backend.name(),
                    score = verdict.score,
                    is_match = verdict.is_match,
                    "Judge verdict"
                );
                self.cache.insert(key, verdict.clone());
                verdict
            }
            Err(e) => {
                self.faults += 1;
                warn!(backend = self.backend.name(), error = %e, "Judge call failed, treating pair as non-match");
                JudgeVerdict::fault(format!("{:#}", e))
            }
        }
    }
}
