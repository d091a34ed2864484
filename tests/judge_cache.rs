//! Judge Cache Integration Tests
//!
//! Tests for memoization of judge verdicts across documents scored by the
//! same evaluator, and for fault handling at the judge boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use spanjudge::adapters::{JudgeBackend, JudgeReply, JudgeRequest};
use spanjudge::core::{BatchOptions, CacheKey, Evaluator, MatchPolicy, SemanticJudge};
use spanjudge::dataset::Document;
use spanjudge::domain::Annotation;

/// Judge that fails on its first `failures` calls, then scores 0.75
struct FlakyJudge {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyJudge {
    fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JudgeBackend for FlakyJudge {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn judge(&self, _request: &JudgeRequest) -> Result<JudgeReply> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            anyhow::bail!("timed out after 120s");
        }
        Ok(JudgeReply::new(0.75, "equivalent"))
    }
}

#[tokio::test]
async fn test_verdicts_cached_per_exact_triple() {
    let backend = FlakyJudge::new(0);
    let mut judge = SemanticJudge::new(backend.clone(), 0.6);

    let first = judge.judge("we sell nothing", "we do not sell data", "Sale").await;
    let second = judge.judge("we sell nothing", "we do not sell data", "Sale").await;
    assert_eq!(first, second);
    assert!(first.is_match);
    assert_eq!(backend.calls(), 1);

    // Any difference in the triple is a different key
    judge.judge("we sell nothing", "we do not sell data", "sale").await;
    judge.judge("We sell nothing", "we do not sell data", "Sale").await;
    assert_eq!(backend.calls(), 3);
    assert_eq!(judge.cache().len(), 3);
    assert!(judge
        .cache()
        .contains(&CacheKey::new("we sell nothing", "we do not sell data", "Sale")));

    let stats = judge.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 3);
}

#[tokio::test]
async fn test_faults_are_not_cached() {
    let backend = FlakyJudge::new(1);
    let mut judge = SemanticJudge::new(backend.clone(), 0.6);

    let failed = judge.judge("a b c", "a b d", "L").await;
    assert!(!failed.is_match);
    assert_eq!(failed.score, 0.0);
    assert!(failed.rationale.starts_with("Error:"));
    assert!(failed.rationale.contains("timed out"));
    assert!(judge.cache().is_empty());

    let retried = judge.judge("a b c", "a b d", "L").await;
    assert!(retried.is_match);
    assert_eq!(retried.rationale, "equivalent");
    assert_eq!(backend.calls(), 2);
    assert_eq!(judge.stats().faults, 1);
}

#[tokio::test]
async fn test_cache_amortized_across_batch() {
    let backend = FlakyJudge::new(0);
    let mut evaluator = Evaluator::judged(backend.clone(), MatchPolicy::default()).unwrap();

    let reference = Annotation::new("Right to Delete", "You may request deletion of your account records");
    let prediction = Annotation::new("Right to Delete", "You may ask us to remove your account records");

    let documents: Vec<Document> = ["DB_1", "DB_2", "DB_3"]
        .iter()
        .map(|id| Document {
            id: id.to_string(),
            text: None,
            ground_truth: vec![reference.clone()],
            predictions: vec![prediction.clone()],
        })
        .collect();

    let results = evaluator
        .evaluate_documents(&documents, &BatchOptions::default())
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(backend.calls(), 1);
    assert_eq!(evaluator.cache_stats().unwrap().hits, 2);
    for result in &results {
        assert_eq!(result.evaluation.metrics.f1, 1.0);
    }
}

#[tokio::test]
async fn test_batch_skips_and_limits() {
    let backend = FlakyJudge::new(0);
    let mut evaluator = Evaluator::judged(backend, MatchPolicy::default()).unwrap();

    let doc = |id: &str, with_truth: bool| Document {
        id: id.to_string(),
        text: None,
        ground_truth: if with_truth {
            vec![Annotation::new("Retention", "kept for 30 days")]
        } else {
            Vec::new()
        },
        predictions: vec![Annotation::new("Retention", "kept for 30 days")],
    };
    let documents = vec![
        doc("a", true),
        doc("empty", false),
        doc("ignored", true),
        doc("b", true),
        doc("c", true),
    ];

    let options = BatchOptions {
        limit: Some(2),
        ignore: ["ignored".to_string()].into_iter().collect(),
    };
    let results = evaluator.evaluate_documents(&documents, &options).await;

    // The skipped entries sit inside the first two positions but do not use
    // up the limit
    let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn test_cache_belongs_to_one_evaluator() {
    let backend = FlakyJudge::new(0);
    let refs = vec![Annotation::new("Right to Delete", "You may request deletion of your account records")];
    let preds = vec![Annotation::new("Right to Delete", "You may ask us to remove your account records")];

    tokio_test::block_on(async {
        let mut first = Evaluator::judged(backend.clone(), MatchPolicy::default()).unwrap();
        let mut second = Evaluator::judged(backend.clone(), MatchPolicy::default()).unwrap();

        first.evaluate(&refs, &preds).await;
        second.evaluate(&refs, &preds).await;
        first.evaluate(&refs, &preds).await;
    });

    // Each evaluator starts cold; the repeat on `first` is a hit
    assert_eq!(backend.calls(), 2);
}
