//! Matching Pipeline Integration Tests
//!
//! Tests for the containment/substring/judge ladder, the decision ledger it
//! produces, and the metrics aggregated from it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use spanjudge::adapters::{JudgeBackend, JudgeReply, JudgeRequest};
use spanjudge::core::{Evaluator, MatchPolicy};
use spanjudge::domain::{Annotation, MatchStatus, Metrics};

/// Judge with a fixed score per reference text
struct ScriptedJudge {
    scores: HashMap<String, f64>,
    default_score: f64,
    calls: AtomicUsize,
}

impl ScriptedJudge {
    fn new(default_score: f64) -> Arc<Self> {
        Self::with_scores(default_score, &[])
    }

    fn with_scores(default_score: f64, scores: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            default_score,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JudgeBackend for ScriptedJudge {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let score = self
            .scores
            .get(&request.reference)
            .copied()
            .unwrap_or(self.default_score);
        Ok(JudgeReply::new(score, format!("scored {}", score)))
    }
}

struct BrokenJudge;

#[async_trait]
impl JudgeBackend for BrokenJudge {
    fn name(&self) -> &str {
        "broken"
    }

    async fn judge(&self, _request: &JudgeRequest) -> Result<JudgeReply> {
        anyhow::bail!("connection refused")
    }
}

fn evaluator(judge: Arc<ScriptedJudge>) -> Evaluator {
    Evaluator::judged(judge, MatchPolicy::default()).unwrap()
}

fn ann(label: &str, text: &str) -> Annotation {
    Annotation::new(label, text)
}

#[tokio::test]
async fn test_exact_match_is_containment() {
    let judge = ScriptedJudge::new(1.0);
    let mut eval = evaluator(judge.clone());

    let refs = vec![ann("Right to Delete", "You may request deletion of your data.")];
    let preds = vec![ann("Right to Delete", "You may request deletion of your data.")];

    let result = eval.evaluate(&refs, &preds).await;

    let decision = result.decisions.get(0).unwrap();
    assert_eq!(decision.status, MatchStatus::CorrectContainment);
    assert_eq!(decision.matched_count, 1);
    assert_eq!(
        decision.match_with.as_deref(),
        Some("You may request deletion of your data.")
    );
    assert!(decision.rationale.is_none());
    assert_eq!(result.metrics, Metrics::perfect());
    assert!(result.unmatched.is_empty());
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn test_over_extraction_skips_judge() {
    let judge = ScriptedJudge::new(0.0);
    let mut eval = evaluator(judge.clone());

    let refs = vec![ann("Data Retention", "retained for 12 months")];
    let preds = vec![ann(
        "Data Retention",
        "Account data is retained for 12 months after closure, after which it is anonymized \
         and kept only in aggregate form for statistics.",
    )];

    let result = eval.evaluate(&refs, &preds).await;

    let decision = result.decisions.get(0).unwrap();
    assert_eq!(decision.status, MatchStatus::CorrectContainment);
    assert_eq!(judge.calls(), 0);
    assert_eq!(result.metrics.recall, 1.0);
}

#[tokio::test]
async fn test_ambiguous_pair_goes_to_judge() {
    let judge = ScriptedJudge::new(0.8);
    let mut eval = evaluator(judge.clone());

    let refs = vec![ann("Right to Delete", "You may request deletion of your account records")];
    let preds = vec![ann("Right to Delete", "You may ask us to remove your account records")];

    let result = eval.evaluate(&refs, &preds).await;

    let decision = result.decisions.get(0).unwrap();
    assert_eq!(decision.status, MatchStatus::CorrectAi);
    assert_eq!(decision.matched_count, 1);
    assert_eq!(decision.rationale.as_deref(), Some("scored 0.8"));
    assert_eq!(judge.calls(), 1);
    assert_eq!(result.metrics, Metrics::perfect());
}

#[tokio::test]
async fn test_judge_below_threshold_rejects() {
    let judge = ScriptedJudge::new(0.5);
    let mut eval = evaluator(judge.clone());

    let refs = vec![ann("Right to Delete", "You may request deletion of your account records")];
    let preds = vec![ann("Right to Delete", "You may ask us to remove your account records")];

    let result = eval.evaluate(&refs, &preds).await;

    let decision = result.decisions.get(0).unwrap();
    assert_eq!(decision.status, MatchStatus::Wrong);
    assert_eq!(decision.matched_count, 0);
    assert_eq!(decision.rationale.as_deref(), Some("scored 0.5"));
    assert_eq!(
        decision.closest_match.as_deref(),
        Some("You may request deletion of your account records")
    );
    assert!(decision.closest_score.unwrap() > 0.1);
    assert_eq!(result.metrics, Metrics::zero());
    assert_eq!(result.unmatched, refs);
}

#[tokio::test]
async fn test_wrong_label_has_no_candidates() {
    let judge = ScriptedJudge::new(1.0);
    let mut eval = evaluator(judge.clone());

    let refs = vec![ann("Right to Delete", "You may request deletion of your data.")];
    let preds = vec![ann("Cookies", "You may request deletion of your data.")];

    let result = eval.evaluate(&refs, &preds).await;

    let decision = result.decisions.get(0).unwrap();
    assert_eq!(decision.status, MatchStatus::Wrong);
    assert!(decision.closest_match.is_none());
    assert_eq!(decision.closest_score, Some(0.0));
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn test_loose_label_match() {
    let judge = ScriptedJudge::new(1.0);
    let mut eval = evaluator(judge);

    let refs = vec![ann("Personal Information Collected", "we collect your email address")];
    let preds = vec![ann("Information Collected", "we collect your email address")];

    let result = eval.evaluate(&refs, &preds).await;
    assert_eq!(
        result.decisions.get(0).unwrap().status,
        MatchStatus::CorrectContainment
    );
}

#[tokio::test]
async fn test_one_prediction_matches_two_references() {
    let judge = ScriptedJudge::new(0.9);
    let mut eval = evaluator(judge.clone());

    let refs = vec![
        ann("Data Collected", "email address is stored"),
        ann("Data Collected", "phone number is stored"),
    ];
    let preds = vec![ann(
        "Data Collected",
        "Contact details: email address and phone number",
    )];

    let result = eval.evaluate(&refs, &preds).await;

    let decision = result.decisions.get(0).unwrap();
    assert_eq!(decision.status, MatchStatus::CorrectAi);
    assert_eq!(decision.matched_count, 2);
    assert_eq!(decision.matched_indices().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(judge.calls(), 2);
    assert_eq!(result.metrics.recall, 1.0);
    assert_eq!(result.metrics.precision, 1.0);
}

#[tokio::test]
async fn test_first_rejection_rationale_is_reported() {
    let judge = ScriptedJudge::with_scores(
        0.0,
        &[
            ("email address is stored", 0.2),
            ("phone number is stored", 0.3),
        ],
    );
    let mut eval = evaluator(judge.clone());

    let refs = vec![
        ann("Data Collected", "email address is stored"),
        ann("Data Collected", "phone number is stored"),
    ];
    let preds = vec![ann(
        "Data Collected",
        "Contact details: email address and phone number",
    )];

    let result = eval.evaluate(&refs, &preds).await;

    let decision = result.decisions.get(0).unwrap();
    assert_eq!(decision.status, MatchStatus::Wrong);
    assert_eq!(decision.rationale.as_deref(), Some("scored 0.2"));
    assert_eq!(
        decision.closest_match.as_deref(),
        Some("email address is stored")
    );
}

#[tokio::test]
async fn test_two_predictions_same_reference() {
    let judge = ScriptedJudge::new(0.0);
    let mut eval = evaluator(judge);

    let refs = vec![
        ann("Sharing", "we do not sell personal data"),
        ann("Sharing", "we share data with processors"),
    ];
    let preds = vec![
        ann("Sharing", "we do not sell personal data"),
        ann("Sharing", "We do not sell personal data."),
    ];

    let result = eval.evaluate(&refs, &preds).await;

    assert_eq!(result.decisions.true_positives(), 2);
    assert_eq!(result.metrics.precision, 1.0);
    assert_eq!(result.metrics.recall, 0.5);
    assert_eq!(result.unmatched, vec![refs[1].clone()]);
}

#[tokio::test]
async fn test_empty_inputs() {
    let mut eval = evaluator(ScriptedJudge::new(1.0));

    let result = eval.evaluate(&[], &[]).await;
    assert_eq!(result.metrics, Metrics::perfect());
    assert!(result.decisions.is_empty());

    let refs = vec![ann("A label", "first"), ann("B label", "second")];
    let result = eval.evaluate(&refs, &[]).await;
    assert_eq!(result.metrics, Metrics::zero());
    assert_eq!(result.unmatched, refs);

    let preds = vec![ann("A label", "first")];
    let result = eval.evaluate(&[], &preds).await;
    assert_eq!(result.metrics, Metrics::zero());
    assert_eq!(result.decisions.len(), 1);
    assert_eq!(result.decisions.get(0).unwrap().status, MatchStatus::Wrong);
}

#[tokio::test]
async fn test_judge_fault_does_not_abort() {
    let mut eval = Evaluator::judged(Arc::new(BrokenJudge), MatchPolicy::default()).unwrap();

    let refs = vec![
        ann("Right to Delete", "You may request deletion of your account records"),
        ann("Retention", "kept for 30 days"),
    ];
    let preds = vec![
        ann("Right to Delete", "You may ask us to remove your account records"),
        ann("Retention", "logs are kept for 30 days"),
    ];

    let result = eval.evaluate(&refs, &preds).await;

    let first = result.decisions.get(0).unwrap();
    assert_eq!(first.status, MatchStatus::Wrong);
    assert!(first.rationale.as_deref().unwrap().starts_with("Error:"));

    let second = result.decisions.get(1).unwrap();
    assert_eq!(second.status, MatchStatus::CorrectContainment);

    let stats = eval.cache_stats().unwrap();
    assert_eq!(stats.faults, 1);
    assert_eq!(stats.entries, 0);
}

#[tokio::test]
async fn test_malformed_records_degrade_to_wrong() {
    let mut eval = evaluator(ScriptedJudge::new(1.0));

    let records: Vec<Annotation> = serde_json::from_str(
        r#"[
            {"category": "Right to Delete", "segment": "You may request deletion of your data."},
            {"unexpected": 1},
            null
        ]"#,
    )
    .unwrap();
    let refs = vec![ann("Right to Delete", "You may request deletion of your data.")];

    let result = eval.evaluate(&refs, &records).await;

    assert_eq!(result.decisions.len(), 3);
    assert_eq!(
        result.decisions.get(0).unwrap().status,
        MatchStatus::CorrectContainment
    );
    assert_eq!(result.decisions.get(1).unwrap().status, MatchStatus::Wrong);
    assert_eq!(result.decisions.get(2).unwrap().status, MatchStatus::Wrong);
}

#[tokio::test]
async fn test_metrics_stay_in_unit_range() {
    let mut eval = evaluator(ScriptedJudge::new(0.7));

    let refs = vec![
        ann("Data Collected", "email address is stored"),
        ann("Data Collected", "phone number is stored"),
        ann("Sharing", "we do not sell personal data"),
    ];
    let preds = vec![
        ann("Data Collected", "Contact details: email address and phone number"),
        ann("Sharing", "we do not sell personal data"),
        ann("Sharing", "nothing to see here"),
        ann("Other", ""),
        ann("", ""),
    ];

    for n in 0..=preds.len() {
        let result = eval.evaluate(&refs, &preds[..n]).await;
        for v in [result.metrics.precision, result.metrics.recall, result.metrics.f1] {
            assert!((0.0..=1.0).contains(&v), "metric {} out of range", v);
        }
        assert_eq!(result.decisions.len(), n);
    }
}

#[tokio::test]
async fn test_warm_cache_gives_identical_results() {
    let judge = ScriptedJudge::with_scores(0.0, &[("email address is stored", 0.9)]);
    let mut eval = evaluator(judge.clone());

    let refs = vec![
        ann("Data Collected", "email address is stored"),
        ann("Data Collected", "phone number is stored"),
    ];
    let preds = vec![
        ann("Data Collected", "Contact details: email address and phone number"),
        ann("Data Collected", "phone number"),
    ];

    let cold = eval.evaluate(&refs, &preds).await;
    let calls_after_cold = judge.calls();
    let warm = eval.evaluate(&refs, &preds).await;

    assert_eq!(cold, warm);
    assert_eq!(judge.calls(), calls_after_cold);
    assert!(eval.cache_stats().unwrap().hits > 0);

    // A fresh evaluator agrees with the warmed one
    let mut fresh = evaluator(ScriptedJudge::with_scores(0.0, &[("email address is stored", 0.9)]));
    let again = fresh.evaluate(&refs, &preds).await;
    assert_eq!(again, warm);
}
