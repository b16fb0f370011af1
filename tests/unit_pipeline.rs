// Unit tests for the flagging pipeline.
//
// Uses a deterministic stub oracle keyed on post text, so every scenario
// pins the classifier's answer exactly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use nextsight::models::TextItem;
use nextsight::pipeline::{classify, findings_for, run, GENERAL_TOXICITY, TOXICITY_THRESHOLD};
use nextsight::taxonomy::Taxonomy;
use nextsight::toxicity::traits::{ToxicityOracle, Verdict};

/// Returns a fixed "toxic" confidence per text; unknown text scores 0.0.
/// Texts starting with "FAIL" error out.
struct StubOracle {
    scores: HashMap<String, f64>,
    calls: AtomicUsize,
}

impl StubOracle {
    fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ToxicityOracle for StubOracle {
    async fn score(&self, text: &str) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.starts_with("FAIL") {
            anyhow::bail!("input too large");
        }
        Ok(Verdict::new("toxic", self.scores.get(text).copied().unwrap_or(0.0)))
    }
}

fn harassment() -> Taxonomy {
    Taxonomy::from_json(r#"{"Harassment": ["idiot"]}"#).unwrap()
}

// ============================================================
// Scenarios
// ============================================================

#[tokio::test]
async fn keyword_match_below_threshold_uses_shared_score() {
    let oracle = StubOracle::new(&[("you are an idiot", 0.40)]);
    let item = TextItem::new("1", "you are an idiot");

    let findings = classify(&item, &harassment(), &oracle).await;

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].category, "Harassment");
    assert!((findings[0].score - 0.40).abs() < 1e-12);
}

#[tokio::test]
async fn benign_post_yields_nothing() {
    let oracle = StubOracle::new(&[("nice weather today", 0.10)]);
    let item = TextItem::new("1", "nice weather today");

    assert!(classify(&item, &harassment(), &oracle).await.is_empty());
}

#[tokio::test]
async fn confident_toxicity_without_keywords() {
    let oracle = StubOracle::new(&[("get lost, nobody wants you", 0.95)]);
    let item = TextItem::new("1", "get lost, nobody wants you");

    let findings = classify(&item, &harassment(), &oracle).await;

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].category, GENERAL_TOXICITY);
    assert!((findings[0].score - 0.95).abs() < 1e-12);
}

#[tokio::test]
async fn oracle_failure_degrades_to_keywords_only() {
    let oracle = StubOracle::new(&[]);
    let item = TextItem::new("1", "FAIL but still an idiot");

    let findings = classify(&item, &harassment(), &oracle).await;

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].category, "Harassment");
    assert_eq!(findings[0].score, 0.0);
}

#[tokio::test]
async fn oracle_is_called_once_per_post() {
    let taxonomy = Taxonomy::from_json(r#"{"A": ["x"], "B": ["x"], "C": ["x"]}"#).unwrap();
    let oracle = StubOracle::new(&[("x", 0.9)]);
    let findings = classify(&TextItem::new("1", "x"), &taxonomy, &oracle).await;

    assert_eq!(findings.len(), 4);
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
}

// ============================================================
// Batch driver
// ============================================================

#[tokio::test]
async fn run_preserves_input_order_with_fan_out() {
    let oracle = StubOracle::new(&[("idiot one", 0.9), ("idiot three", 0.2)]);
    let items = vec![
        TextItem::new("1", "idiot one"),
        TextItem::new("2", "calm"),
        TextItem::new("3", "idiot three"),
        TextItem::new("4", "FAIL idiot four"),
    ];
    let cancel = CancellationToken::new();

    let outcome = run(&items, &harassment(), &oracle, 3, &cancel).await;

    assert!(!outcome.cancelled);
    assert_eq!(outcome.items_analyzed, 4);
    let ids: Vec<&str> = outcome.findings.iter().map(|f| f.item_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "1", "3", "4"]);
    assert_eq!(outcome.findings[0].category, GENERAL_TOXICITY);
}

#[tokio::test]
async fn run_is_idempotent() {
    let oracle = StubOracle::new(&[("idiot", 0.9), ("meh idiot", 0.5)]);
    let items = vec![TextItem::new("1", "idiot"), TextItem::new("2", "meh idiot")];
    let cancel = CancellationToken::new();

    let first = run(&items, &harassment(), &oracle, 2, &cancel).await;
    let second = run(&items, &harassment(), &oracle, 2, &cancel).await;
    assert_eq!(first.findings, second.findings);
}

/// Never answers, so the only way out is cancellation.
struct HangingOracle;

#[async_trait]
impl ToxicityOracle for HangingOracle {
    async fn score(&self, _text: &str) -> Result<Verdict> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

#[tokio::test]
async fn cancellation_drops_in_flight_posts() {
    let items = vec![TextItem::new("1", "idiot")];
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let outcome = run(&items, &harassment(), &HangingOracle, 1, &cancel).await;

    assert!(outcome.cancelled);
    assert_eq!(outcome.items_analyzed, 0);
    assert!(outcome.findings.is_empty());
}

#[tokio::test]
async fn already_cancelled_run_processes_nothing() {
    let oracle = StubOracle::new(&[]);
    let items = vec![TextItem::new("1", "idiot")];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = run(&items, &harassment(), &oracle, 1, &cancel).await;
    assert!(outcome.cancelled);
    assert!(outcome.findings.is_empty());
}

// ============================================================
// Properties
// ============================================================

proptest! {
    #[test]
    fn no_trigger_and_low_confidence_means_no_findings(
        body in "[a-h ]{0,40}",
        confidence in 0.0f64..=TOXICITY_THRESHOLD,
    ) {
        // Triggers use letters outside the body alphabet.
        let taxonomy = Taxonomy::from_json(r#"{"Harassment": ["xyz"], "Spam": ["qq"]}"#).unwrap();
        let item = TextItem::new("1", body);
        let findings = findings_for(&item, &taxonomy, &Verdict::new("toxic", confidence));
        prop_assert!(findings.is_empty());
    }

    #[test]
    fn confident_toxicity_gives_exactly_one_general_finding(
        body in "[a-z ]{0,40}",
        confidence in 0.8501f64..=1.0,
        entries in prop::collection::vec(
            (
                prop_oneof![
                    Just("General Toxicity".to_string()),
                    Just(" general TOXICITY ".to_string()),
                    "[A-Za-z ]{1,20}",
                ],
                prop::collection::vec("[a-z]{1,4}", 1..4),
            ),
            1..5,
        ),
    ) {
        // Keyword files that fail validation never reach the pipeline.
        let Ok(taxonomy) = Taxonomy::from_entries(entries) else {
            return Ok(());
        };
        let item = TextItem::new("1", body);
        let findings = findings_for(&item, &taxonomy, &Verdict::new("toxic", confidence));
        let general: Vec<_> = findings.iter().filter(|f| f.category == GENERAL_TOXICITY).collect();
        prop_assert_eq!(general.len(), 1);
        prop_assert!((general[0].score - confidence).abs() < 1e-12);
    }

    #[test]
    fn trigger_matches_regardless_of_case(
        prefix in "[a-z ]{0,10}",
        suffix in "[a-z ]{0,10}",
        upper in proptest::bool::ANY,
    ) {
        let trigger = if upper { "IDIOT" } else { "IdIoT" };
        let item = TextItem::new("1", format!("{prefix}{trigger}{suffix}"));
        let findings = findings_for(&item, &harassment(), &Verdict::new("toxic", 0.1));
        prop_assert_eq!(findings.len(), 1);
        prop_assert_eq!(findings[0].category.as_str(), "Harassment");
    }
}
