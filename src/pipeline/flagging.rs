use std::pin::pin;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::{Finding, TextItem};
use crate::taxonomy::Taxonomy;
use crate::toxicity::traits::{ToxicityOracle, Verdict};

/// Harmful-class confidence must exceed this to raise a General Toxicity finding.
pub const TOXICITY_THRESHOLD: f64 = 0.85;

/// Category name for classifier-only findings.
pub const GENERAL_TOXICITY: &str = "General Toxicity";

/// Result of running the pipeline over a batch of posts.
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    /// Findings in input order: all of post i's findings precede post j's when i < j.
    pub findings: Vec<Finding>,
    /// Posts whose classification completed.
    pub items_analyzed: usize,
    /// True if the run stopped at the cancellation token.
    pub cancelled: bool,
}

/// Classify a single post.
///
/// An oracle failure for this post is logged and treated as zero toxicity;
/// keyword matching still runs.
pub async fn classify(
    item: &TextItem,
    taxonomy: &Taxonomy,
    oracle: &dyn ToxicityOracle,
) -> Vec<Finding> {
    let verdict = match oracle.score(&item.body).await {
        Ok(v) => v,
        Err(e) => {
            let err = Error::OracleItem {
                item_id: item.id.clone(),
                reason: format!("{e:#}"),
            };
            warn!(item_id = %item.id, error = %err, "Scoring failed, continuing with keywords only");
            Verdict::none()
        }
    };

    findings_for(item, taxonomy, &verdict)
}

/// Combine an oracle verdict with taxonomy matches for one post.
pub fn findings_for(item: &TextItem, taxonomy: &Taxonomy, verdict: &Verdict) -> Vec<Finding> {
    let toxicity = verdict.toxicity();
    let mut findings = Vec::new();

    if toxicity > TOXICITY_THRESHOLD {
        findings.push(Finding::from_item(item, GENERAL_TOXICITY, toxicity));
    }

    for category in taxonomy.matching(&item.body) {
        findings.push(Finding::from_item(item, &category.name, toxicity));
    }

    if !findings.is_empty() {
        debug!(
            item_id = %item.id,
            findings = findings.len(),
            toxicity = toxicity,
            text_preview = %crate::output::truncate_chars(&item.body, 50),
            "Flagged post"
        );
    }

    findings
}

/// Classify every post, up to `concurrency` at a time, stopping early if
/// `cancel` fires.
///
/// Output order always matches input order. A post still being scored when
/// the token fires is dropped whole; its findings never appear.
pub async fn run(
    items: &[TextItem],
    taxonomy: &Taxonomy,
    oracle: &dyn ToxicityOracle,
    concurrency: usize,
    cancel: &CancellationToken,
) -> PipelineRun {
    let pb = ProgressBar::new(items.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("  Analyzing [{bar:30}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut results = pin!(stream::iter(
        items
            .iter()
            .map(move |item| classify(item, taxonomy, oracle))
    )
    .buffered(concurrency.max(1)));

    let mut outcome = PipelineRun::default();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            next = results.next() => {
                match next {
                    Some(item_findings) => {
                        outcome.findings.extend(item_findings);
                        outcome.items_analyzed += 1;
                        pb.inc(1);
                    }
                    None => break,
                }
            }
        }
    }
    pb.finish_and_clear();

    if outcome.cancelled {
        warn!(
            analyzed = outcome.items_analyzed,
            total = items.len(),
            "Analysis cancelled"
        );
    } else {
        info!(
            analyzed = outcome.items_analyzed,
            findings = outcome.findings.len(),
            "Analysis complete"
        );
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_entries(vec![
            ("Harassment", vec!["idiot"]),
            ("Spam", vec!["free money"]),
        ])
        .unwrap()
    }

    #[test]
    fn threshold_is_exclusive() {
        let item = TextItem::new("1", "plain text");
        let at = findings_for(&item, &taxonomy(), &Verdict::new("toxic", 0.85));
        assert!(at.is_empty(), "0.85 exactly must not flag");

        let above = findings_for(&item, &taxonomy(), &Verdict::new("toxic", 0.8501));
        assert_eq!(above.len(), 1);
        assert_eq!(above[0].category, GENERAL_TOXICITY);
    }

    #[test]
    fn general_toxicity_comes_before_keyword_findings() {
        let item = TextItem::new("1", "you idiot, free money here");
        let findings = findings_for(&item, &taxonomy(), &Verdict::new("toxic", 0.95));
        let categories: Vec<&str> = findings.iter().map(|f| f.category.as_str()).collect();
        assert_eq!(categories, vec![GENERAL_TOXICITY, "Harassment", "Spam"]);
        assert!(findings.iter().all(|f| (f.score - 0.95).abs() < 1e-12));
    }

    #[test]
    fn keyword_findings_share_zero_score_for_non_harmful_label() {
        let item = TextItem::new("1", "IDIOT");
        let findings = findings_for(&item, &taxonomy(), &Verdict::new("insult", 0.99));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "Harassment");
        assert_eq!(findings[0].score, 0.0);
    }

    #[test]
    fn one_finding_per_category_even_with_many_hits() {
        let t = Taxonomy::from_entries(vec![("Harassment", vec!["idiot", "moron"])]).unwrap();
        let item = TextItem::new("1", "idiot idiot moron");
        let findings = findings_for(&item, &t, &Verdict::new("toxic", 0.1));
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn nan_confidence_never_reaches_a_finding() {
        let item = TextItem::new("1", "idiot");
        let findings = findings_for(&item, &taxonomy(), &Verdict::new("toxic", f64::NAN));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].score, 0.0);
    }

    #[test]
    fn finding_carries_source_fields() {
        let item = TextItem::new("42", "what an idiot");
        let findings = findings_for(&item, &taxonomy(), &Verdict::new("toxic", 0.3));
        assert_eq!(findings[0].item_id, "42");
        assert_eq!(findings[0].source_text, "what an idiot");
    }
}
