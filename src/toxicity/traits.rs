// Toxicity oracle trait: the swap-ready abstraction.
//
// An oracle maps text to a top label and a confidence. It is treated as a
// black box: the same text may score slightly differently across model
// versions, so callers only rely on ordering stability within one run.

use anyhow::Result;
use async_trait::async_trait;

/// Labels that denote the harmful class. Binary classifiers report "toxic";
/// the multi-label Detoxify family reports "toxicity".
pub const HARMFUL_LABELS: [&str; 2] = ["toxic", "toxicity"];

/// The classifier's answer for one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Top label reported by the classifier
    pub label: String,
    /// Confidence for that label, 0.0 to 1.0
    pub confidence: f64,
}

impl Verdict {
    /// Confidence is clamped to [0, 1]; NaN and infinities count as 0.
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Verdict used when an item could not be scored: no toxicity signal.
    pub fn none() -> Self {
        Self::new("unscored", 0.0)
    }

    pub fn is_harmful(&self) -> bool {
        HARMFUL_LABELS
            .iter()
            .any(|l| self.label.eq_ignore_ascii_case(l))
    }

    /// Toxicity confidence shared by every finding for this item:
    /// the confidence when the label is harmful, otherwise 0.
    pub fn toxicity(&self) -> f64 {
        if self.is_harmful() {
            self.confidence
        } else {
            0.0
        }
    }
}

/// Trait for scoring text toxicity. Implementations are async because
/// inference is latency-heavy and some providers are remote HTTP APIs.
#[async_trait]
pub trait ToxicityOracle: Send + Sync {
    /// Score a single text.
    async fn score(&self, text: &str) -> Result<Verdict>;

    /// Score multiple texts, returning results in the same order.
    /// Default implementation calls score sequentially; providers
    /// can override for batching if they support it.
    async fn score_batch(&self, texts: &[String]) -> Result<Vec<Verdict>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.score(text).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harmful_label_keeps_confidence() {
        let v = Verdict::new("toxic", 0.4);
        assert!(v.is_harmful());
        assert!((v.toxicity() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn benign_label_has_zero_toxicity() {
        let v = Verdict::new("insult", 0.97);
        assert!(!v.is_harmful());
        assert_eq!(v.toxicity(), 0.0);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Verdict::new("toxic", 1.7).confidence, 1.0);
        assert_eq!(Verdict::new("toxic", -0.2).confidence, 0.0);
    }

    #[test]
    fn non_finite_confidence_is_zero() {
        assert_eq!(Verdict::new("toxic", f64::NAN).confidence, 0.0);
        assert_eq!(Verdict::new("toxic", f64::INFINITY).toxicity(), 0.0);
        assert_eq!(Verdict::new("toxic", f64::NEG_INFINITY).toxicity(), 0.0);
    }

    #[test]
    fn unscored_verdict_carries_no_signal() {
        assert_eq!(Verdict::none().toxicity(), 0.0);
    }
}
