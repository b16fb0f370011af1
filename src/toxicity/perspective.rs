// Google Perspective API oracle.
//
// Perspective returns a TOXICITY probability per comment. It's free to use
// but rate-limited to ~1 QPS, so every call goes through the rate limiter.
// The probability is folded into a binary verdict: "toxic" with confidence
// p when p >= 0.5, otherwise "non_toxic" with confidence 1 - p.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods


use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rate_limiter::RateLimiter;
use super::traits::{ToxicityOracle, Verdict};

const ANALYZE_URL: &str = "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Perspective API toxicity oracle.
pub struct PerspectiveOracle {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl PerspectiveOracle {
    /// Create a new Perspective API oracle with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            // Perspective free tier: 1 query per second
            rate_limiter: RateLimiter::new(1.0),
        }
    }
}

#[async_trait]
impl ToxicityOracle for PerspectiveOracle {
    async fn score(&self, text: &str) -> Result<Verdict> {
        self.rate_limiter.acquire().await;

        let request = PerspectiveRequest {
            comment: Comment {
                text: text.to_string(),
            },
            requested_attributes: RequestedAttributes {
                toxicity: AttributeConfig {},
            },
            languages: vec!["en".to_string()],
        };

        let response = self
            .client
            .post(ANALYZE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to call Perspective API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Perspective API returned {}: {}", status, body);
        }

        let result: PerspectiveResponse = response
            .json()
            .await
            .context("Failed to parse Perspective API response")?;

        let probability = result
            .attribute_scores
            .get("TOXICITY")
            .map(|score| score.summary_score.value)
            .context("Perspective API response has no TOXICITY score")?;

        let verdict = verdict_from_probability(probability);

        debug!(
            label = %verdict.label,
            confidence = verdict.confidence,
            text_preview = %crate::output::truncate_chars(text, 50),
            "Perspective scored text"
        );

        Ok(verdict)
    }
}

/// Fold a toxicity probability into a top-label verdict.
fn verdict_from_probability(p: f64) -> Verdict {
    if p >= 0.5 {
        Verdict::new("toxic", p)
    } else {
        Verdict::new("non_toxic", 1.0 - p)
    }
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest {
    comment: Comment,
    requested_attributes: RequestedAttributes,
    languages: Vec<String>,
}

#[derive(Serialize)]
struct Comment {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RequestedAttributes {
    toxicity: AttributeConfig,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    attribute_scores: HashMap<String, AttributeScore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Deserialize)]
struct SummaryScore {
    value: f64,
}
