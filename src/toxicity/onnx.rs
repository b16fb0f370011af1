// Local ONNX toxicity oracle using the toxic-bert model.
//
// Runs entirely on the local CPU. No API calls, no rate limits, no network
// dependency once the model is downloaded. The model is multi-label: each
// of its six heads gets an independent sigmoid probability, and the verdict
// reports the strongest head, as a text-classification pipeline would.
//
// Model: Xenova/toxic-bert (ONNX export of unitary/toxic-bert, quantized)

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::download::{TOXICITY_MODEL_FILE, TOXICITY_TOKENIZER_FILE};
use super::traits::{ToxicityOracle, Verdict};
use crate::error::Error;

/// Labels output by toxic-bert, in the order the model returns them.
const LABEL_ORDER: [&str; 6] = [
    "toxic",
    "severe_toxic",
    "obscene",
    "threat",
    "insult",
    "identity_hate",
];

/// BERT's positional limit. Longer posts are truncated rather than rejected.
const MAX_SEQUENCE_LEN: usize = 512;

/// Local ONNX-based toxicity oracle. Holds the model session and tokenizer
/// behind Arc<Mutex> so inference can be offloaded to spawn_blocking without
/// blocking the async runtime.
pub struct OnnxOracle {
    // ort::Session::run takes &mut self, and spawn_blocking needs 'static
    // handles, hence Arc<Mutex<_>>.
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxOracle {
    /// Load the ONNX model and tokenizer from the given directory.
    ///
    /// Any failure here is `OracleUnavailable`: the run must not start
    /// without a working classifier.
    pub fn load(model_dir: &Path) -> Result<Self, Error> {
        let model_path = model_dir.join(TOXICITY_MODEL_FILE);
        let tokenizer_path = model_dir.join(TOXICITY_TOKENIZER_FILE);

        if !model_path.exists() {
            return Err(Error::OracleUnavailable(format!(
                "model file not found: {}\nRun `nextsight download-model` to download it.",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(Error::OracleUnavailable(format!(
                "tokenizer file not found: {}\nRun `nextsight download-model` to download it.",
                tokenizer_path.display()
            )));
        }

        let mut builder = Session::builder().map_err(|e| {
            Error::OracleUnavailable(format!("failed to create ONNX session builder: {e}"))
        })?;
        let session = builder
            .commit_from_file(&model_path)
            .map_err(|e| {
                Error::OracleUnavailable(format!(
                    "failed to load ONNX model from {}: {e}",
                    model_path.display()
                ))
            })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::OracleUnavailable(format!("failed to load tokenizer: {e}")))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| Error::OracleUnavailable(format!("failed to configure tokenizer: {e}")))?;

        debug!("Loaded ONNX toxicity model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl ToxicityOracle for OnnxOracle {
    async fn score(&self, text: &str) -> Result<Verdict> {
        let mut results = self.score_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| anyhow::anyhow!("model returned no output for input"))
    }

    /// Batch inference: tokenize all texts, run one forward pass, apply
    /// sigmoid to the logits and pick the strongest label per row.
    async fn score_batch(&self, texts: &[String]) -> Result<Vec<Verdict>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let encodings: Vec<_> = texts
                .iter()
                .map(|t| {
                    tokenizer
                        .encode(t.as_str(), true)
                        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
                })
                .collect::<Result<Vec<_>>>()?;

            let batch_size = encodings.len();
            let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

            // Right-pad to max_len. Shape: [batch_size, max_len]
            let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
            let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

            for enc in &encodings {
                let ids = enc.get_ids();
                let mask = enc.get_attention_mask();

                input_ids_flat.extend(ids.iter().map(|&id| id as i64));
                attention_mask_flat.extend(mask.iter().map(|&m| m as i64));

                // BERT pad token id is 0
                for _ in ids.len()..max_len {
                    input_ids_flat.push(0);
                    attention_mask_flat.push(0);
                }
            }
            let token_type_ids_flat = vec![0i64; batch_size * max_len];

            let shape = [batch_size as i64, max_len as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids_flat))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat))
                .context("Failed to create attention_mask tensor")?;
            let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids_flat))
                .context("Failed to create token_type_ids tensor")?;

            let logits_data = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor,
                        "token_type_ids" => token_type_ids_tensor
                    })
                    .context("ONNX inference failed")?;

                // Output shape: [batch_size, 6], raw logits (pre-sigmoid)
                let (_out_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            if logits_data.len() < batch_size * LABEL_ORDER.len() {
                anyhow::bail!(
                    "Model output has {} values, expected {}",
                    logits_data.len(),
                    batch_size * LABEL_ORDER.len()
                );
            }

            let mut results = Vec::with_capacity(batch_size);
            for (i, text) in texts.iter().enumerate() {
                let offset = i * LABEL_ORDER.len();
                let row = &logits_data[offset..offset + LABEL_ORDER.len()];
                let scores: Vec<f64> = row.iter().map(|&logit| sigmoid(logit as f64)).collect();

                let verdict = top_label(&scores);

                debug!(
                    label = %verdict.label,
                    confidence = verdict.confidence,
                    text_preview = %crate::output::truncate_chars(text, 50),
                    "ONNX scored text"
                );

                results.push(verdict);
            }

            Ok(results)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Pick the highest-probability label. Ties go to the earlier label, so
/// "toxic" wins over its sub-labels at equal confidence.
fn top_label(scores: &[f64]) -> Verdict {
    let (idx, best) = scores
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |(bi, bs), (i, &s)| if s > bs { (i, s) } else { (bi, bs) });
    Verdict::new(LABEL_ORDER[idx], best)
}
