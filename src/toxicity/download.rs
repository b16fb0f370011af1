// Model download helper for the local toxicity model.
//
// Downloads the quantized ONNX export of toxic-bert and its tokenizer from
// HuggingFace. Files are stored in a platform-appropriate directory
// (~/.local/share/nextsight/models/ on Linux) so they persist across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// HuggingFace repo for the toxicity model.
const TOXICITY_HF_URL: &str = "https://huggingface.co/Xenova/toxic-bert/resolve/main";

/// Remote paths within the repo.
const REMOTE_MODEL_PATH: &str = "onnx/model_quantized.onnx";
const REMOTE_TOKENIZER_PATH: &str = "tokenizer.json";

/// Local file names within the model directory.
pub const TOXICITY_MODEL_FILE: &str = "model_quantized.onnx";
pub const TOXICITY_TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nextsight")
        .join("models")
}

/// Check whether both required model files exist.
pub fn model_files_present(dir: &Path) -> bool {
    dir.join(TOXICITY_MODEL_FILE).exists() && dir.join(TOXICITY_TOKENIZER_FILE).exists()
}

/// Download the toxicity model and tokenizer.
///
/// Skips files that already exist and creates the directory as needed.
pub async fn download_model(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nToxicity model (toxic-bert):");

    let tokenizer_path = dir.join(TOXICITY_TOKENIZER_FILE);
    if tokenizer_path.exists() {
        info!("Tokenizer already exists, skipping");
        println!("  {} (already exists)", TOXICITY_TOKENIZER_FILE);
    } else {
        println!("  Downloading {}...", TOXICITY_TOKENIZER_FILE);
        download_file(
            &format!("{}/{}", TOXICITY_HF_URL, REMOTE_TOKENIZER_PATH),
            &tokenizer_path,
            false,
        )
        .await?;
    }

    let model_path = dir.join(TOXICITY_MODEL_FILE);
    if model_path.exists() {
        info!("Model already exists, skipping");
        println!("  {} (already exists)", TOXICITY_MODEL_FILE);
    } else {
        println!("  Downloading {} (~110 MB)...", TOXICITY_MODEL_FILE);
        download_file(
            &format!("{}/{}", TOXICITY_HF_URL, REMOTE_MODEL_PATH),
            &model_path,
            true,
        )
        .await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        Some(progress_bar(response.content_length())?)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(ref pb) = pb {
        pb.set_position(bytes.len() as u64);
    }

    // Write beside the destination and rename, so an interrupted download
    // never leaves a truncated model that passes `model_files_present`.
    let partial = dest.with_extension("part");
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

fn progress_bar(total_size: Option<u64>) -> Result<ProgressBar> {
    let pb = match total_size {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .context("invalid progress template")?
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .context("invalid progress template")?,
            );
            pb
        }
    };
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_nextsight() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("nextsight") && path_str.contains("models"),
            "Expected path containing nextsight/models, got: {path_str}"
        );
    }

    #[test]
    fn test_model_files_present_false_when_empty() {
        let dir = std::env::temp_dir().join("nextsight-test-nonexistent");
        assert!(!model_files_present(&dir));
    }

    #[test]
    fn test_model_files_present_true_when_files_exist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOXICITY_MODEL_FILE), b"fake").unwrap();
        std::fs::write(dir.path().join(TOXICITY_TOKENIZER_FILE), b"fake").unwrap();
        assert!(model_files_present(dir.path()));
    }
}
