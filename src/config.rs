use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Which toxicity oracle backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum ScorerBackend {
    /// Local ONNX model (default), no API key needed
    Onnx,
    /// Google Perspective API, requires PERSPECTIVE_API_KEY, 1 QPS limit
    Perspective,
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. The X API
/// bearer token is not here; it lives in the credential vault.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file mapping category names to trigger words
    pub keywords_path: PathBuf,
    /// Directory holding the encryption key and the sealed bearer token
    pub vault_dir: PathBuf,
    /// Where Markdown reports are written
    pub reports_dir: PathBuf,
    /// X API endpoint (defaults to https://api.twitter.com)
    pub api_url: String,
    /// Which toxicity oracle to use (default: Onnx)
    pub scorer_backend: ScorerBackend,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    pub perspective_api_key: String,
}

impl Config {
    /// Load configuration from environment variables, with defaults for everything.
    pub fn load() -> Result<Self> {
        let scorer_backend = match env::var("NEXTSIGHT_SCORER").as_deref() {
            Ok("perspective") => ScorerBackend::Perspective,
            Ok("onnx") | Err(_) => ScorerBackend::Onnx,
            Ok(other) => {
                return Err(Error::OracleUnavailable(format!(
                    "unknown NEXTSIGHT_SCORER \"{other}\" (expected onnx or perspective)"
                )))
            }
        };

        Ok(Self {
            keywords_path: path_var("NEXTSIGHT_KEYWORDS_PATH")
                .unwrap_or_else(|| PathBuf::from("keywords.json")),
            vault_dir: path_var("NEXTSIGHT_VAULT_DIR").unwrap_or_else(default_vault_dir),
            reports_dir: path_var("NEXTSIGHT_REPORTS_DIR")
                .unwrap_or_else(|| PathBuf::from("reports")),
            api_url: env::var("X_API_URL")
                .unwrap_or_else(|_| crate::xapi::client::DEFAULT_API_URL.to_string()),
            scorer_backend,
            model_dir: path_var("NEXTSIGHT_MODEL_DIR")
                .unwrap_or_else(crate::toxicity::download::default_model_dir),
            perspective_api_key: env::var("PERSPECTIVE_API_KEY").unwrap_or_default(),
        })
    }

    /// Validate that the chosen oracle backend has what it needs.
    /// Runs before any post is fetched or scored.
    pub fn require_scorer(&self) -> Result<()> {
        match self.scorer_backend {
            ScorerBackend::Onnx => {
                if !crate::toxicity::download::model_files_present(&self.model_dir) {
                    return Err(Error::OracleUnavailable(format!(
                        "ONNX model files not found in {}\n\
                         Run `nextsight download-model` to download them.\n\
                         Or set NEXTSIGHT_SCORER=perspective to use the Perspective API instead.",
                        self.model_dir.display()
                    )));
                }
                Ok(())
            }
            ScorerBackend::Perspective => {
                if self.perspective_api_key.is_empty() {
                    return Err(Error::OracleUnavailable(
                        "PERSPECTIVE_API_KEY not set. Add it to your .env file.".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Platform data directory: ~/.local/share/nextsight/vault on Linux.
pub fn default_vault_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nextsight")
        .join("vault")
}
