// Typed failures for the analysis run.
//
// Fatal kinds stop the run before a report is written. OracleItem is the
// only recoverable kind: the pipeline logs it and scores the post with
// zero toxicity instead of propagating it.

use thiserror::Error;

/// Errors produced by the keyword taxonomy, the oracle, the vault and the fetcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Keyword file missing, unreadable or not a category → word-list mapping.
    #[error("keyword configuration invalid: {0}")]
    ConfigInvalid(String),

    /// The toxicity classifier could not be initialized.
    #[error("toxicity classifier unavailable: {0}")]
    OracleUnavailable(String),

    /// Scoring a single post failed. Recovered locally by the pipeline.
    #[error("failed to score post {item_id}: {reason}")]
    OracleItem { item_id: String, reason: String },

    /// Key or ciphertext is missing, unreadable, or does not authenticate.
    #[error("credential vault corrupted: {0}")]
    VaultCorrupted(String),

    /// No credential could be obtained from the operator.
    #[error("credential entry failed: {0}")]
    CredentialEntry(String),

    /// The post source returned no usable data.
    #[error("failed to fetch posts: {0}")]
    FetchFailed(String),

    /// The run was interrupted before it finished.
    #[error("run cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error must halt the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::OracleItem { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
