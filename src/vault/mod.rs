// Credential vault: keeps the X API bearer token encrypted at rest.
//
// Two artifacts live in the vault directory: the symmetric key and the
// sealed token. Neither alone reconstructs the token. The lifecycle is:
//
//   no key, no secret  -> generate and store key
//   key, no secret     -> prompt, encrypt, store ciphertext
//   key and secret     -> decrypt and return, no prompt
//
// Anything else (secret without key, wrong-size key, ciphertext that fails
// authentication) is VaultCorrupted, and the vault never re-prompts on its
// own.

pub mod cipher;
pub mod prompt;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
pub use cipher::EncryptionKey;
pub use prompt::{ConsolePrompter, SecretPrompter};

/// File name of the key artifact.
pub const KEY_FILE: &str = "encryption_key.key";

/// File name of the sealed-secret artifact.
pub const SECRET_FILE: &str = "api_key.enc";

/// Which artifacts are currently on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// Neither key nor secret
    Empty,
    /// Key generated, no secret stored yet
    KeyOnly,
    /// Key and secret both present
    Provisioned,
    /// Secret present but its key is gone; unrecoverable
    Orphaned,
}

impl std::fmt::Display for VaultState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VaultState::Empty => "empty",
            VaultState::KeyOnly => "key only (no token stored)",
            VaultState::Provisioned => "token stored",
            VaultState::Orphaned => "token stored without key (corrupted)",
        };
        f.write_str(s)
    }
}

/// File-backed vault for a single credential.
#[derive(Debug, Clone)]
pub struct Vault {
    dir: PathBuf,
}

impl Vault {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE)
    }

    pub fn secret_path(&self) -> PathBuf {
        self.dir.join(SECRET_FILE)
    }

    pub fn state(&self) -> VaultState {
        match (self.key_path().exists(), self.secret_path().exists()) {
            (false, false) => VaultState::Empty,
            (true, false) => VaultState::KeyOnly,
            (true, true) => VaultState::Provisioned,
            (false, true) => VaultState::Orphaned,
        }
    }

    /// Load the key, generating and persisting one on first use.
    pub fn ensure_key(&self) -> Result<EncryptionKey> {
        match read_optional(&self.key_path())? {
            Some(bytes) => {
                debug!(path = %self.key_path().display(), "Loaded encryption key");
                EncryptionKey::from_bytes(&bytes)
            }
            None => {
                if self.secret_path().exists() {
                    return Err(Error::VaultCorrupted(format!(
                        "{} exists but its key {} is missing",
                        self.secret_path().display(),
                        self.key_path().display()
                    )));
                }
                let key = EncryptionKey::generate();
                write_private(&self.key_path(), key.as_bytes())?;
                info!(path = %self.key_path().display(), "Generated new encryption key");
                Ok(key)
            }
        }
    }

    /// Return the stored secret, prompting for and storing it if absent.
    pub fn load_or_prompt_secret(&self, prompter: &dyn SecretPrompter) -> Result<SecretString> {
        let key = self.ensure_key()?;

        if let Some(blob) = read_optional(&self.secret_path())? {
            let plaintext = cipher::decrypt(&key, &blob)?;
            let secret = String::from_utf8(plaintext).map_err(|_| {
                Error::VaultCorrupted("decrypted secret is not valid UTF-8".into())
            })?;
            debug!("Loaded stored secret");
            return Ok(SecretString::from(secret));
        }

        info!("No stored secret, prompting");
        let raw = prompter
            .prompt()
            .map_err(|e| Error::CredentialEntry(e.to_string()))?;
        let secret = raw.trim().to_string();
        if secret.is_empty() {
            return Err(Error::CredentialEntry("no token entered".into()));
        }

        let blob = cipher::encrypt(&key, secret.as_bytes())?;
        write_private(&self.secret_path(), &blob)?;
        info!(path = %self.secret_path().display(), "Stored encrypted secret");

        Ok(SecretString::from(secret))
    }
}

impl Vault {
    /// Run `load_or_prompt_secret` on a blocking thread under `cancel`.
    ///
    /// The prompt is never abandoned midway: a console read owns the
    /// terminal's echo state until it returns. Cancellation observed once it
    /// has returned yields `Error::Cancelled`.
    pub async fn load_or_prompt_secret_until<P>(
        self,
        prompter: P,
        cancel: &CancellationToken,
    ) -> Result<SecretString>
    where
        P: SecretPrompter + Send + 'static,
    {
        let outcome = tokio::task::spawn_blocking(move || self.load_or_prompt_secret(&prompter))
            .await
            .map_err(|e| Error::CredentialEntry(format!("prompt task failed: {e}")))?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        outcome
    }
}

/// Read a vault artifact. Missing is `None`; any other failure is corruption.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::VaultCorrupted(format!(
            "cannot read {}: {e}",
            path.display()
        ))),
    }
}

/// Write an artifact readable only by the owner, via rename so a crash never
/// leaves a half-written file at `path`.
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("tmp");
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}
