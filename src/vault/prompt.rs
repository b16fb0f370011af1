// Sources for the raw credential when the vault has none stored.

use std::io;

/// Supplies the raw secret, e.g. from a masked console read.
pub trait SecretPrompter {
    fn prompt(&self) -> io::Result<String>;
}

/// Reads the secret from the terminal without echoing it.
#[derive(Debug, Clone)]
pub struct ConsolePrompter {
    message: String,
}

impl ConsolePrompter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new("Enter your X.com (Twitter) Bearer Token: ")
    }
}

impl SecretPrompter for ConsolePrompter {
    fn prompt(&self) -> io::Result<String> {
        rpassword::prompt_password(&self.message)
    }
}

/// Closures work as prompters, which keeps tests free of terminal I/O.
impl<F> SecretPrompter for F
where
    F: Fn() -> io::Result<String>,
{
    fn prompt(&self) -> io::Result<String> {
        self()
    }
}
