use std::path::PathBuf;

use thiserror::Error;

pub type BotResult<T> = std::result::Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    /// The result count token was not a positive integer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("requested limit exceeds the ceiling of {ceiling}")]
    LimitExceeded { ceiling: usize },

    /// The wiki search or page lookup failed.
    #[error("upstream wiki request failed")]
    Upstream(#[source] anyhow::Error),

    /// The messaging platform refused or failed to deliver a reply.
    #[error("failed to send reply")]
    Reply(#[source] anyhow::Error),

    #[error("failed to read telegram bot secret from {}", path.display())]
    SecretUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to find telegram bot secret in {} or ${var}", path.display())]
    MissingSecret { path: PathBuf, var: &'static str },
}
