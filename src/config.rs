use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;

use crate::error::{BotError, BotResult};
use crate::wiki::{DEFAULT_API_URL, DEFAULT_USER_AGENT, WikiClientConfig};

pub const SECRET_PATH: &str = "/run/secrets/pwtgbot";
pub const SECRET_ENV_VAR: &str = "PWTGBOT_SECRET";

/// PwnWiki search bot for Telegram group chats.
#[derive(Debug, Clone, Parser)]
#[command(name = "pwtgbot", version)]
pub struct Cli {
    /// Maximum number of entries a user may search for.
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// MediaWiki api.php endpoint to search.
    #[arg(long, env = "PWTGBOT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// File holding the Telegram bot token.
    #[arg(long, default_value = SECRET_PATH)]
    pub secret_path: PathBuf,

    /// Per-request timeout for wiki API calls, in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Cli {
    pub fn wiki_config(&self) -> WikiClientConfig {
        WikiClientConfig {
            api_url: self.api_url.clone(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Load the bot token from `secret_path`, falling back to `$PWTGBOT_SECRET`
/// (a `.env` file in the working directory is honoured).
pub fn load_secret(secret_path: &Path) -> BotResult<String> {
    dotenv().ok();
    read_secret(secret_path, env::var(SECRET_ENV_VAR).ok())
}

fn read_secret(secret_path: &Path, env_value: Option<String>) -> BotResult<String> {
    if secret_path.is_file() {
        let contents =
            fs::read_to_string(secret_path).map_err(|source| BotError::SecretUnreadable {
                path: secret_path.to_path_buf(),
                source,
            })?;
        let secret = contents.trim();
        if !secret.is_empty() {
            return Ok(secret.to_string());
        }
    }

    env_value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BotError::MissingSecret {
            path: secret_path.to_path_buf(),
            var: SECRET_ENV_VAR,
        })
}
