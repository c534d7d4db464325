use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use teloxide::Bot;

use pwtgbot::bot;
use pwtgbot::config::{Cli, load_secret};
use pwtgbot::handler::SearchHandler;
use pwtgbot::wiki::MediaWikiClient;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing subscriber
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {e}");
        return ExitCode::FAILURE;
    }

    // Bridge log crate -> tracing (teloxide and the wiki client log through it)
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("failed to bridge log records into tracing: {e}");
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("program has encountered a critical error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let secret = load_secret(&cli.secret_path)?;

    tracing::info!("initializing bot instance, search ceiling is {}", cli.limit);
    let wiki = MediaWikiClient::new(cli.wiki_config())?;
    let handler = Arc::new(SearchHandler::new(Arc::new(wiki), cli.limit));

    bot::run(Bot::new(secret), handler).await;
    Ok(())
}
