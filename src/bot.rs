use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use log::{error, info, warn};
use teloxide::dispatching::UpdateHandler;
use teloxide::error_handlers::ErrorHandler;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{LinkPreviewOptions, ReplyParameters};
use teloxide::utils::command::{BotCommands, ParseError};

use crate::context::CommandContext;
use crate::data_models::{ParseMode, ReplyOptions};
use crate::error::BotError;
use crate::handler::{SearchHandler, handle_help};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "PwnWiki 搜索 Bot")]
pub enum Command {
    #[command(description = "show usage")]
    Start,
    #[command(description = "show usage")]
    Help,
    #[command(
        description = "search PwnWiki: /pwsearch <limit> <keyword>...",
        parse_with = split_arguments
    )]
    Pwsearch(Vec<String>),
}

fn split_arguments(input: String) -> Result<(Vec<String>,), ParseError> {
    Ok((input.split_whitespace().map(str::to_string).collect(),))
}

/// A command received in a Telegram chat.
pub struct TelegramContext {
    bot: Bot,
    message: Message,
    arguments: Vec<String>,
}

impl TelegramContext {
    pub fn new(bot: Bot, message: Message, arguments: Vec<String>) -> Self {
        Self {
            bot,
            message,
            arguments,
        }
    }
}

#[async_trait]
impl CommandContext for TelegramContext {
    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    async fn reply(&self, text: &str, options: ReplyOptions) -> anyhow::Result<()> {
        let mut request = self
            .bot
            .send_message(self.message.chat.id, text)
            .reply_parameters(ReplyParameters::new(self.message.id));

        if options.parse_mode == ParseMode::Html {
            request = request.parse_mode(teloxide::types::ParseMode::Html);
        }
        if options.disable_link_preview {
            request = request.link_preview_options(LinkPreviewOptions {
                is_disabled: true,
                url: None,
                prefer_small_media: false,
                prefer_large_media: false,
                show_above_text: false,
            });
        }

        request.await?;
        Ok(())
    }
}

/// Logs errors that escaped a command handler. Nothing is sent to the chat.
pub struct DispatchErrorLogger;

impl ErrorHandler<BotError> for DispatchErrorLogger {
    fn handle_error(self: Arc<Self>, error: BotError) -> BoxFuture<'static, ()> {
        error!("error while handling update: {:#}", anyhow::Error::new(error));
        Box::pin(async {})
    }
}

async fn answer(
    bot: Bot,
    msg: Message,
    cmd: Command,
    handler: Arc<SearchHandler>,
) -> Result<(), BotError> {
    match cmd {
        Command::Start | Command::Help => {
            let ctx = TelegramContext::new(bot, msg, Vec::new());
            handle_help(&ctx).await
        }
        Command::Pwsearch(arguments) => {
            let ctx = TelegramContext::new(bot, msg, arguments);
            handler.handle_search(&ctx).await
        }
    }
}

pub fn schema() -> UpdateHandler<BotError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(answer)
}

/// Poll Telegram for commands until Ctrl-C.
pub async fn run(bot: Bot, handler: Arc<SearchHandler>) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("failed to register bot commands: {e}");
    }

    info!("starting to poll");
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![handler])
        .default_handler(|_update| async {})
        .error_handler(Arc::new(DispatchErrorLogger))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
