use std::num::IntErrorKind;
use std::sync::Arc;

use log::{error, info};

use crate::chunker::chunks;
use crate::context::CommandContext;
use crate::data_models::{FormattedResults, ReplyOptions, SearchQuery};
use crate::error::{BotError, BotResult};
use crate::formatter::format_results;
use crate::wiki::WikiSearch;

pub const HELP_MESSAGE: &str = "歡迎使用 PwnWiki 搜索 Bot
語法: /pwsearch 最大結果數量 關鍵詞1 關鍵詞2 ...
例：/pwsearch 5 internet explorer";

pub const NO_RESULTS_MESSAGE: &str = "沒有找到結果，請修改關鍵詞後重試";
pub const GENERIC_ERROR_MESSAGE: &str = "程式錯誤";

/// Maximum number of result lines sent in a single message.
pub const REPLY_BATCH_SIZE: usize = 50;

/// Reply to `/start` and `/help`.
pub async fn handle_help(ctx: &dyn CommandContext) -> BotResult<()> {
    ctx.reply(HELP_MESSAGE, ReplyOptions::plain())
        .await
        .map_err(BotError::Reply)
}

/// Handles `/pwsearch <limit> <keyword>...`.
pub struct SearchHandler {
    wiki: Arc<dyn WikiSearch>,
    ceiling: usize,
}

impl SearchHandler {
    pub fn new(wiki: Arc<dyn WikiSearch>, ceiling: usize) -> Self {
        Self { wiki, ceiling }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Validate, search, and reply with the results.
    ///
    /// Input and upstream failures are answered in the chat and never returned.
    /// The only error that escapes is a failure to deliver a reply.
    pub async fn handle_search(&self, ctx: &dyn CommandContext) -> BotResult<()> {
        let args = ctx.arguments();
        info!("received arguments: {:?}", args);

        if args.len() < 2 {
            return handle_help(ctx).await;
        }

        let query = match self.parse_query(args) {
            Ok(query) => query,
            Err(err) => {
                info!("rejected search request: {err}");
                return reply_plain(ctx, &user_message(&err)).await;
            }
        };

        match self.run_search(ctx, &query).await {
            Err(BotError::Upstream(err)) => {
                error!("program has encountered an error: {err:#}");
                reply_plain(ctx, GENERIC_ERROR_MESSAGE).await
            }
            other => other,
        }
    }

    pub fn parse_query(&self, args: &[String]) -> BotResult<SearchQuery> {
        let token = args
            .first()
            .ok_or_else(|| BotError::InvalidInput(String::new()))?;
        let requested = match token.trim().parse::<i64>() {
            Ok(value) => value,
            // still a number, just one far above any ceiling
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
                return Err(BotError::LimitExceeded {
                    ceiling: self.ceiling,
                });
            }
            Err(_) => return Err(BotError::InvalidInput(token.clone())),
        };
        if requested <= 0 {
            return Err(BotError::InvalidInput(token.clone()));
        }
        let requested = usize::try_from(requested).unwrap_or(usize::MAX);
        if requested > self.ceiling {
            return Err(BotError::LimitExceeded {
                ceiling: self.ceiling,
            });
        }

        Ok(SearchQuery::new(requested, args[1..].to_vec()))
    }

    async fn run_search(&self, ctx: &dyn CommandContext, query: &SearchQuery) -> BotResult<()> {
        let results = self
            .wiki
            .search(&query.keywords, query.requested_limit)
            .await
            .map_err(BotError::Upstream)?;

        if results.is_empty() {
            return reply_plain(ctx, NO_RESULTS_MESSAGE).await;
        }
        info!("found {} results", results.len());

        info!("retrieving information for pages");
        let pages = self.wiki.pages(&results).await.map_err(BotError::Upstream)?;
        if pages.len() != results.len() {
            return Err(BotError::Upstream(anyhow::anyhow!(
                "page lookup returned {} entries for {} titles",
                pages.len(),
                results.len()
            )));
        }

        let formatted = format_results(&results, &pages);
        let messages = reply_messages(&formatted, results.len());
        info!(
            "sending {} lines in {} messages, {} translations omitted",
            formatted.lines.len(),
            messages.len(),
            formatted.omitted_translations
        );
        for message in &messages {
            ctx.reply(message, ReplyOptions::html_without_preview())
                .await
                .map_err(BotError::Reply)?;
        }
        Ok(())
    }
}

/// Text shown to the user for a rejected or failed request.
pub fn user_message(err: &BotError) -> String {
    match err {
        BotError::InvalidInput(token) => format!("無效輸入：{token}"),
        BotError::LimitExceeded { ceiling } => format!("爲防止濫用，最大搜索上限爲 {ceiling} 條"),
        _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
}

pub fn summary_line(total_results: usize, omitted_translations: usize) -> String {
    format!("檢索結果：{total_results}\n已忽略的翻譯頁面：{omitted_translations}")
}

/// Split formatted lines into outgoing messages of at most `REPLY_BATCH_SIZE`
/// lines. The summary goes at the end of the last message, or alone when every
/// hit was filtered out.
pub fn reply_messages(formatted: &FormattedResults, total_results: usize) -> Vec<String> {
    let summary = summary_line(total_results, formatted.omitted_translations);
    let mut messages: Vec<String> = chunks(&formatted.lines, REPLY_BATCH_SIZE)
        .map(|batch| batch.join("\n"))
        .collect();

    match messages.last_mut() {
        Some(last) => {
            last.push('\n');
            last.push_str(&summary);
        }
        None => messages.push(summary),
    }
    messages
}

async fn reply_plain(ctx: &dyn CommandContext, text: &str) -> BotResult<()> {
    ctx.reply(text, ReplyOptions::plain())
        .await
        .map_err(BotError::Reply)
}

#[test]
fn test_summary_goes_on_last_message() {
    let formatted = FormattedResults {
        lines: (0..51).map(|i| format!("• {i}")).collect(),
        omitted_translations: 2,
    };
    let messages = reply_messages(&formatted, 53);
    assert_eq!(messages.len(), 2);
    assert!(!messages[0].contains("檢索結果"));
    assert_eq!(messages[1], "• 50\n檢索結果：53\n已忽略的翻譯頁面：2");
}

#[test]
fn test_summary_alone_when_everything_omitted() {
    let formatted = FormattedResults {
        lines: Vec::new(),
        omitted_translations: 4,
    };
    let messages = reply_messages(&formatted, 4);
    assert_eq!(messages, vec![summary_line(4, 4)]);
}
