use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::Mutex;

use pwtgbot::context::CommandContext;
use pwtgbot::data_models::{PageInfo, ParseMode, ReplyOptions};
use pwtgbot::error::BotError;
use pwtgbot::handler::*;
use pwtgbot::wiki::WikiSearch;

mod test_helpers {
    use super::*;

    /// In-memory wiki that serves a fixed result list and counts calls.
    pub struct FakeWiki {
        pub results: Vec<String>,
        pub fail_search: bool,
        pub fail_pages: bool,
        pub search_calls: AtomicUsize,
        pub pages_calls: AtomicUsize,
    }

    impl FakeWiki {
        pub fn with_results(results: Vec<String>) -> Self {
            FakeWiki {
                results,
                fail_search: false,
                fail_pages: false,
                search_calls: AtomicUsize::new(0),
                pages_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WikiSearch for FakeWiki {
        async fn search(&self, _keywords: &[String], max_results: usize) -> Result<Vec<String>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_search {
                return Err(anyhow!("connection reset by peer"));
            }
            Ok(self.results.iter().take(max_results).cloned().collect())
        }

        async fn pages(&self, titles: &[String]) -> Result<Vec<Option<PageInfo>>> {
            self.pages_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_pages {
                return Err(anyhow!("HTTP 502"));
            }
            Ok(titles
                .iter()
                .map(|title| {
                    Some(PageInfo::new(
                        format!("https://pwnwiki.io/{}", title.replace(' ', "_")),
                        Some(title.clone()),
                    ))
                })
                .collect())
        }
    }

    /// Records every reply instead of sending it anywhere.
    pub struct RecordingContext {
        pub arguments: Vec<String>,
        pub replies: Mutex<Vec<(String, ReplyOptions)>>,
        pub fail_replies: bool,
    }

    impl RecordingContext {
        pub fn new(arguments: &[&str]) -> Self {
            RecordingContext {
                arguments: arguments.iter().map(|s| s.to_string()).collect(),
                replies: Mutex::new(Vec::new()),
                fail_replies: false,
            }
        }

        pub async fn texts(&self) -> Vec<String> {
            self.replies
                .lock()
                .await
                .iter()
                .map(|(text, _)| text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl CommandContext for RecordingContext {
        fn arguments(&self) -> &[String] {
            &self.arguments
        }

        async fn reply(&self, text: &str, options: ReplyOptions) -> Result<()> {
            if self.fail_replies {
                return Err(anyhow!("Forbidden: bot was kicked from the group chat"));
            }
            self.replies.lock().await.push((text.to_string(), options));
            Ok(())
        }
    }

    pub fn numbered_titles(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("Page {i}")).collect()
    }

    pub fn handler_for(wiki: Arc<FakeWiki>, ceiling: usize) -> SearchHandler {
        SearchHandler::new(wiki, ceiling)
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_three_results_single_reply() {
    let wiki = Arc::new(FakeWiki::with_results(vec![
        "Internet Explorer".to_string(),
        "Internet Explorer 11".to_string(),
        "IE Tab".to_string(),
    ]));
    let handler = handler_for(wiki.clone(), 20);
    let ctx = RecordingContext::new(&["5", "internet", "explorer"]);

    handler.handle_search(&ctx).await.unwrap();

    let replies = ctx.replies.lock().await;
    assert_eq!(replies.len(), 1);
    let (text, options) = &replies[0];
    assert_eq!(options.parse_mode, ParseMode::Html);
    assert!(options.disable_link_preview);
    assert_eq!(
        text,
        "• <a href=\"https://pwnwiki.io/Internet_Explorer\">Internet Explorer</a>\n\
         • <a href=\"https://pwnwiki.io/Internet_Explorer_11\">Internet Explorer 11</a>\n\
         • <a href=\"https://pwnwiki.io/IE_Tab\">IE Tab</a>\n\
         檢索結果：3\n已忽略的翻譯頁面：0"
    );
    assert_eq!(wiki.pages_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ceiling_checked_before_search() {
    let wiki = Arc::new(FakeWiki::with_results(numbered_titles(3)));
    let handler = handler_for(wiki.clone(), 20);
    let ctx = RecordingContext::new(&["999", "foo"]);

    handler.handle_search(&ctx).await.unwrap();

    assert_eq!(ctx.texts().await, vec!["爲防止濫用，最大搜索上限爲 20 條"]);
    assert_eq!(wiki.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_limit_equal_to_ceiling_is_allowed() {
    let wiki = Arc::new(FakeWiki::with_results(numbered_titles(30)));
    let handler = handler_for(wiki.clone(), 20);
    let ctx = RecordingContext::new(&["20", "foo"]);

    handler.handle_search(&ctx).await.unwrap();

    let texts = ctx.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].ends_with("檢索結果：20\n已忽略的翻譯頁面：0"));
}

#[tokio::test]
async fn test_huge_limit_gets_ceiling_message() {
    for token in ["99999999999999999999", "+99999999999999999999"] {
        let wiki = Arc::new(FakeWiki::with_results(numbered_titles(3)));
        let handler = handler_for(wiki.clone(), 20);
        let ctx = RecordingContext::new(&[token, "foo"]);

        handler.handle_search(&ctx).await.unwrap();

        assert_eq!(ctx.texts().await, vec!["爲防止濫用，最大搜索上限爲 20 條"]);
        assert_eq!(wiki.search_calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_huge_negative_limit_is_invalid_input() {
    let wiki = Arc::new(FakeWiki::with_results(numbered_titles(3)));
    let handler = handler_for(wiki.clone(), 20);
    let ctx = RecordingContext::new(&["-99999999999999999999", "foo"]);

    handler.handle_search(&ctx).await.unwrap();

    assert_eq!(
        ctx.texts().await,
        vec!["無效輸入：-99999999999999999999"]
    );
}

#[tokio::test]
async fn test_non_numeric_limit_is_invalid_input() {
    let wiki = Arc::new(FakeWiki::with_results(numbered_titles(3)));
    let handler = handler_for(wiki.clone(), 20);
    let ctx = RecordingContext::new(&["abc", "foo"]);

    handler.handle_search(&ctx).await.unwrap();

    assert_eq!(ctx.texts().await, vec!["無效輸入：abc"]);
    assert_eq!(wiki.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_positive_limit_is_invalid_input() {
    for token in ["0", "-3"] {
        let wiki = Arc::new(FakeWiki::with_results(numbered_titles(3)));
        let handler = handler_for(wiki.clone(), 20);
        let ctx = RecordingContext::new(&[token, "foo"]);

        handler.handle_search(&ctx).await.unwrap();

        assert_eq!(ctx.texts().await, vec![format!("無效輸入：{token}")]);
        assert_eq!(wiki.search_calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_too_few_arguments_replies_help() {
    for args in [&[][..], &["5"][..]] {
        let wiki = Arc::new(FakeWiki::with_results(numbered_titles(3)));
        let handler = handler_for(wiki.clone(), 20);
        let ctx = RecordingContext::new(args);

        handler.handle_search(&ctx).await.unwrap();

        assert_eq!(ctx.texts().await, vec![HELP_MESSAGE]);
        assert_eq!(wiki.search_calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_help_is_plain_text() {
    let ctx = RecordingContext::new(&[]);
    handle_help(&ctx).await.unwrap();

    let replies = ctx.replies.lock().await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, HELP_MESSAGE);
    assert_eq!(replies[0].1, ReplyOptions::plain());
}

#[tokio::test]
async fn test_no_results() {
    let wiki = Arc::new(FakeWiki::with_results(Vec::new()));
    let handler = handler_for(wiki.clone(), 20);
    let ctx = RecordingContext::new(&["5", "zzzz"]);

    handler.handle_search(&ctx).await.unwrap();

    assert_eq!(ctx.texts().await, vec![NO_RESULTS_MESSAGE]);
    assert_eq!(wiki.pages_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hundred_twenty_lines_three_messages() {
    let wiki = Arc::new(FakeWiki::with_results(numbered_titles(120)));
    let handler = handler_for(wiki.clone(), 200);
    let ctx = RecordingContext::new(&["120", "page"]);

    handler.handle_search(&ctx).await.unwrap();

    let texts = ctx.texts().await;
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[0].lines().count(), 50);
    assert_eq!(texts[1].lines().count(), 50);
    // 20 result lines plus the two summary lines
    assert_eq!(texts[2].lines().count(), 22);
    assert!(!texts[0].contains("檢索結果"));
    assert!(!texts[1].contains("檢索結果"));
    assert!(texts[2].ends_with("檢索結果：120\n已忽略的翻譯頁面：0"));
    assert!(texts[0].starts_with("• <a href=\"https://pwnwiki.io/Page_0\">Page 0</a>"));
    assert!(texts[2].starts_with("• <a href=\"https://pwnwiki.io/Page_100\">Page 100</a>"));
    assert_eq!(wiki.pages_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_translations_counted_in_summary() {
    let wiki = Arc::new(FakeWiki::with_results(vec![
        "Nmap".to_string(),
        "Translations:Nmap/1/zh".to_string(),
        "Translations:Nmap/2/zh".to_string(),
    ]));
    let handler = handler_for(wiki, 20);
    let ctx = RecordingContext::new(&["3", "nmap"]);

    handler.handle_search(&ctx).await.unwrap();

    assert_eq!(
        ctx.texts().await,
        vec![
            "• <a href=\"https://pwnwiki.io/Nmap\">Nmap</a>\n檢索結果：3\n已忽略的翻譯頁面：2"
        ]
    );
}

#[tokio::test]
async fn test_upstream_search_failure_is_opaque() {
    let mut wiki = FakeWiki::with_results(numbered_titles(3));
    wiki.fail_search = true;
    let handler = handler_for(Arc::new(wiki), 20);
    let ctx = RecordingContext::new(&["3", "foo"]);

    handler.handle_search(&ctx).await.unwrap();

    let texts = ctx.texts().await;
    assert_eq!(texts, vec![GENERIC_ERROR_MESSAGE]);
    assert!(!texts[0].contains("connection reset"));
}

#[tokio::test]
async fn test_upstream_pages_failure_is_opaque() {
    let mut wiki = FakeWiki::with_results(numbered_titles(3));
    wiki.fail_pages = true;
    let handler = handler_for(Arc::new(wiki), 20);
    let ctx = RecordingContext::new(&["3", "foo"]);

    handler.handle_search(&ctx).await.unwrap();

    assert_eq!(ctx.texts().await, vec![GENERIC_ERROR_MESSAGE]);
}

#[tokio::test]
async fn test_reply_failure_propagates() {
    let wiki = Arc::new(FakeWiki::with_results(numbered_titles(3)));
    let handler = handler_for(wiki, 20);
    let mut ctx = RecordingContext::new(&["3", "foo"]);
    ctx.fail_replies = true;

    let err = handler.handle_search(&ctx).await.unwrap_err();
    assert!(matches!(err, BotError::Reply(_)));
}

#[test]
fn test_parse_query() {
    let wiki = Arc::new(FakeWiki::with_results(Vec::new()));
    let handler = handler_for(wiki, 20);
    let args: Vec<String> = ["7", "internet", "explorer"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let query = handler.parse_query(&args).unwrap();
    assert_eq!(query.requested_limit, 7);
    assert_eq!(query.keywords, vec!["internet", "explorer"]);
    assert_eq!(handler.ceiling(), 20);
}

#[test]
fn test_user_messages() {
    assert_eq!(
        user_message(&BotError::InvalidInput("abc".to_string())),
        "無效輸入：abc"
    );
    assert_eq!(
        user_message(&BotError::LimitExceeded { ceiling: 20 }),
        "爲防止濫用，最大搜索上限爲 20 條"
    );
    assert_eq!(
        user_message(&BotError::Upstream(anyhow!("secret internals"))),
        GENERIC_ERROR_MESSAGE
    );
}
