/// A validated `/pwsearch` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub requested_limit: usize,
    pub keywords: Vec<String>,
}

impl SearchQuery {
    pub fn new(requested_limit: usize, keywords: Vec<String>) -> SearchQuery {
        SearchQuery {
            requested_limit,
            keywords,
        }
    }
}

/// Page metadata returned by the wiki for a single search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub url: String,
    pub display_title: Option<String>,
}

impl PageInfo {
    pub fn new(url: impl Into<String>, display_title: Option<String>) -> PageInfo {
        PageInfo {
            url: url.into(),
            display_title,
        }
    }
}

/// Formatted search hits ready to be batched into replies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedResults {
    pub lines: Vec<String>,
    pub omitted_translations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    PlainText,
    Html,
}

/// How an outgoing reply should be rendered by the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplyOptions {
    pub parse_mode: ParseMode,
    pub disable_link_preview: bool,
}

impl ReplyOptions {
    pub fn plain() -> ReplyOptions {
        ReplyOptions::default()
    }

    /// HTML markup with link previews turned off, used for result listings.
    pub fn html_without_preview() -> ReplyOptions {
        ReplyOptions {
            parse_mode: ParseMode::Html,
            disable_link_preview: true,
        }
    }
}
