use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::chunker::chunks;
use crate::data_models::PageInfo;

pub const DEFAULT_API_URL: &str = "https://pwnwiki.io/api.php";
pub const DEFAULT_USER_AGENT: &str = concat!("pwtgbot/", env!("CARGO_PKG_VERSION"));

/// MediaWiki refuses more than 50 titles per query for regular accounts.
const MAX_TITLES_PER_REQUEST: usize = 50;

/// The wiki search backend the bot relays queries to.
#[async_trait]
pub trait WikiSearch: Send + Sync {
    /// Full-text search, returning at most `max_results` page titles in rank order.
    async fn search(&self, keywords: &[String], max_results: usize) -> Result<Vec<String>>;

    /// Look up metadata for every title in one go. The returned vector is
    /// index-aligned with `titles`; pages the wiki doesn't know are `None`.
    async fn pages(&self, titles: &[String]) -> Result<Vec<Option<PageInfo>>>;
}

#[derive(Debug, Clone)]
pub struct WikiClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for WikiClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct MediaWikiClient {
    client: Client,
    api_url: Url,
}

impl MediaWikiClient {
    pub fn new(config: WikiClientConfig) -> Result<Self> {
        let api_url = Url::parse(&config.api_url)
            .with_context(|| format!("invalid wiki API url: {}", config.api_url))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .context("failed to build MediaWiki HTTP client")?;

        Ok(Self { client, api_url })
    }

    async fn request_json(&self, params: &[(&str, String)]) -> Result<Value> {
        let mut pairs = Vec::with_capacity(params.len() + 2);
        pairs.push(("format", "json".to_string()));
        pairs.push(("formatversion", "2".to_string()));
        pairs.extend(params.iter().cloned());

        let response = self
            .client
            .get(self.api_url.clone())
            .query(&pairs)
            .send()
            .await
            .context("MediaWiki API request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("MediaWiki API request failed with HTTP {status}");
        }

        let payload: Value = response
            .json()
            .await
            .context("failed to decode MediaWiki API JSON response")?;
        if let Some(error) = payload.get("error") {
            let code = error
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            let info = error.get("info").and_then(Value::as_str).unwrap_or("");
            bail!("MediaWiki API error {code}: {info}");
        }
        Ok(payload)
    }

    async fn fetch_page_batch(&self, titles: &[String]) -> Result<Vec<Option<PageInfo>>> {
        log::info!("retrieving page info for {} titles", titles.len());
        let payload = self.request_json(&page_info_params(titles)).await?;
        let parsed: InfoResponse =
            serde_json::from_value(payload).context("failed to decode page info response")?;
        Ok(align_pages(titles, parsed.query.unwrap_or_default()))
    }
}

#[async_trait]
impl WikiSearch for MediaWikiClient {
    async fn search(&self, keywords: &[String], max_results: usize) -> Result<Vec<String>> {
        let payload = self
            .request_json(&search_params(keywords, max_results))
            .await?;
        let parsed: SearchResponse =
            serde_json::from_value(payload).context("failed to decode search API response")?;

        let mut titles: Vec<String> = parsed
            .query
            .map(|query| query.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default();
        titles.truncate(max_results);
        Ok(titles)
    }

    async fn pages(&self, titles: &[String]) -> Result<Vec<Option<PageInfo>>> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let batches =
            chunks(titles, MAX_TITLES_PER_REQUEST).map(|batch| self.fetch_page_batch(batch));
        let pages = try_join_all(batches).await?;
        Ok(pages.into_iter().flatten().collect())
    }
}

fn search_params(keywords: &[String], max_results: usize) -> Vec<(&'static str, String)> {
    vec![
        ("action", "query".to_string()),
        ("list", "search".to_string()),
        ("srsearch", keywords.join(" ")),
        ("srlimit", max_results.to_string()),
        ("srprop", String::new()),
    ]
}

fn page_info_params(titles: &[String]) -> Vec<(&'static str, String)> {
    vec![
        ("action", "query".to_string()),
        ("prop", "info".to_string()),
        ("inprop", "url|displaytitle".to_string()),
        ("titles", titles.join("|")),
    ]
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQueryBody>,
}

#[derive(Debug, Deserialize)]
struct SearchQueryBody {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    query: Option<InfoQueryBody>,
}

#[derive(Debug, Default, Deserialize)]
struct InfoQueryBody {
    #[serde(default)]
    normalized: Vec<TitleNormalization>,
    #[serde(default)]
    pages: Vec<InfoPage>,
}

#[derive(Debug, Deserialize)]
struct TitleNormalization {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct InfoPage {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    fullurl: Option<String>,
    displaytitle: Option<String>,
}

/// Map the wiki's page list back onto the requested titles, following title
/// normalization (e.g. `foo bar` -> `Foo bar`).
fn align_pages(titles: &[String], body: InfoQueryBody) -> Vec<Option<PageInfo>> {
    let normalized: HashMap<String, String> = body
        .normalized
        .into_iter()
        .map(|entry| (entry.from, entry.to))
        .collect();

    let mut by_title: HashMap<String, PageInfo> = HashMap::new();
    for page in body.pages {
        if page.missing || page.invalid {
            continue;
        }
        if let Some(url) = page.fullurl {
            by_title.insert(page.title, PageInfo::new(url, page.displaytitle));
        }
    }

    titles
        .iter()
        .map(|title| {
            let canonical = normalized.get(title).unwrap_or(title);
            by_title.get(canonical).cloned()
        })
        .collect()
}

#[test]
fn test_search_params_join_keywords() {
    let keywords = vec!["internet".to_string(), "explorer".to_string()];
    let params = search_params(&keywords, 5);
    assert!(params.contains(&("srsearch", "internet explorer".to_string())));
    assert!(params.contains(&("srlimit", "5".to_string())));
    assert!(params.contains(&("list", "search".to_string())));
}

#[test]
fn test_decode_search_hits() {
    let payload = serde_json::json!({
        "batchcomplete": true,
        "query": {
            "searchinfo": { "totalhits": 2 },
            "search": [
                { "ns": 0, "title": "Internet Explorer" },
                { "ns": 1198, "title": "Translations:Internet Explorer/1/zh" }
            ]
        }
    });
    let parsed: SearchResponse = serde_json::from_value(payload).unwrap();
    let titles: Vec<String> = parsed.query.unwrap().search.into_iter().map(|h| h.title).collect();
    assert_eq!(
        titles,
        vec!["Internet Explorer", "Translations:Internet Explorer/1/zh"]
    );
}

#[test]
fn test_align_pages_follows_normalization_and_missing() {
    let payload = serde_json::json!({
        "query": {
            "normalized": [ { "fromencoded": false, "from": "nmap", "to": "Nmap" } ],
            "pages": [
                {
                    "pageid": 7,
                    "ns": 0,
                    "title": "Nmap",
                    "fullurl": "https://pwnwiki.io/index.php?title=Nmap",
                    "displaytitle": "Nmap"
                },
                { "ns": 0, "title": "Gone", "missing": true },
                {
                    "pageid": 9,
                    "ns": 0,
                    "title": "Internet Explorer",
                    "fullurl": "https://pwnwiki.io/index.php?title=Internet_Explorer",
                    "displaytitle": "<span>Internet Explorer</span>"
                }
            ]
        }
    });
    let parsed: InfoResponse = serde_json::from_value(payload).unwrap();
    let titles = vec![
        "Internet Explorer".to_string(),
        "Gone".to_string(),
        "nmap".to_string(),
    ];

    let pages = align_pages(&titles, parsed.query.unwrap());
    assert_eq!(pages.len(), 3);
    assert_eq!(
        pages[0],
        Some(PageInfo::new(
            "https://pwnwiki.io/index.php?title=Internet_Explorer",
            Some("<span>Internet Explorer</span>".to_string())
        ))
    );
    assert_eq!(pages[1], None);
    assert_eq!(
        pages[2].as_ref().map(|p| p.url.as_str()),
        Some("https://pwnwiki.io/index.php?title=Nmap")
    );
}
