use scraper::Html;
use teloxide::utils::html::escape;

use crate::data_models::{FormattedResults, PageInfo};

/// Wiki convention for translation sub-pages; these are never shown to users.
pub const TRANSLATIONS_PREFIX: &str = "Translations:";

/// Decode an HTML fragment into plain text, or `None` when it contains at
/// least one markup element.
///
/// MediaWiki display titles are HTML: a plain title still arrives with its
/// entities escaped (`AT&amp;T`), while a malformed one is wrapped in `<span>`
/// and friends.
pub fn plain_text(fragment: &str) -> Option<String> {
    let fragment = Html::parse_fragment(fragment);
    let root = fragment.root_element();
    // the fragment root is a synthetic <html> element, skip it
    let has_element = root
        .descendants()
        .skip(1)
        .any(|node| node.value().is_element());
    if has_element {
        None
    } else {
        Some(root.text().collect())
    }
}

pub fn contains_markup(text: &str) -> bool {
    plain_text(text).is_none()
}

pub fn is_translation_page(title: &str) -> bool {
    title.starts_with(TRANSLATIONS_PREFIX)
}

/// Resolve the text shown for a page: its decoded display title when it is
/// plain text, the raw search title otherwise.
pub fn resolve_title(result: &str, page: &PageInfo) -> String {
    page.display_title
        .as_deref()
        .and_then(plain_text)
        .unwrap_or_else(|| result.to_string())
}

fn escape_attribute(value: &str) -> String {
    escape(value).replace('"', "&quot;")
}

pub fn link_line(url: &str, text: &str) -> String {
    format!("• <a href=\"{}\">{}</a>", escape_attribute(url), escape(text))
}

/// A line for a hit the wiki returned no metadata for. There is no URL to link to.
pub fn unlinked_line(text: &str) -> String {
    format!("• {}", escape(text))
}

/// Turn search hits and their index-aligned page metadata into display lines.
///
/// Translation sub-pages are dropped and counted. The relative order of the
/// remaining hits is kept as is.
pub fn format_results(results: &[String], pages: &[Option<PageInfo>]) -> FormattedResults {
    debug_assert_eq!(results.len(), pages.len());

    let mut formatted = FormattedResults::default();
    for (result, page) in results.iter().zip(pages) {
        match page {
            None => {
                if is_translation_page(result) {
                    formatted.omitted_translations += 1;
                } else {
                    formatted.lines.push(unlinked_line(result));
                }
            }
            Some(page) => {
                let title = resolve_title(result, page);
                if is_translation_page(&title) {
                    formatted.omitted_translations += 1;
                } else {
                    formatted.lines.push(link_line(&page.url, &title));
                }
            }
        }
    }
    formatted
}

#[test]
fn test_contains_markup() {
    assert!(contains_markup("<span class=\"mw-page-title-main\">Nmap</span>"));
    assert!(contains_markup("Before <i>after</i>"));
    assert!(!contains_markup("Internet Explorer"));
    assert!(!contains_markup("AT&T < 5 > 3"));
    assert!(!contains_markup(""));
}

#[test]
fn test_plain_text_decodes_entities() {
    assert_eq!(plain_text("AT&amp;T").as_deref(), Some("AT&T"));
    assert_eq!(plain_text("a &lt;b&gt;").as_deref(), Some("a <b>"));
    assert_eq!(plain_text("<span>Nmap</span>"), None);
}
