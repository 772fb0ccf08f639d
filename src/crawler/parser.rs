//! HTML inspection of rendered documents
//!
//! This module handles parsing a rendered document to extract:
//! - The page title, for progress logs
//! - The whitespace-normalized body text
//! - Whether the document is the platform's rate-limit page

use scraper::{Html, Selector};

/// Body of the document served instead of a page when requests are throttled
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// HTTP status of a throttled main document
const TOO_MANY_REQUESTS: u16 = 429;

/// Extracted information from a rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Text content of <body>, whitespace runs collapsed to one space
    pub body_text: String,
}

/// Parses a rendered document
///
/// # Arguments
///
/// * `html` - The serialized document
///
/// # Example
///
/// ```
/// use village_archiver::crawler::parse_html;
///
/// let parsed = parse_html("<html><head><title>1Village</title></head><body> Hello\n world </body></html>");
/// assert_eq!(parsed.title.as_deref(), Some("1Village"));
/// assert_eq!(parsed.body_text, "Hello world");
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        body_text: extract_body_text(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_body_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };

    document
        .select(&body_selector)
        .next()
        .map(|body| normalize_whitespace(&body.text().collect::<String>()))
        .unwrap_or_default()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns true if the document is the rate-limit page
///
/// A document is rate-limited when the main document was answered with
/// HTTP 429, or when its body text is exactly [`RATE_LIMIT_MESSAGE`].
pub fn is_rate_limited(parsed: &ParsedPage, document_status: Option<u16>) -> bool {
    document_status == Some(TOO_MANY_REQUESTS) || parsed.body_text == RATE_LIMIT_MESSAGE
}
