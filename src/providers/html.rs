use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Invalid CSS selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}

/// Parses a fetched page. Fails only when the bytes are not a decodable document.
pub fn parse_document(html: &[u8]) -> Result<Html, ScrapeError> {
    let text = std::str::from_utf8(html)
        .map_err(|e| ScrapeError::Malformed(format!("page is not valid UTF-8: {e}")))?;
    Ok(Html::parse_document(text))
}

pub fn selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Concatenated, trimmed text content of an element.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
