//! Turns heterogeneous feed item fields into a plain-text summary and an
//! optional representative image.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::article::Summary;

static RE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:h[1-6]|div|section|article|blockquote)\b[^>]*>").unwrap()
});
static RE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>\s*").unwrap());
static RE_CLOSE_PARA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</(?:p|li)\s*>").unwrap());
static RE_OPEN_LI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_LINE_EDGES: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n ?").unwrap());
static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src="([^"]+)""#).unwrap());

/// The fields of one parsed feed item the normalizer cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    /// Short plain-text snippet
    pub snippet: Option<String>,
    /// Summary/description, possibly HTML
    pub summary: Option<String>,
    /// Full HTML content
    pub content: Option<String>,
    pub enclosure_url: Option<String>,
    /// `media:content` and `media:thumbnail` URLs in document order
    pub media_urls: Vec<String>,
    pub image: Option<String>,
}

pub fn normalize(item: &RawItem) -> (Summary, Option<String>) {
    (extract_summary(item), extract_image(item))
}

pub fn extract_summary(item: &RawItem) -> Summary {
    let text = [&item.snippet, &item.summary, &item.content]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty());

    match text {
        Some(text) => Summary::from(sanitize(text)),
        None => Summary::Missing,
    }
}

/// Reduce HTML-ish text to plain text, keeping paragraph boundaries.
pub fn sanitize(text: &str) -> String {
    let text = RE_BLOCK.replace_all(text, "\n");
    let text = RE_BREAK.replace_all(&text, "\n");
    let text = RE_CLOSE_PARA.replace_all(&text, "\n");
    let text = RE_OPEN_LI.replace_all(&text, "- ");
    let text = RE_TAG.replace_all(&text, "");
    let text = text.replace('\r', "");
    let text = RE_SPACES.replace_all(&text, " ");
    let text = RE_LINE_EDGES.replace_all(&text, "\n");
    let text = RE_BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// First valid http(s) URL from enclosure, media, explicit image, then inline `<img>`.
pub fn extract_image(item: &RawItem) -> Option<String> {
    let html = item.content.as_deref().or(item.summary.as_deref());
    let inline = html
        .and_then(|html| RE_IMG_SRC.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());

    item.enclosure_url
        .as_deref()
        .into_iter()
        .chain(item.media_urls.iter().map(String::as_str))
        .chain(item.image.as_deref())
        .chain(inline)
        .map(str::trim)
        .find(|candidate| is_http_url(candidate))
        .map(str::to_string)
}

pub fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}
