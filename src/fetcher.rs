use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser::{self, ParseFeedError};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::article::Article;
use crate::normalize::{self, RawItem};
use crate::sources::FeedSource;

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not parse feed: {0}")]
    Parse(#[from] ParseFeedError),
}

/// Per-item fields feed_rs does not expose, recovered from the raw XML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemExtras {
    pub enclosure: Option<String>,
    pub image: Option<String>,
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch one source. Failures are logged and yield no articles.
    pub async fn fetch(&self, source: &FeedSource) -> Vec<Article> {
        match self.try_fetch(source).await {
            Ok(articles) => {
                info!(
                    "Fetched {} articles from '{}' ({})",
                    articles.len(),
                    source.label,
                    source.locale
                );
                articles
            }
            Err(e) => {
                error!(
                    "Failed to fetch feed '{}' <{}> for locale {}: {}",
                    source.label, source.url, source.locale, e
                );
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, source: &FeedSource) -> Result<Vec<Article>, FetchError> {
        debug!("Fetching feed: {} ({})", source.label, source.url);

        let response = self
            .client
            .get(source.url.as_str())
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        Self::parse_articles(source, &bytes, Utc::now())
    }

    /// Parse a feed document into articles owned by `source`.
    pub fn parse_articles(
        source: &FeedSource,
        bytes: &[u8],
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<Article>, FetchError> {
        // Enclosure order and <image> are lost by feed_rs, so scan for them first
        let extras = Self::extract_item_extras_from_xml(bytes);

        let parsed = parser::parse(bytes)?;

        let articles = parsed
            .entries
            .iter()
            .map(|entry| {
                let link = Self::main_link(entry);
                let raw = Self::raw_item(entry, extras.get(&link));
                let (summary, image) = normalize::normalize(&raw);

                let title = entry
                    .title
                    .as_ref()
                    .map(|t| t.content.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| UNTITLED.to_string());

                Article {
                    title,
                    link,
                    summary,
                    image,
                    source: source.label.clone(),
                    date: entry.published.or(entry.updated).unwrap_or(fetched_at),
                    category: source.category,
                }
            })
            .collect();

        Ok(articles)
    }

    /// The article link: first alternate (or untyped) link, else the first link.
    pub fn main_link(entry: &Entry) -> String {
        entry
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| entry.links.first())
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default()
    }

    pub fn raw_item(entry: &Entry, extras: Option<&ItemExtras>) -> RawItem {
        let (snippet, summary) = match &entry.summary {
            Some(text) if text.content_type.essence().to_string() == "text/plain" => {
                (Some(text.content.clone()), None)
            }
            Some(text) => (None, Some(text.content.clone())),
            None => (None, None),
        };

        let enclosure_url = extras.and_then(|e| e.enclosure.clone()).or_else(|| {
            entry
                .links
                .iter()
                .find(|l| {
                    l.rel
                        .as_deref()
                        .is_some_and(|rel| rel.eq_ignore_ascii_case("enclosure"))
                })
                .map(|l| l.href.clone())
        });

        let media_urls = entry
            .media
            .iter()
            .flat_map(|media| {
                media
                    .content
                    .iter()
                    .filter_map(|c| c.url.as_ref().map(|u| u.to_string()))
                    .chain(media.thumbnails.iter().map(|t| t.image.uri.clone()))
            })
            .collect();

        RawItem {
            snippet,
            summary,
            content: entry.content.as_ref().and_then(|c| c.body.clone()),
            enclosure_url,
            media_urls,
            image: extras.and_then(|e| e.image.clone()),
        }
    }

    /// Map item link -> enclosure URL / image URL from raw RSS XML
    pub fn extract_item_extras_from_xml(xml_bytes: &[u8]) -> HashMap<String, ItemExtras> {
        let mut extras_map = HashMap::new();
        let xml_str = match std::str::from_utf8(xml_bytes) {
            Ok(s) => s,
            Err(_) => return extras_map,
        };

        for item_block in xml_str.split("<item").skip(1) {
            // Only <item> or <item ...>, never <items>
            if !item_block.starts_with(|c: char| c == '>' || c.is_whitespace()) {
                continue;
            }
            let Some(body_start) = item_block.find('>') else {
                continue;
            };
            let body = &item_block[body_start + 1..];
            let item_end = body.find("</item>").unwrap_or(body.len());
            let item = &body[..item_end];

            let Some(link) = Self::extract_xml_element(item, "link").map(|l| xml_text(&l)) else {
                continue;
            };

            let enclosure = Self::extract_xml_attribute(item, "enclosure", "url");
            let image = Self::extract_xml_element(item, "image").map(|image| {
                match Self::extract_xml_element(&image, "url") {
                    Some(url) => xml_text(&url),
                    None => xml_text(&image),
                }
            });

            if enclosure.is_some() || image.is_some() {
                extras_map.insert(link, ItemExtras { enclosure, image });
            }
        }

        extras_map
    }

    pub fn extract_xml_element(xml: &str, tag: &str) -> Option<String> {
        let start_tag = format!("<{}>", tag);
        let end_tag = format!("</{}>", tag);

        let start = xml.find(&start_tag)? + start_tag.len();
        let end = xml[start..].find(&end_tag)? + start;

        Some(xml[start..end].trim().to_string())
    }

    /// Value of `attr` on the first `<tag ...>` element.
    pub fn extract_xml_attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
        let open = format!("<{}", tag);
        let mut rest = xml;

        while let Some(pos) = rest.find(&open) {
            let after = &rest[pos + open.len()..];
            if !after.starts_with(char::is_whitespace) {
                rest = after;
                continue;
            }

            let attrs = &after[..after.find('>')?];
            for quote in ['"', '\''] {
                let needle = format!("{}={}", attr, quote);
                for (idx, _) in attrs.match_indices(&needle) {
                    if !attrs[..idx].ends_with(char::is_whitespace) {
                        continue;
                    }
                    let value_start = idx + needle.len();
                    let value_end = attrs[value_start..].find(quote)? + value_start;
                    return Some(unescape_xml(attrs[value_start..value_end].trim()));
                }
            }
            return None;
        }

        None
    }
}

/// Decode the predefined XML entities; `&amp;` last so `&amp;lt;` stays `&lt;`.
fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Element text as a parser would report it: CDATA verbatim, otherwise unescaped.
fn xml_text(raw: &str) -> String {
    let raw = raw.trim();
    match raw
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
    {
        Some(cdata) => cdata.trim().to_string(),
        None => unescape_xml(raw),
    }
}
