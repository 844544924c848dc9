use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sources::Category;

/// Wire text used when an item carried no usable summary.
pub const NO_SUMMARY: &str = "No summary available.";

/// Most articles returned by one aggregation or read back from the store.
pub const MAX_ARTICLES: usize = 60;

/// Sanitized summary text, or an explicit marker that the feed had none.
///
/// On the wire the marker is the [`NO_SUMMARY`] placeholder so existing
/// clients see a plain string either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Summary {
    Text(String),
    Missing,
}

impl Summary {
    pub fn is_missing(&self) -> bool {
        matches!(self, Summary::Missing)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Summary::Text(text) => text,
            Summary::Missing => NO_SUMMARY,
        }
    }

    /// Stored representation: `None` for the marker.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Summary::Text(text) => Some(text),
            Summary::Missing => None,
        }
    }

    /// Blank-line separated paragraphs with inner whitespace collapsed.
    pub fn paragraphs(&self) -> Vec<String> {
        let Summary::Text(text) = self else {
            return Vec::new();
        };

        let mut paragraphs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                push_paragraph(&mut paragraphs, &mut current);
            } else {
                current.push(line);
            }
        }
        push_paragraph(&mut paragraphs, &mut current);
        paragraphs
    }

    /// Card-sized preview, cut on a char boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        let text = self.as_str();
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}…", &text[..cut]),
            None => text.to_string(),
        }
    }
}

fn push_paragraph(paragraphs: &mut Vec<String>, current: &mut Vec<&str>) {
    if current.is_empty() {
        return;
    }
    let joined = current
        .drain(..)
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    if !joined.is_empty() {
        paragraphs.push(joined);
    }
}

impl From<String> for Summary {
    fn from(text: String) -> Self {
        if text.trim().is_empty() || text == NO_SUMMARY {
            Summary::Missing
        } else {
            Summary::Text(text)
        }
    }
}

impl From<Option<String>> for Summary {
    fn from(text: Option<String>) -> Self {
        text.map(Summary::from).unwrap_or(Summary::Missing)
    }
}

impl From<Summary> for String {
    fn from(summary: Summary) -> Self {
        match summary {
            Summary::Text(text) => text,
            Summary::Missing => NO_SUMMARY.to_string(),
        }
    }
}

/// A normalized feed item as served to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub source: String,
    pub date: DateTime<Utc>,
    pub category: Category,
}
