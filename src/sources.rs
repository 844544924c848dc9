use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::FeedConfig;

/// Locales the aggregator serves. Anything else falls back to English.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Es];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
        }
    }

    /// Resolve the `locale` query parameter: only a valid `es` selects Spanish.
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "es" => Locale::Es,
            _ => Locale::En,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed category tag carried by every source and inherited by its articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Research,
    Products,
    Business,
    Regulation,
    Tools,
    Papers,
    Social,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Research,
        Category::Products,
        Category::Business,
        Category::Regulation,
        Category::Tools,
        Category::Papers,
        Category::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Research => "Research",
            Category::Products => "Products",
            Category::Business => "Business",
            Category::Regulation => "Regulation",
            Category::Tools => "Tools",
            Category::Papers => "Papers",
            Category::Social => "Social",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// One configured external feed endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSource {
    pub id: String,
    pub url: Url,
    pub label: String,
    pub category: Category,
    pub locale: Locale,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("feed '{label}' has an invalid endpoint URL '{url}'")]
    InvalidUrl { label: String, url: String },
    #[error("duplicate feed label '{label}' for locale {locale}")]
    DuplicateLabel { label: String, locale: Locale },
    #[error("no feed sources configured for locale {0}")]
    NoSources(Locale),
}

/// Per-locale ordered list of feed sources, loaded once at startup.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    by_locale: HashMap<Locale, Vec<FeedSource>>,
}

impl SourceRegistry {
    pub fn from_configs(configs: &[FeedConfig]) -> Result<Self, RegistryError> {
        let mut by_locale: HashMap<Locale, Vec<FeedSource>> = HashMap::new();
        let mut labels: HashSet<(Locale, String)> = HashSet::new();

        for config in configs {
            let url = parse_endpoint(&config.url).ok_or_else(|| RegistryError::InvalidUrl {
                label: config.label.clone(),
                url: config.url.clone(),
            })?;

            if !labels.insert((config.locale, config.label.clone())) {
                return Err(RegistryError::DuplicateLabel {
                    label: config.label.clone(),
                    locale: config.locale,
                });
            }

            by_locale.entry(config.locale).or_default().push(FeedSource {
                id: config.id.clone(),
                url,
                label: config.label.clone(),
                category: config.category,
                locale: config.locale,
            });
        }

        Ok(Self { by_locale })
    }

    pub fn sources_for(&self, locale: Locale) -> Result<&[FeedSource], RegistryError> {
        match self.by_locale.get(&locale) {
            Some(sources) if !sources.is_empty() => Ok(sources),
            _ => Err(RegistryError::NoSources(locale)),
        }
    }

    pub fn locales(&self) -> Vec<Locale> {
        Locale::ALL
            .into_iter()
            .filter(|l| self.by_locale.contains_key(l))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_locale.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_endpoint(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
