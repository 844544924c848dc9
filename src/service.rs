use tracing::{error, info, warn};

use crate::aggregator::Aggregator;
use crate::article::{Article, MAX_ARTICLES};
use crate::persistence::PersistenceFallback;
use crate::sources::Locale;

/// What one request for news produced.
#[derive(Debug, Clone, PartialEq)]
pub enum NewsOutcome {
    /// Fresh aggregation result
    Live(Vec<Article>),
    /// Previously mirrored articles served because live aggregation failed
    Degraded(Vec<Article>),
    /// Nothing live and nothing mirrored
    Unavailable,
}

impl NewsOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            NewsOutcome::Live(_) => "live",
            NewsOutcome::Degraded(_) => "degraded",
            NewsOutcome::Unavailable => "unavailable",
        }
    }

    pub fn articles(&self) -> &[Article] {
        match self {
            NewsOutcome::Live(articles) | NewsOutcome::Degraded(articles) => articles,
            NewsOutcome::Unavailable => &[],
        }
    }

    pub fn into_articles(self) -> Vec<Article> {
        match self {
            NewsOutcome::Live(articles) | NewsOutcome::Degraded(articles) => articles,
            NewsOutcome::Unavailable => Vec::new(),
        }
    }
}

/// Live aggregation with a mirrored fallback. Never fails.
pub struct NewsService {
    aggregator: Aggregator,
    persistence: PersistenceFallback,
}

impl NewsService {
    pub fn new(aggregator: Aggregator, persistence: PersistenceFallback) -> Self {
        Self {
            aggregator,
            persistence,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn persistence(&self) -> &PersistenceFallback {
        &self.persistence
    }

    pub async fn news(&self, locale: Locale) -> NewsOutcome {
        match self.aggregator.aggregate(locale).await {
            Ok(articles) if !articles.is_empty() => {
                if let Err(e) = self.persistence.mirror(locale, &articles).await {
                    warn!("Failed to mirror articles for locale {}: {}", locale, e);
                }
                NewsOutcome::Live(articles)
            }
            Ok(_) => {
                warn!("No live articles for locale {}, trying mirrored copy", locale);
                self.fallback(locale).await
            }
            Err(e) => {
                error!("Aggregation failed for locale {}: {}", locale, e);
                self.fallback(locale).await
            }
        }
    }

    async fn fallback(&self, locale: Locale) -> NewsOutcome {
        if !self.persistence.is_available() {
            return NewsOutcome::Unavailable;
        }

        let articles = self.persistence.read_back(locale, MAX_ARTICLES).await;
        if articles.is_empty() {
            NewsOutcome::Unavailable
        } else {
            info!(
                "Serving {} mirrored articles for locale {}",
                articles.len(),
                locale
            );
            NewsOutcome::Degraded(articles)
        }
    }
}
