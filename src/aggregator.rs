use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::info;
use url::Url;

use crate::article::{Article, MAX_ARTICLES};
use crate::fetcher::Fetcher;
use crate::sources::{Locale, RegistryError, SourceRegistry};

/// Fans out over every source of a locale and merges the results.
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    fetcher: Fetcher,
    max_articles: usize,
}

impl Aggregator {
    pub fn new(registry: Arc<SourceRegistry>, fetcher: Fetcher) -> Self {
        Self {
            registry,
            fetcher,
            max_articles: MAX_ARTICLES,
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// Fetch every source for `locale` concurrently, then merge.
    ///
    /// Individual feed failures contribute nothing; only resolving the source
    /// list can fail.
    pub async fn aggregate(&self, locale: Locale) -> Result<Vec<Article>, RegistryError> {
        let sources = self.registry.sources_for(locale)?;
        info!("Aggregating {} feeds for locale {}", sources.len(), locale);

        let batches = join_all(sources.iter().map(|source| self.fetcher.fetch(source))).await;

        let articles = merge(batches, self.max_articles);
        info!("Aggregated {} articles for locale {}", articles.len(), locale);
        Ok(articles)
    }
}

/// Flatten, drop unlinkable items, newest first, one article per link, capped.
///
/// Same-date ordering follows concatenation order and is not guaranteed.
pub fn merge(batches: Vec<Vec<Article>>, limit: usize) -> Vec<Article> {
    let mut articles: Vec<Article> = batches
        .into_iter()
        .flatten()
        .filter(|a| has_usable_link(&a.link))
        .collect();

    articles.sort_by(|a, b| b.date.cmp(&a.date));

    let mut seen = HashSet::new();
    articles.retain(|a| seen.insert(a.link.clone()));
    articles.truncate(limit);
    articles
}

fn has_usable_link(link: &str) -> bool {
    !link.is_empty() && Url::parse(link).is_ok()
}
