use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::article::Article;
use crate::db::{ArticleStore, StoreError};
use crate::sources::Locale;

/// Mirrors successful aggregations into a durable store and reads them back
/// when live aggregation is unavailable.
///
/// Availability starts out as "a store is configured" and only ever goes from
/// true to false, the first time the store reports its table is missing.
pub struct PersistenceFallback {
    store: Option<Arc<dyn ArticleStore>>,
    available: AtomicBool,
}

impl PersistenceFallback {
    pub fn new(store: Option<Arc<dyn ArticleStore>>) -> Self {
        let available = AtomicBool::new(store.is_some());
        Self { store, available }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Permanently turn off mirroring and read-back for this process and
    /// close the store so no pending statement can still land.
    pub async fn disable(&self, reason: &str) {
        if self.available.swap(false, Ordering::AcqRel) {
            warn!("Disabling article persistence until restart: {}", reason);
            if let Some(store) = &self.store {
                store.close().await;
            }
        }
    }

    fn active_store(&self) -> Option<&Arc<dyn ArticleStore>> {
        if self.is_available() {
            self.store.as_ref()
        } else {
            None
        }
    }

    /// Upsert every linked article for `locale`. Returns the number written.
    ///
    /// A missing schema disables persistence and is not an error for the
    /// caller; any other store failure abandons the rest of this batch.
    pub async fn mirror(&self, locale: Locale, articles: &[Article]) -> Result<usize, StoreError> {
        let Some(store) = self.active_store() else {
            debug!("Persistence unavailable, skipping mirror for locale {}", locale);
            return Ok(0);
        };

        let mut written = 0;
        for article in articles.iter().filter(|a| !a.link.is_empty()) {
            match store.upsert_article(locale, article).await {
                Ok(()) => written += 1,
                Err(StoreError::MissingSchema(reason)) => {
                    self.disable(&reason).await;
                    return Ok(written);
                }
                Err(e) => return Err(e),
            }
        }

        debug!("Mirrored {} articles for locale {}", written, locale);
        Ok(written)
    }

    /// Most recent mirrored articles for `locale`, or nothing if the store
    /// is unavailable or the read fails.
    pub async fn read_back(&self, locale: Locale, limit: usize) -> Vec<Article> {
        let Some(store) = self.active_store() else {
            return Vec::new();
        };

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = match store.recent_articles(locale, limit).await {
            Ok(rows) => rows,
            Err(StoreError::MissingSchema(reason)) => {
                self.disable(&reason).await;
                return Vec::new();
            }
            Err(e) => {
                error!("Failed to read mirrored articles for locale {}: {}", locale, e);
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter_map(|row| {
                let link = row.link.clone();
                match row.into_article() {
                    Ok(article) => Some(article),
                    Err(e) => {
                        warn!("Skipping mirrored article {} ({}): {}", link, locale, e);
                        None
                    }
                }
            })
            .collect()
    }
}
