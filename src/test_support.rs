//! Fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use url::Url;

use crate::article::{Article, Summary};
use crate::db::{ArticleStore, PersistedArticle, StoreError};
use crate::sources::{Category, FeedSource, Locale};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap()
}

pub struct FixtureItem {
    pub title: String,
    pub link: String,
    pub date: DateTime<Utc>,
}

/// `count` items an hour apart, newest first, links under `https://{prefix}.example.com`.
pub fn rss_items(prefix: &str, count: usize, newest: DateTime<Utc>) -> Vec<FixtureItem> {
    (0..count)
        .map(|i| FixtureItem {
            title: format!("{} item {}", prefix, i),
            link: format!("https://{}.example.com/articles/{}", prefix, i),
            date: newest - Duration::hours(i as i64),
        })
        .collect()
}

pub fn rss_document(items: &[FixtureItem]) -> String {
    let body: String = items
        .iter()
        .map(|item| {
            format!(
                "<item><title>{title}</title><link>{link}</link><guid>{link}</guid>\
                 <description>Summary for {title}</description><pubDate>{date}</pubDate></item>",
                title = item.title,
                link = item.link,
                date = item.date.to_rfc2822(),
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Fixture</title><link>https://fixture.example.com</link><description>Fixture feed</description>{}</channel></rss>"#,
        body
    )
}

pub fn feed_source(label: &str, url: &str, locale: Locale) -> FeedSource {
    FeedSource {
        id: label.to_lowercase().replace(' ', "-"),
        url: Url::parse(url).unwrap(),
        label: label.to_string(),
        category: Category::Research,
        locale,
    }
}

pub fn article(link: &str, date: DateTime<Utc>) -> Article {
    Article {
        title: format!("Title for {}", link),
        link: link.to_string(),
        summary: Summary::Text(format!("Summary for {}", link)),
        image: None,
        source: "Fixture".to_string(),
        date,
        category: Category::Research,
    }
}

/// In-memory store that counts calls and can simulate a missing table.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(String, Locale), PersistedArticle>>,
    pub missing_schema: AtomicBool,
    pub fail_transient: AtomicBool,
    pub upsert_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn without_schema() -> Self {
        let store = Self::default();
        store.missing_schema.store(true, Ordering::SeqCst);
        store
    }

    pub fn with_articles(locale: Locale, articles: &[Article]) -> Self {
        let store = Self::default();
        {
            let mut rows = store.rows.lock().unwrap();
            for article in articles {
                rows.insert(
                    (article.link.clone(), locale),
                    PersistedArticle::from_article(locale, article, article.date),
                );
            }
        }
        store
    }

    pub fn upserts(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.missing_schema.load(Ordering::SeqCst) {
            return Err(StoreError::MissingSchema("persisted_articles".to_string()));
        }
        if self.fail_transient.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn upsert_article(&self, locale: Locale, article: &Article) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let first_seen = rows
            .get(&(article.link.clone(), locale))
            .map(|row| row.first_seen.clone());
        let mut row = PersistedArticle::from_article(locale, article, now);
        if let Some(first_seen) = first_seen {
            row.first_seen = first_seen;
        }
        rows.insert((article.link.clone(), locale), row);
        Ok(())
    }

    async fn recent_articles(
        &self,
        locale: Locale,
        limit: i64,
    ) -> Result<Vec<PersistedArticle>, StoreError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<PersistedArticle> = rows
            .values()
            .filter(|row| row.locale == locale.as_str())
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}
