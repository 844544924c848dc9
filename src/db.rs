use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};
use thiserror::Error;

use crate::article::{Article, Summary};
use crate::sources::{Category, Locale, UnknownCategory};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("durable schema is missing: {0}")]
    MissingSchema(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // sqlite reports "no such table", postgres uses SQLSTATE 42P01
            let missing = db_err.message().contains("no such table")
                || db_err.code().as_deref() == Some("42P01");
            if missing {
                return StoreError::MissingSchema(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Category(#[from] UnknownCategory),
    #[error("invalid stored date: {0}")]
    Date(#[from] chrono::ParseError),
}

/// Durable mirror row, keyed by `(link, locale)`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PersistedArticle {
    pub link: String,
    pub locale: String,
    pub title: String,
    pub summary: Option<String>,
    pub image: Option<String>,
    pub source: String,
    pub category: String,
    pub date: String,
    pub first_seen: String,
    pub last_seen: String,
}

/// Fixed-width UTC timestamps so text order matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl PersistedArticle {
    pub fn from_article(locale: Locale, article: &Article, seen_at: DateTime<Utc>) -> Self {
        let seen = format_timestamp(seen_at);
        Self {
            link: article.link.clone(),
            locale: locale.as_str().to_string(),
            title: article.title.clone(),
            summary: article.summary.as_text().map(str::to_string),
            image: article.image.clone(),
            source: article.source.clone(),
            category: article.category.as_str().to_string(),
            date: format_timestamp(article.date),
            first_seen: seen.clone(),
            last_seen: seen,
        }
    }

    pub fn into_article(self) -> Result<Article, RowError> {
        let category: Category = self.category.parse()?;
        let date = DateTime::parse_from_rfc3339(&self.date)?.with_timezone(&Utc);

        Ok(Article {
            title: self.title,
            link: self.link,
            summary: Summary::from(self.summary),
            image: self.image,
            source: self.source,
            date,
            category,
        })
    }
}

/// Durable storage used to mirror live results and serve them when live fetching fails.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn upsert_article(&self, locale: Locale, article: &Article) -> Result<(), StoreError>;

    /// Newest rows for `locale`, by article date descending.
    async fn recent_articles(
        &self,
        locale: Locale,
        limit: i64,
    ) -> Result<Vec<PersistedArticle>, StoreError>;

    /// Release connections once the store will no longer be used.
    async fn close(&self) {}
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS persisted_articles (
                link TEXT NOT NULL,
                locale TEXT NOT NULL,
                title TEXT NOT NULL,
                summary TEXT,
                image TEXT,
                source TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                first_seen TEXT NOT NULL,
                last_seen TEXT NOT NULL,
                PRIMARY KEY (link, locale)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_persisted_articles_locale_date
            ON persisted_articles(locale, date DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_articles(&self, locale: Locale) -> Result<i64, StoreError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM persisted_articles WHERE locale = ?")
                .bind(locale.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }

    pub async fn get_article(
        &self,
        link: &str,
        locale: Locale,
    ) -> Result<Option<PersistedArticle>, StoreError> {
        let row = sqlx::query_as::<_, PersistedArticle>(
            "SELECT * FROM persisted_articles WHERE link = ? AND locale = ?",
        )
        .bind(link)
        .bind(locale.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl ArticleStore for Database {
    async fn upsert_article(&self, locale: Locale, article: &Article) -> Result<(), StoreError> {
        let row = PersistedArticle::from_article(locale, article, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO persisted_articles
                (link, locale, title, summary, image, source, category, date, first_seen, last_seen)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(link, locale) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                image = excluded.image,
                source = excluded.source,
                category = excluded.category,
                date = excluded.date,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(&row.link)
        .bind(&row.locale)
        .bind(&row.title)
        .bind(&row.summary)
        .bind(&row.image)
        .bind(&row.source)
        .bind(&row.category)
        .bind(&row.date)
        .bind(&row.first_seen)
        .bind(&row.last_seen)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_articles(
        &self,
        locale: Locale,
        limit: i64,
    ) -> Result<Vec<PersistedArticle>, StoreError> {
        let rows = sqlx::query_as::<_, PersistedArticle>(
            r#"
            SELECT * FROM persisted_articles
            WHERE locale = ?
            ORDER BY date DESC
            LIMIT ?
            "#,
        )
        .bind(locale.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
