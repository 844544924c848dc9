use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_aggregator::aggregator::Aggregator;
use news_aggregator::config::Config;
use news_aggregator::db::{ArticleStore, Database};
use news_aggregator::fetcher::Fetcher;
use news_aggregator::persistence::PersistenceFallback;
use news_aggregator::routes::{self, AppState};
use news_aggregator::service::NewsService;
use news_aggregator::sources::SourceRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_aggregator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("FEEDS_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load(&config_path)?;
    let registry = Arc::new(SourceRegistry::from_configs(&config.feeds)?);
    info!(
        "Loaded {} feeds for locales {:?} from {}",
        registry.len(),
        registry.locales(),
        config_path
    );

    // Durable store is optional; without it there is no fallback
    let store = match config.database_url() {
        Some(url) => open_store(&url, config.storage.create_schema).await,
        None => {
            info!("No database configured, persistence disabled");
            None
        }
    };

    let fetcher = Fetcher::new(config.fetch_timeout(), &config.user_agent)?;
    let news = NewsService::new(
        Aggregator::new(registry.clone(), fetcher),
        PersistenceFallback::new(store),
    );

    let state = Arc::new(AppState { news, registry });
    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server starting on http://localhost:3000");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(url: &str, create_schema: bool) -> Option<Arc<dyn ArticleStore>> {
    let db = match Database::new(url).await {
        Ok(db) => db,
        Err(e) => {
            warn!("Could not open database, persistence disabled: {}", e);
            return None;
        }
    };

    if create_schema {
        if let Err(e) = db.initialize().await {
            warn!("Could not create schema, persistence disabled: {}", e);
            return None;
        }
    }

    info!("Database ready");
    Some(Arc::new(db))
}
