use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod routes;
mod scrape;

use cache::PromotionCache;
use config::Config;
use routes::{create_router, AppState};
use scrape::fetcher::SteamDbClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freegames_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let source = Arc::new(SteamDbClient::new(&config)?);
    let cache = Arc::new(PromotionCache::new(
        source,
        config.site_base()?,
        config.cache_ttl(),
    ));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        "Scraping {} (cache {}s, timeout {}s)",
        config.source_url,
        config.cache_ttl_secs,
        config.fetch_timeout_secs
    );

    let state = AppState {
        config: Arc::new(config),
        cache,
    };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
