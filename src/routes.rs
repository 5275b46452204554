use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::{
    cache::PromotionCache,
    config::Config,
    scrape::{fetcher::FetchError, types::PromotionRecord},
};

const API_CACHE_CONTROL: &str = "public, max-age=60";

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<PromotionCache>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreePromotionsResponse {
    pub updated_at: String,
    pub items: Vec<PromotionRecord>,
    pub upcoming: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Turns a failed refresh into the 500 body the frontend expects.
#[derive(Debug)]
pub struct ApiError(FetchError);

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = error_message(self.0.to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error })).into_response()
    }
}

fn error_message(message: String) -> String {
    if message.trim().is_empty() {
        "fetch_failed".to_string()
    } else {
        message
    }
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn free_promotions(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.cache.get_or_refresh().await.map_err(|e| {
        tracing::error!("Serving /api/free failed: {}", e);
        ApiError::from(e)
    })?;

    let body = FreePromotionsResponse {
        updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        items: snapshot.items.clone(),
        upcoming: snapshot.upcoming.clone(),
    };

    Ok(([(header::CACHE_CONTROL, API_CACHE_CONTROL)], Json(body)).into_response())
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health))
        .route("/api/free", get(free_promotions))
        .fallback_service(static_files)
        .with_state(state)
}
