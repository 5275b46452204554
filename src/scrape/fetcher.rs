use crate::config::Config;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Upstream returned HTTP {status}")]
    Status { status: u16 },
}

/// Anything that can hand back the raw listing page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self) -> Result<String, FetchError>;
}

pub struct SteamDbClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl SteamDbClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let accept_language = HeaderValue::from_str(&config.accept_language)
            .map_err(|e| FetchError::Client(format!("invalid Accept-Language: {}", e)))?;
        headers.insert(ACCEPT_LANGUAGE, accept_language);

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.source_url.clone(),
            timeout: config.fetch_timeout(),
        })
    }

    fn request_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(e)
        }
    }
}

#[async_trait]
impl PageSource for SteamDbClient {
    async fn fetch_page(&self) -> Result<String, FetchError> {
        tracing::debug!("Fetching promotions page from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Promotions page returned HTTP {}", status);
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        tracing::debug!("Fetched {} bytes from {}", body.len(), self.url);

        Ok(body)
    }
}
