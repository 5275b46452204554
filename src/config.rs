use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub source_url: String,
    pub site_base_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub fetch_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub static_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            port: parse_number(&lookup, "PORT", 3000)?,
            source_url: var("FREEGAMES_SOURCE_URL", "https://steamdb.info/upcoming/free/"),
            site_base_url: var("FREEGAMES_SITE_BASE_URL", "https://steamdb.info"),
            user_agent: var("FREEGAMES_USER_AGENT", "Mozilla/5.0 (single-page demo)"),
            accept_language: var("FREEGAMES_ACCEPT_LANGUAGE", "en-US,en;q=0.9"),
            fetch_timeout_secs: parse_number(&lookup, "FETCH_TIMEOUT_SECS", 20)?,
            cache_ttl_secs: parse_number(&lookup, "CACHE_TTL_SECS", 5 * 60)?,
            static_dir: var("STATIC_DIR", "public"),
        };

        // Fail at startup rather than on the first request.
        config.site_base()?;
        Url::parse(&config.source_url)
            .map_err(|e| anyhow::anyhow!("FREEGAMES_SOURCE_URL is not a valid URL: {}", e))?;

        Ok(config)
    }

    pub fn site_base(&self) -> anyhow::Result<Url> {
        Url::parse(&self.site_base_url)
            .map_err(|e| anyhow::anyhow!("FREEGAMES_SITE_BASE_URL is not a valid URL: {}", e))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a number, got {:?}", key, raw)),
        None => Ok(default),
    }
}
