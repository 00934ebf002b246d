// src/config/settings.rs
//! Environment-provided runtime settings. Every option has a default, so an
//! empty environment is valid.

use std::time::Duration;

pub const ENV_PORT: &str = "PORT";
pub const ENV_TRANSFERMARKT_BASE_URL: &str = "TRANSFERMARKT_BASE_URL";
pub const ENV_GOOGLE_NEWS_BASE_URL: &str = "GOOGLE_NEWS_BASE_URL";
pub const ENV_SCRAPE_SERVICE_URL: &str = "SCRAPE_SERVICE_URL";
pub const ENV_CACHE_TTL_MINUTES: &str = "CACHE_TTL_MINUTES";
pub const ENV_COMMAND_PREFIX: &str = "COMMAND_PREFIX";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 30;
pub const DEFAULT_COMMAND_PREFIX: &str = "!hnl";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_GOOGLE_NEWS_BASE_URL: &str = "https://news.google.com/rss/search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    /// Replaces the scheme+host of each club's Transfermarkt URL (mirrors, tests).
    pub transfermarkt_base_url: Option<String>,
    pub google_news_base_url: String,
    /// Remote deep-scrape service; article bodies are fetched directly when unset.
    pub scrape_service_url: Option<String>,
    pub cache_ttl: Duration,
    pub command_prefix: String,
    pub fetch_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            transfermarkt_base_url: None,
            google_news_base_url: DEFAULT_GOOGLE_NEWS_BASE_URL.to_string(),
            scrape_service_url: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_MINUTES * 60),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            log_format: LogFormat::Compact,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build settings from any key lookup (env, map in tests).
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Settings::default();
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(ENV_PORT, non_empty(ENV_PORT), d.port);
        let ttl_min = parse_or(
            ENV_CACHE_TTL_MINUTES,
            non_empty(ENV_CACHE_TTL_MINUTES),
            DEFAULT_CACHE_TTL_MINUTES,
        );
        let timeout_secs = parse_or(
            ENV_FETCH_TIMEOUT_SECS,
            non_empty(ENV_FETCH_TIMEOUT_SECS),
            DEFAULT_FETCH_TIMEOUT_SECS,
        );
        let log_format = match non_empty(ENV_LOG_FORMAT)
            .map(|v| v.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Self {
            port,
            transfermarkt_base_url: non_empty(ENV_TRANSFERMARKT_BASE_URL),
            google_news_base_url: non_empty(ENV_GOOGLE_NEWS_BASE_URL)
                .unwrap_or(d.google_news_base_url),
            scrape_service_url: non_empty(ENV_SCRAPE_SERVICE_URL),
            cache_ttl: Duration::from_secs(ttl_min.max(1).saturating_mul(60)),
            command_prefix: non_empty(ENV_COMMAND_PREFIX)
                .map(|p| p.to_lowercase())
                .unwrap_or(d.command_prefix),
            fetch_timeout: Duration::from_secs(timeout_secs.max(1)),
            log_format,
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        None => default,
        Some(v) => v.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, %default, "unparsable setting, using default");
            default
        }),
    }
}
