// src/ingest/engine.rs
//! Shared scraping engine: one HTTP client (plus optional remote render
//! service) created lazily on first use, reused by every adapter, and
//! released explicitly on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::Settings;
use crate::ingest::types::SourceError;

const USER_AGENT: &str = "hnl-injury-bot/0.1 (+injury news digest)";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub timeout: Duration,
    /// When set, deep page fetches go through `GET {service}?url=<page>`.
    pub scrape_service_url: Option<String>,
}

impl EngineConfig {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            timeout: s.fetch_timeout,
            scrape_service_url: s.scrape_service_url.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ScrapeEngine {
    client: reqwest::Client,
    cfg: EngineConfig,
}

impl ScrapeEngine {
    fn build(cfg: EngineConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4).min(cfg.timeout))
            .timeout(cfg.timeout)
            .build()?;
        Ok(Self { client, cfg })
    }

    /// Plain GET returning the body text; non-2xx is an error.
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.text().await.map_err(|e| self.classify(e))
    }

    /// Fetch a page for deep reading, through the render service when configured.
    pub async fn render_page(&self, url: &str) -> Result<String, SourceError> {
        match &self.cfg.scrape_service_url {
            Some(service) => {
                let mut target = reqwest::Url::parse(service)
                    .map_err(|e| SourceError::Parse(format!("scrape service url: {e}")))?;
                target.query_pairs_mut().append_pair("url", url);
                self.get_text(target.as_str()).await
            }
            None => self.get_text(url).await,
        }
    }

    fn classify(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.cfg.timeout)
        } else {
            SourceError::Http(e)
        }
    }
}

/// Process-wide slot for the engine.
#[derive(Debug)]
pub struct EngineHandle {
    cfg: EngineConfig,
    slot: Mutex<Option<Arc<ScrapeEngine>>>,
}

impl EngineHandle {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            slot: Mutex::new(None),
        }
    }

    /// Returns the running engine, starting it on first use.
    pub async fn get(&self) -> Result<Arc<ScrapeEngine>, SourceError> {
        let mut guard = self.slot.lock().await;
        if let Some(engine) = guard.as_ref() {
            return Ok(engine.clone());
        }
        info!(
            timeout_ms = self.cfg.timeout.as_millis() as u64,
            remote = self.cfg.scrape_service_url.is_some(),
            "starting scrape engine"
        );
        let engine = Arc::new(ScrapeEngine::build(self.cfg.clone())?);
        *guard = Some(engine.clone());
        Ok(engine)
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Drop the engine; the next `get` starts a fresh one.
    pub async fn release(&self) {
        if self.slot.lock().await.take().is_some() {
            info!("scrape engine released");
        }
    }
}
