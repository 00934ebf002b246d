// src/ingest/types.rs
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::registry::Club;

/// One raw item from an adapter, before filtering. `link` is its identity.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub link: String,
    pub source_label: String,
    pub published_at: Option<DateTime<Utc>>,
    pub body_excerpt: Option<String>,
}

impl Candidate {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            source_label: source_label.into(),
            published_at: None,
            body_excerpt: None,
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body_excerpt = Some(body.into());
        self
    }

    /// Title plus body excerpt (when present); the text the relevance
    /// predicates run against.
    pub fn match_text(&self) -> String {
        match &self.body_excerpt {
            Some(body) if !body.is_empty() => format!("{} {}", self.title, body),
            _ => self.title.clone(),
        }
    }
}

/// What an adapter is asked to fetch.
#[derive(Debug, Clone)]
pub enum Target {
    /// Everything the source knows about a club (search, injury table, listing).
    Club(Club),
    /// Deepen one known candidate by reading its page.
    Article(Candidate),
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("target not supported by this source")]
    Unsupported,
}

impl SourceError {
    /// Short label used as a metrics/log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Http(_) => "http",
            SourceError::Status { .. } => "status",
            SourceError::Timeout(_) => "timeout",
            SourceError::Parse(_) => "parse",
            SourceError::Selector(_) => "selector",
            SourceError::Unsupported => "unsupported",
        }
    }
}

/// A candidate source. Implementations return their failure instead of
/// swallowing it; the aggregator decides what a failure means.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch(&self, target: &Target) -> Result<Vec<Candidate>, SourceError>;
    fn name(&self) -> &str;
}
