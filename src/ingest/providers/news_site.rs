// src/ingest/providers/news_site.rs
//! Site-specific scrape of one sports listing page (Index.hr, 24sata, ...).
//! The listing is not club-specific: every headline is a candidate and the
//! relevance filter decides what survives.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::histogram;
use scraper::{ElementRef, Html, Selector};

use crate::config::table::SiteCfg;
use crate::ingest::engine::EngineHandle;
use crate::ingest::normalize_text;
use crate::ingest::types::{Candidate, CandidateSource, SourceError, Target};

const TITLE_MAX_CHARS: usize = 300;

pub struct NewsSiteListing {
    label: String,
    page_url: reqwest::Url,
    link_selector: Selector,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http(Arc<EngineHandle>),
}

impl NewsSiteListing {
    pub fn new(site: &SiteCfg, engine: Arc<EngineHandle>) -> Result<Self, SourceError> {
        Self::build(site, Mode::Http(engine))
    }

    pub fn from_fixture_str(site: &SiteCfg, html: &str) -> Result<Self, SourceError> {
        Self::build(site, Mode::Fixture(html.to_string()))
    }

    fn build(site: &SiteCfg, mode: Mode) -> Result<Self, SourceError> {
        let link_selector = Selector::parse(&site.link_selector)
            .map_err(|_| SourceError::Selector(site.link_selector.clone()))?;
        let page_url = reqwest::Url::parse(&site.url)
            .map_err(|e| SourceError::Parse(format!("site `{}` url: {e}", site.label)))?;
        Ok(Self {
            label: site.label.clone(),
            page_url,
            link_selector,
            mode,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Headlines matched by the link selector. Relative hrefs resolve against
    /// the page URL; the anchor's text is the title, falling back to its
    /// `title` attribute.
    pub fn parse_listing(&self, html: &str) -> Vec<Candidate> {
        let t0 = std::time::Instant::now();
        let doc = Html::parse_document(html);
        let mut out = Vec::new();
        for el in doc.select(&self.link_selector) {
            let Some(anchor) = nearest_anchor(el) else {
                continue;
            };
            let Some(link) = anchor
                .value()
                .attr("href")
                .and_then(|href| self.page_url.join(href.trim()).ok())
            else {
                continue;
            };
            if !matches!(link.scheme(), "http" | "https") {
                continue;
            }

            let mut title = normalize_text(&el.text().collect::<Vec<_>>().join(" "), TITLE_MAX_CHARS);
            if title.is_empty() {
                title = anchor
                    .value()
                    .attr("title")
                    .map(|t| normalize_text(t, TITLE_MAX_CHARS))
                    .unwrap_or_default();
            }
            if title.is_empty() {
                continue;
            }
            out.push(Candidate::new(title, link.to_string(), self.label.clone()));
        }

        histogram!("adapter_parse_ms", "provider" => self.label.clone())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        out
    }
}

/// The element itself when it is an `<a href>`, else its first descendant one.
fn nearest_anchor(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if el.value().name() == "a" && el.value().attr("href").is_some() {
        return Some(el);
    }
    el.descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "a" && e.value().attr("href").is_some())
}

#[async_trait]
impl CandidateSource for NewsSiteListing {
    async fn fetch(&self, target: &Target) -> Result<Vec<Candidate>, SourceError> {
        if !matches!(target, Target::Club(_)) {
            return Err(SourceError::Unsupported);
        }
        match &self.mode {
            Mode::Fixture(html) => Ok(self.parse_listing(html)),
            Mode::Http(engine) => {
                let body = engine.get().await?.get_text(self.page_url.as_str()).await?;
                Ok(self.parse_listing(&body))
            }
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}
