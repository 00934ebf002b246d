// src/ingest/providers/article_body.rs
//! Deep adapter: opens one candidate's page and fills in its body excerpt so
//! the relevance filter can see the full article text.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};

use crate::ingest::engine::EngineHandle;
use crate::ingest::types::{Candidate, CandidateSource, SourceError, Target};
use crate::ingest::{normalize_text, EXCERPT_MAX_CHARS};

const NAME: &str = "article-body";

/// Paragraph selectors tried in order; the first that yields text wins.
const BODY_SELECTORS: &[&str] = &["article p", "main p", "p"];

pub struct ArticleBody {
    engine: Arc<EngineHandle>,
}

impl ArticleBody {
    pub fn new(engine: Arc<EngineHandle>) -> Self {
        Self { engine }
    }

    /// Returns `candidate` with `body_excerpt` (and a missing `published_at`)
    /// taken from the article markup. Title, link and source stay as they were.
    pub fn enrich(candidate: &Candidate, html: &str) -> Candidate {
        let doc = Html::parse_document(html);
        let mut out = candidate.clone();

        let body = BODY_SELECTORS
            .iter()
            .filter_map(|css| Selector::parse(css).ok())
            .map(|sel| {
                let paragraphs: Vec<String> = doc
                    .select(&sel)
                    .map(|p| p.text().collect::<Vec<_>>().join(" "))
                    .collect();
                normalize_text(&paragraphs.join(" "), EXCERPT_MAX_CHARS)
            })
            .find(|text| !text.is_empty())
            .or_else(|| meta_content(&doc, r#"meta[property="og:description"]"#));
        if let Some(body) = body {
            out.body_excerpt = Some(body);
        }

        if out.published_at.is_none() {
            out.published_at = meta_content(&doc, r#"meta[property="article:published_time"]"#)
                .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
                .map(|dt| dt.with_timezone(&Utc));
        }
        out
    }
}

fn meta_content(doc: &Html, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    doc.select(&sel)
        .filter_map(|m| m.value().attr("content"))
        .map(|c| normalize_text(c, EXCERPT_MAX_CHARS))
        .find(|c| !c.is_empty())
}

#[async_trait]
impl CandidateSource for ArticleBody {
    async fn fetch(&self, target: &Target) -> Result<Vec<Candidate>, SourceError> {
        let Target::Article(candidate) = target else {
            return Err(SourceError::Unsupported);
        };
        let html = self.engine.get().await?.render_page(&candidate.link).await?;
        Ok(vec![Self::enrich(candidate, &html)])
    }

    fn name(&self) -> &str {
        NAME
    }
}
