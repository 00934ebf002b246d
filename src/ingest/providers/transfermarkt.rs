// src/ingest/providers/transfermarkt.rs
//! Site-specific scrape of a club's Transfermarkt injury table. Every row is
//! one candidate; the row itself is the absence event, so its text names the
//! club and the injury list explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::histogram;
use scraper::{ElementRef, Html, Selector};

use crate::ingest::engine::EngineHandle;
use crate::ingest::normalize_text;
use crate::ingest::types::{Candidate, CandidateSource, SourceError, Target};
use crate::registry::Club;

const NAME: &str = "transfermarkt";
const LABEL: &str = "Transfermarkt";
const SITE_ROOT: &str = "https://www.transfermarkt.com";

pub struct Transfermarkt {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        engine: Arc<EngineHandle>,
        /// Replaces scheme+host of each club URL when set.
        base_url: Option<String>,
    },
}

impl Transfermarkt {
    pub fn new(engine: Arc<EngineHandle>, base_url: Option<String>) -> Self {
        Self {
            mode: Mode::Http { engine, base_url },
        }
    }

    pub fn from_fixture_str(html: &str) -> Self {
        Self {
            mode: Mode::Fixture(html.to_string()),
        }
    }

    /// Club injury page, rebased onto `base_url` when one is configured.
    pub fn page_url(club: &Club, base_url: Option<&str>) -> Result<Option<String>, SourceError> {
        let Some(raw) = club.injuries_url.as_deref() else {
            return Ok(None);
        };
        let mut url = reqwest::Url::parse(raw)
            .map_err(|e| SourceError::Parse(format!("injuries url for {}: {e}", club.id)))?;
        if let Some(base) = base_url {
            let base = reqwest::Url::parse(base)
                .map_err(|e| SourceError::Parse(format!("transfermarkt base url: {e}")))?;
            url = base
                .join(url.path())
                .map_err(|e| SourceError::Parse(format!("rebasing injuries url: {e}")))?;
        }
        Ok(Some(url.into()))
    }

    /// Parse the `table.items` injury table.
    pub fn parse_table(html: &str, club: &Club) -> Result<Vec<Candidate>, SourceError> {
        let t0 = std::time::Instant::now();
        let doc = Html::parse_document(html);
        let rows = selector("table.items > tbody > tr")?;
        let player_link = selector("td.hauptlink a")?;
        let root = reqwest::Url::parse(SITE_ROOT)
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let mut out = Vec::new();
        for row in doc.select(&rows) {
            let cells: Vec<ElementRef> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|e| e.value().name() == "td")
                .collect();
            if cells.len() < 4 {
                continue;
            }
            let Some(anchor) = cells[0].select(&player_link).next() else {
                continue;
            };
            let player = element_text(&anchor);
            let injury = element_text(&cells[1]);
            if player.is_empty() || injury.is_empty() {
                continue;
            }
            let since = element_text(&cells[2]);
            let until = element_text(&cells[3]);

            let Some(link) = anchor
                .value()
                .attr("href")
                .and_then(|href| root.join(href).ok())
            else {
                continue;
            };

            let mut c = Candidate::new(format!("{player} – {injury}"), link.to_string(), LABEL)
                .with_body(format!(
                    "{} injury list: out since {}, expected back {}",
                    club.display_name,
                    dash_if_empty(&since),
                    dash_if_empty(&until)
                ));
            c.published_at = parse_table_date(&since);
            out.push(c);
        }

        histogram!("adapter_parse_ms", "provider" => NAME)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl CandidateSource for Transfermarkt {
    async fn fetch(&self, target: &Target) -> Result<Vec<Candidate>, SourceError> {
        let Target::Club(club) = target else {
            return Err(SourceError::Unsupported);
        };
        match &self.mode {
            Mode::Fixture(html) => Self::parse_table(html, club),
            Mode::Http { engine, base_url } => {
                let Some(url) = Self::page_url(club, base_url.as_deref())? else {
                    return Ok(Vec::new());
                };
                let body = engine.get().await?.get_text(&url).await?;
                Self::parse_table(&body, club)
            }
        }
    }

    fn name(&self) -> &str {
        NAME
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|_| SourceError::Selector(css.to_string()))
}

fn element_text(el: &ElementRef) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "), 200)
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() || s == "-" {
        "?"
    } else {
        s
    }
}

/// ".com" renders "Oct 3, 2025"; the German site renders "03.10.2025".
fn parse_table_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    ["%b %d, %Y", "%d.%m.%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
