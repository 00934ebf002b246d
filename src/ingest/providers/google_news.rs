// src/ingest/providers/google_news.rs
//! Feed-based search: Google News RSS queried with a club's search terms.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::engine::EngineHandle;
use crate::ingest::normalize_text;
use crate::ingest::types::{Candidate, CandidateSource, SourceError, Target};
use crate::registry::Club;

const NAME: &str = "google-news";
const TITLE_MAX_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<ItemSource>,
}
#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text")]
    name: Option<String>,
}

/// RFC 2822 via `time`; obsolete zone names ("GMT") fall back to chrono.
pub(crate) fn parse_rfc2822(ts: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.with_timezone(&chrono::Utc))
        })
}

pub struct GoogleNewsRss {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        engine: Arc<EngineHandle>,
        base_url: String,
    },
}

impl GoogleNewsRss {
    pub fn new(engine: Arc<EngineHandle>, base_url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                engine,
                base_url: base_url.into(),
            },
        }
    }

    /// Serve a fixed feed regardless of the club asked for.
    pub fn from_fixture_str(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// `"term a" OR "term b"`, restricted to the last week.
    pub fn query_for(club: &Club) -> String {
        let terms = club
            .search_terms
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("{terms} when:7d")
    }

    pub fn search_url(base_url: &str, club: &Club) -> Result<String, SourceError> {
        let mut url = reqwest::Url::parse(base_url)
            .map_err(|e| SourceError::Parse(format!("google news base url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("q", &Self::query_for(club))
            .append_pair("hl", "hr")
            .append_pair("gl", "HR")
            .append_pair("ceid", "HR:hr");
        Ok(url.into())
    }

    pub fn parse_feed(xml: &str) -> Result<Vec<Candidate>, SourceError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .map_err(|e| SourceError::Parse(format!("google news rss: {e}")))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let Some(link) = it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
            else {
                continue;
            };
            let source = it
                .source
                .and_then(|s| s.name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Google News".to_string());
            let raw_title = normalize_text(it.title.as_deref().unwrap_or_default(), TITLE_MAX_CHARS);
            let title = strip_source_suffix(&raw_title, &source);
            if title.is_empty() {
                continue;
            }

            let mut c = Candidate::new(title, link, source);
            c.published_at = it.pub_date.as_deref().and_then(parse_rfc2822);
            c.body_excerpt = it
                .description
                .as_deref()
                .map(|d| normalize_text(d, crate::ingest::EXCERPT_MAX_CHARS))
                .filter(|d| !d.is_empty());
            out.push(c);
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("adapter_parse_ms", "provider" => NAME).record(ms);
        Ok(out)
    }
}

#[async_trait]
impl CandidateSource for GoogleNewsRss {
    async fn fetch(&self, target: &Target) -> Result<Vec<Candidate>, SourceError> {
        let Target::Club(club) = target else {
            return Err(SourceError::Unsupported);
        };
        match &self.mode {
            Mode::Fixture(xml) => Self::parse_feed(xml),
            Mode::Http { engine, base_url } => {
                let url = Self::search_url(base_url, club)?;
                let body = engine.get().await?.get_text(&url).await?;
                Self::parse_feed(&body)
            }
        }
    }

    fn name(&self) -> &str {
        NAME
    }
}

/// Google appends " - <Publisher>" to every title.
fn strip_source_suffix(title: &str, source: &str) -> String {
    let suffix = format!(" - {source}");
    title
        .strip_suffix(&suffix)
        .unwrap_or(title)
        .trim()
        .to_string()
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&bdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_quotes_terms() {
        let club = Club::new("istra", "NK Istra 1961", ["istra", "istra 1961"], None).unwrap();
        let q = GoogleNewsRss::query_for(&club);
        assert!(q.contains("\"istra\""));
        assert!(q.contains("\"istra 1961\""));
        assert!(q.contains("\"nk istra 1961\""));
        assert!(q.ends_with("when:7d"));
    }

    #[test]
    fn search_url_encodes_query() {
        let club = Club::new("istra", "NK Istra 1961", ["istra"], None).unwrap();
        let url = GoogleNewsRss::search_url("https://news.google.com/rss/search", &club).unwrap();
        assert!(url.starts_with("https://news.google.com/rss/search?q="));
        assert!(url.contains("ceid=HR%3Ahr"));
        assert!(!url.contains(' '));
    }

    #[test]
    fn rfc2822_dates_parse() {
        let dt = parse_rfc2822("Tue, 14 Oct 2025 08:30:00 GMT").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-10-14T08:30:00+00:00");
        assert!(parse_rfc2822("yesterday").is_none());
    }

    #[test]
    fn publisher_suffix_is_removed() {
        assert_eq!(
            strip_source_suffix("Istra bez stopera - Index.hr", "Index.hr"),
            "Istra bez stopera"
        );
        assert_eq!(strip_source_suffix("A - B", "C"), "A - B");
    }
}
