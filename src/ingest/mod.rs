// src/ingest/mod.rs
pub mod engine;
pub mod providers;
pub mod types;

use crate::ingest::types::Candidate;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// Default cap for body excerpts kept on a candidate.
pub const EXCERPT_MAX_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregate_runs_total", "Aggregations executed.");
        describe_counter!(
            "adapter_candidates_total",
            "Candidates returned by adapters."
        );
        describe_counter!("adapter_errors_total", "Adapter fetch/parse failures.");
        describe_histogram!("adapter_fetch_ms", "Adapter fetch time in milliseconds.");
        describe_histogram!("adapter_parse_ms", "Adapter parse time in milliseconds.");
        describe_counter!(
            "escalations_total",
            "Aggregations that fell back to body fetching."
        );
        describe_counter!(
            "fallback_unfiltered_total",
            "Aggregations answered with unconfirmed latest items."
        );
        describe_counter!("cache_hits_total", "Result cache hits.");
        describe_counter!("cache_misses_total", "Result cache misses.");
        describe_counter!("cache_invalidations_total", "Explicit cache invalidations.");
        describe_gauge!("cache_ttl_seconds", "Configured result cache TTL.");
    });
}

/// Normalize scraped text: decode entities, strip tags, fold quotes and
/// whitespace, cap at `max_chars`.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” „ ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{201E}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (includes NBSP)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }

    out
}

/// Stable dedup by exact `link`; first occurrence wins.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.link.clone()))
        .collect()
}
