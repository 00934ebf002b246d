// src/relevance.rs
//! Relevance filter: a candidate passes iff it mentions the queried club
//! (whole word) AND mentions an absence/injury event (stem substring).
//!
//! The two predicates are independent. Stems come from the bot table and are
//! matched as plain substrings of the case-folded text, so truncated Croatian
//! stems ("ozljed", "propust") catch every inflection. On their own they are
//! over-broad; the club predicate narrows them.

use tracing::debug;

use crate::config::table::BotTable;
use crate::ingest::types::Candidate;
use crate::registry::Club;

/// Short anonymised id for log lines; raw text and links are never logged
/// from the filter.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relevance {
    pub club: bool,
    pub event: bool,
    /// Event stems found in the text (declaration order).
    pub matched: Vec<String>,
}

impl Relevance {
    pub fn passed(&self) -> bool {
        self.club && self.event
    }
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    stems: Vec<String>,
}

impl RelevanceFilter {
    /// Stems are case-folded; empty entries are dropped.
    pub fn new<I, S>(stems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stems = stems
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { stems }
    }

    pub fn from_table(table: &BotTable) -> Self {
        Self::new(&table.events.stems)
    }

    pub fn stems(&self) -> &[String] {
        &self.stems
    }

    pub fn is_club_match(&self, text: &str, club: &Club) -> bool {
        club.is_mentioned_in(text)
    }

    pub fn is_event_match(&self, text: &str) -> bool {
        let folded = text.to_lowercase();
        self.stems.iter().any(|s| folded.contains(s.as_str()))
    }

    fn matched_stems(&self, text: &str) -> Vec<String> {
        let folded = text.to_lowercase();
        self.stems
            .iter()
            .filter(|s| folded.contains(s.as_str()))
            .cloned()
            .collect()
    }

    pub fn evaluate(&self, candidate: &Candidate, club: &Club) -> Relevance {
        let text = candidate.match_text();
        let matched = self.matched_stems(&text);
        let rel = Relevance {
            club: self.is_club_match(&text, club),
            event: !matched.is_empty(),
            matched,
        };
        debug!(
            target: "relevance",
            id = %anon_hash(&candidate.link),
            club = %club.id,
            club_match = rel.club,
            event_match = rel.event,
            stems = ?truncate_vec(&rel.matched, 5),
            "evaluated candidate"
        );
        rel
    }

    pub fn passes(&self, candidate: &Candidate, club: &Club) -> bool {
        let text = candidate.match_text();
        self.is_club_match(&text, club) && self.is_event_match(&text)
    }

    /// Keep passing candidates, preserving input order.
    pub fn retain_relevant(&self, candidates: Vec<Candidate>, club: &Club) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|c| self.evaluate(c, club).passed())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn istra() -> Club {
        Club::new("istra", "NK Istra 1961", ["istra", "istra 1961"], None).unwrap()
    }

    fn filter() -> RelevanceFilter {
        RelevanceFilter::new(["ozljed", "Propust", "injur", "  "])
    }

    #[test]
    fn stems_are_folded() {
        assert_eq!(filter().stems(), &["ozljed", "propust", "injur"]);
    }

    #[test]
    fn event_match_is_substring_and_case_insensitive() {
        let f = filter();
        assert!(f.is_event_match("Teška OZLJEDA koljena"));
        assert!(f.is_event_match("propustit će derbi"));
        assert!(f.is_event_match("Knee injury"));
        assert!(!f.is_event_match("Istra slavi pobjedu"));
    }

    #[test]
    fn body_excerpt_counts() {
        let f = filter();
        let c = Candidate::new("Istra prije derbija", "https://x/2", "X")
            .with_body("Trener potvrdio: napadač propušta utakmicu zbog ozljede.");
        assert!(f.passes(&c, &istra()));
        let rel = f.evaluate(&c, &istra());
        assert!(rel.passed());
        assert_eq!(rel.matched, vec!["ozljed"]);
    }

    #[test]
    fn conjunction_truth_table() {
        let f = filter();
        let club = istra();
        let cases = [
            ("Istra: ozljeda stopera", true),
            ("Istra slavi pobjedu", false),
            ("Hajduk: ozljeda stopera", false),
            ("Hajduk slavi pobjedu", false),
        ];
        for (title, expect) in cases {
            let c = Candidate::new(title, title, "X");
            assert_eq!(f.passes(&c, &club), expect, "{title}");
            assert_eq!(f.evaluate(&c, &club).passed(), expect, "{title}");
        }
    }

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("https://x/1");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("https://x/1"));
        assert_ne!(a, anon_hash("https://x/2"));
    }
}
