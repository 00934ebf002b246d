//! # Ranker
//! Priority sources first, then newest first; undated items sink below dated
//! ones. The sort is stable, so equal keys keep their input order and ranking
//! an already-ranked list changes nothing.

use std::cmp::Ordering;

use crate::config::table::BotTable;
use crate::ingest::types::Candidate;

#[derive(Debug, Clone)]
pub struct Ranker {
    /// Lowercase fragments matched against `source_label`.
    priority_sources: Vec<String>,
    max_results: usize,
}

impl Ranker {
    pub fn new<I, S>(priority_sources: I, max_results: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            priority_sources: priority_sources
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            max_results,
        }
    }

    pub fn from_table(table: &BotTable) -> Self {
        Self::new(&table.ranking.priority_sources, table.ranking.max_results)
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn is_priority(&self, c: &Candidate) -> bool {
        let label = c.source_label.to_lowercase();
        self.priority_sources
            .iter()
            .any(|p| label.contains(p.as_str()))
    }

    /// Full ordering without truncation.
    pub fn order(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| {
            self.is_priority(b)
                .cmp(&self.is_priority(a))
                .then_with(|| newest_first(a, b))
        });
        candidates
    }

    /// Order and truncate to `max_results`. Never pads.
    pub fn rank(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut out = self.order(candidates);
        out.truncate(self.max_results);
        out
    }

    /// Newest first regardless of source, truncated to `max_results`.
    pub fn latest(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(newest_first);
        candidates.truncate(self.max_results);
        candidates
    }
}

pub(crate) fn newest_first(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
