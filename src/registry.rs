//! # Entity Registry
//!
//! Static alias → club mapping built once from the bot table.
//!
//! - Many aliases may point at one club ("istra", "istra 1961").
//! - `resolve` is an exact lookup on the case-folded alias; no fuzzy matching.
//! - `suggest` is a separate, best-effort hint for replies on an alias miss.
//! - A duplicate alias is accepted and resolves to the last-defined club.

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::config::table::{BotTable, ClubCfg};

/// Minimum Jaro-Winkler similarity for an alias suggestion.
const SUGGEST_MIN_SIMILARITY: f64 = 0.85;

#[derive(Debug, Clone, Serialize)]
pub struct Club {
    pub id: String,
    pub display_name: String,
    /// Lowercase synonyms matched as whole words in candidate text.
    pub search_terms: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injuries_url: Option<String>,
    #[serde(skip)]
    matcher: Regex,
}

impl PartialEq for Club {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.display_name == other.display_name
    }
}

impl Eq for Club {}

impl Club {
    /// Build a club; search terms fall back to the aliases and always include
    /// the lowercased display name.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        search_terms: impl IntoIterator<Item = impl AsRef<str>>,
        injuries_url: Option<String>,
    ) -> Result<Self> {
        let id = id.into();
        let display_name = display_name.into();
        let mut terms: BTreeSet<String> = search_terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        terms.insert(display_name.trim().to_lowercase());
        let matcher = whole_word_pattern(&terms)
            .map_err(|e| anyhow!("club `{id}` search terms do not compile: {e}"))?;
        Ok(Self {
            id,
            display_name,
            search_terms: terms,
            injuries_url,
            matcher,
        })
    }

    fn from_cfg(cfg: &ClubCfg) -> Result<Self> {
        let terms = if cfg.search_terms.is_empty() {
            &cfg.aliases
        } else {
            &cfg.search_terms
        };
        Self::new(
            cfg.id.clone(),
            cfg.display_name.clone(),
            terms,
            cfg.injuries_url.clone(),
        )
    }

    /// Whole-word, case-insensitive match of any search term.
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

/// `\b(?:longest|...|shortest)\b`; the regex crate's `\b` is Unicode-aware, so
/// "varaždin" and "istra" only match as standalone words.
fn whole_word_pattern(terms: &BTreeSet<String>) -> Result<Regex, regex::Error> {
    let mut sorted: Vec<&String> = terms.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alternation = sorted
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?iu)\b(?:{alternation})\b"))
}

#[derive(Debug, Clone)]
pub struct Registry {
    by_alias: HashMap<String, Arc<Club>>,
    clubs: Vec<Arc<Club>>,
}

impl Registry {
    pub fn from_table(table: &BotTable) -> Result<Self> {
        let mut by_alias: HashMap<String, Arc<Club>> = HashMap::new();
        let mut clubs = Vec::with_capacity(table.clubs.len());

        for cfg in &table.clubs {
            let club = Arc::new(Club::from_cfg(cfg)?);
            for alias in &cfg.aliases {
                if let Some(prev) = by_alias.insert(alias.clone(), club.clone()) {
                    if prev.id != club.id {
                        tracing::warn!(
                            %alias,
                            previous = %prev.id,
                            winner = %club.id,
                            "duplicate alias; last definition wins"
                        );
                    }
                }
            }
            clubs.push(club);
        }

        Ok(Self { by_alias, clubs })
    }

    /// Exact alias lookup. Callers pass case-folded, trimmed text; folding is
    /// repeated here so direct API callers get the same answer.
    pub fn resolve(&self, alias: &str) -> Option<Arc<Club>> {
        let key = alias.trim().to_lowercase();
        self.by_alias.get(&key).cloned()
    }

    /// Canonical clubs, one per display name, sorted lexicographically.
    pub fn list_canonical(&self) -> Vec<Arc<Club>> {
        let mut seen = BTreeSet::new();
        let mut out: Vec<Arc<Club>> = self
            .clubs
            .iter()
            .filter(|c| seen.insert(c.display_name.clone()))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        out
    }

    /// Closest alias by Jaro-Winkler, if it is close enough to be a typo.
    pub fn suggest(&self, alias: &str) -> Option<(String, Arc<Club>)> {
        let key = alias.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.by_alias
            .iter()
            .map(|(a, c)| (strsim::jaro_winkler(&key, a), a, c))
            .filter(|(sim, _, _)| *sim >= SUGGEST_MIN_SIMILARITY)
            .max_by(|x, y| x.0.total_cmp(&y.0).then_with(|| y.1.cmp(x.1)))
            .map(|(_, a, c)| (a.clone(), c.clone()))
    }

    pub fn len(&self) -> usize {
        self.clubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clubs.is_empty()
    }
}
