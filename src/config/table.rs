// src/config/table.rs
//! Versioned bot table: clubs + aliases, event stems, source ranking and the
//! listing sites to scrape. Loaded once at startup; a malformed table fails fast.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BOT_CONFIG_PATH: &str = "config/bot.toml";
pub const ENV_BOT_CONFIG_PATH: &str = "BOT_CONFIG_PATH";

/// Copy of `config/bot.toml` baked into the binary, used when no file is found.
const EMBEDDED_TABLE: &str = include_str!("../../config/bot.toml");

fn default_max_results() -> usize {
    7
}
fn default_prefix() -> usize {
    5
}
fn default_delay_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotTable {
    pub version: u32,
    #[serde(default)]
    pub ranking: RankingCfg,
    #[serde(default)]
    pub escalation: EscalationCfg,
    pub events: EventsCfg,
    pub clubs: Vec<ClubCfg>,
    #[serde(default)]
    pub sites: Vec<SiteCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingCfg {
    #[serde(default)]
    pub priority_sources: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for RankingCfg {
    fn default() -> Self {
        Self {
            priority_sources: Vec::new(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscalationCfg {
    /// How many unfiltered candidates the deep adapter may open.
    #[serde(default = "default_prefix")]
    pub prefix: usize,
    /// Politeness delay between deep fetches.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for EscalationCfg {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsCfg {
    pub stems: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClubCfg {
    pub id: String,
    pub display_name: String,
    pub aliases: Vec<String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default)]
    pub injuries_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteCfg {
    pub label: String,
    pub url: String,
    pub link_selector: String,
}

impl BotTable {
    /// Load using env var + fallbacks:
    /// 1) $BOT_CONFIG_PATH (must exist if set)
    /// 2) config/bot.toml
    /// 3) the embedded copy
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_BOT_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_BOT_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        let local = PathBuf::from(DEFAULT_BOT_CONFIG_PATH);
        if local.exists() {
            return Self::load_from(&local);
        }
        Self::embedded()
    }

    /// The table compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_TABLE).context("parsing embedded bot table")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading bot table from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing bot table at {}", path.display()))
    }

    /// Parse and validate. Stems, aliases and search terms are case-folded and
    /// trimmed here so matchers can compare against lowercased text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut table: BotTable = toml::from_str(s)?;
        table.normalize();
        table.validate()?;
        Ok(table)
    }

    fn normalize(&mut self) {
        self.events.stems = fold_list(std::mem::take(&mut self.events.stems));
        self.ranking.priority_sources =
            fold_list(std::mem::take(&mut self.ranking.priority_sources));
        for club in &mut self.clubs {
            club.id = club.id.trim().to_string();
            club.display_name = club.display_name.trim().to_string();
            club.aliases = fold_list(std::mem::take(&mut club.aliases));
            club.search_terms = fold_list(std::mem::take(&mut club.search_terms));
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ranking.max_results == 0 {
            bail!("ranking.max_results must be at least 1");
        }
        if self.events.stems.is_empty() {
            bail!("events.stems must not be empty");
        }
        if self.clubs.is_empty() {
            bail!("at least one [[clubs]] entry is required");
        }
        for club in &self.clubs {
            if club.id.is_empty() {
                bail!("club `{}` has an empty id", club.display_name);
            }
            if club.display_name.is_empty() {
                bail!("club `{}` has an empty display_name", club.id);
            }
            if club.aliases.is_empty() {
                bail!("club `{}` declares no aliases", club.id);
            }
        }
        for site in &self.sites {
            scraper::Selector::parse(&site.link_selector).map_err(|e| {
                anyhow!("site `{}` link_selector `{}`: {e}", site.label, site.link_selector)
            })?;
            reqwest::Url::parse(&site.url)
                .with_context(|| format!("site `{}` url `{}`", site.label, site.url))?;
        }
        Ok(())
    }
}

/// Trim, lowercase, drop empties and duplicates while keeping declaration order.
fn fold_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
