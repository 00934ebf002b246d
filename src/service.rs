//! Request facade: registry lookup, cache, then aggregation on a miss.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::aggregate::{AggregatePolicy, Aggregator, RankedResult};
use crate::cache::ResultCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{BotTable, Settings};
use crate::ingest::engine::{EngineConfig, EngineHandle};
use crate::ingest::providers::{article_body::ArticleBody, build_sources};
use crate::rank::Ranker;
use crate::registry::{Club, Registry};
use crate::relevance::RelevanceFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

pub struct InjuryService {
    registry: Arc<Registry>,
    cache: ResultCache,
    aggregator: Aggregator,
    engine: Option<Arc<EngineHandle>>,
}

impl InjuryService {
    pub fn new(registry: Arc<Registry>, cache: ResultCache, aggregator: Aggregator) -> Self {
        Self {
            registry,
            cache,
            aggregator,
            engine: None,
        }
    }

    /// Full production wiring: HTTP-backed adapters sharing one engine handle,
    /// the article-body adapter for escalation, and a wall clock.
    pub fn from_config(table: &BotTable, settings: &Settings) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let registry = Arc::new(Registry::from_table(table).context("building club registry")?);
        let engine = Arc::new(EngineHandle::new(EngineConfig::from_settings(settings)));
        let sources =
            build_sources(table, settings, engine.clone()).context("building source adapters")?;
        info!(
            clubs = registry.len(),
            adapters = sources.len(),
            ttl_secs = settings.cache_ttl.as_secs(),
            "injury service ready"
        );

        let aggregator = Aggregator::new(
            sources,
            RelevanceFilter::from_table(table),
            Ranker::from_table(table),
            AggregatePolicy::from_config(table, settings),
            clock.clone(),
        )
        .with_deep(Arc::new(ArticleBody::new(engine.clone())));

        Ok(Self {
            registry,
            cache: ResultCache::new(settings.cache_ttl, clock),
            aggregator,
            engine: Some(engine),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Cached result when fresh, otherwise a new aggregation. Empty results
    /// are not stored so the next request tries the sources again.
    pub async fn lookup(&self, club: &Club) -> (RankedResult, CacheStatus) {
        if let Some(hit) = self.cache.get(&club.id) {
            return (hit, CacheStatus::Hit);
        }
        let fresh = self.aggregator.fetch_for_club(club).await;
        if !fresh.is_empty() {
            self.cache.put(&club.id, fresh.clone());
        }
        (fresh, CacheStatus::Miss)
    }

    /// Drops every cached result; returns how many were dropped.
    pub fn refresh(&self) -> usize {
        let n = self.cache.invalidate_all();
        info!(dropped = n, "cache cleared on request");
        n
    }

    /// Releases the shared scrape engine, if this service owns one.
    pub async fn shutdown(&self) {
        if let Some(engine) = &self.engine {
            engine.release().await;
        }
    }
}
