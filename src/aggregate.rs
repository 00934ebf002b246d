//! # Aggregator
//!
//! Fans a club request out to every configured adapter at once, waits for all
//! of them (a failed or timed-out adapter contributes nothing), then runs
//! filter → dedup → rank over the merged pool.
//!
//! When nothing survives the filter:
//! 1. the deep adapter (if any) reads the first few unfiltered candidates one
//!    at a time, with a politeness delay between pages, and the filter runs
//!    again on the full text;
//! 2. if that also finds nothing, the newest unfiltered items are returned,
//!    tagged [`ResultKind::Latest`] so replies can say they are unconfirmed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{BotTable, Settings};
use crate::ingest::types::{Candidate, CandidateSource, SourceError, Target};
use crate::ingest::{dedupe, ensure_metrics_described};
use crate::rank::Ranker;
use crate::registry::Club;
use crate::relevance::RelevanceFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// Every item passed the relevance filter.
    Confirmed,
    /// Nothing passed; these are simply the newest items seen.
    Latest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub items: Vec<Candidate>,
    pub kind: ResultKind,
    pub generated_at: DateTime<Utc>,
}

impl RankedResult {
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            items: Vec::new(),
            kind: ResultKind::Confirmed,
            generated_at: at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_confirmed(&self) -> bool {
        self.kind == ResultKind::Confirmed
    }
}

/// One adapter call. The error is kept for logs/metrics and only collapsed to
/// "no candidates" when the pool is merged.
#[derive(Debug)]
pub struct AdapterOutcome {
    pub source: String,
    pub result: Result<Vec<Candidate>, SourceError>,
}

impl AdapterOutcome {
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.result.unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct AggregatePolicy {
    /// Upper bound for one adapter call.
    pub fetch_timeout: Duration,
    /// How many unfiltered candidates the deep adapter may open.
    pub escalation_prefix: usize,
    /// Pause between two deep fetches.
    pub escalation_delay: Duration,
}

impl Default for AggregatePolicy {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            escalation_prefix: 5,
            escalation_delay: Duration::from_millis(1500),
        }
    }
}

impl AggregatePolicy {
    pub fn from_config(table: &BotTable, settings: &Settings) -> Self {
        Self {
            fetch_timeout: settings.fetch_timeout,
            escalation_prefix: table.escalation.prefix,
            escalation_delay: Duration::from_millis(table.escalation.delay_ms),
        }
    }
}

pub struct Aggregator {
    sources: Vec<Arc<dyn CandidateSource>>,
    deep: Option<Arc<dyn CandidateSource>>,
    filter: RelevanceFilter,
    ranker: Ranker,
    policy: AggregatePolicy,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(
        sources: Vec<Arc<dyn CandidateSource>>,
        filter: RelevanceFilter,
        ranker: Ranker,
        policy: AggregatePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sources,
            deep: None,
            filter,
            ranker,
            policy,
            clock,
        }
    }

    /// Adapter used for escalation; it receives `Target::Article`.
    pub fn with_deep(mut self, deep: Arc<dyn CandidateSource>) -> Self {
        self.deep = Some(deep);
        self
    }

    pub fn max_results(&self) -> usize {
        self.ranker.max_results()
    }

    pub async fn fetch_for_club(&self, club: &Club) -> RankedResult {
        ensure_metrics_described();
        counter!("aggregate_runs_total").increment(1);
        let started = Instant::now();

        let target = Target::Club(club.clone());
        let outcomes = join_all(self.sources.iter().map(|s| self.call(s.as_ref(), &target))).await;
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        let pool: Vec<Candidate> = outcomes
            .into_iter()
            .flat_map(AdapterOutcome::into_candidates)
            .collect();
        let pool_len = pool.len();

        let relevant = dedupe(self.filter.retain_relevant(pool.clone(), club));
        let result = if !relevant.is_empty() {
            self.confirmed(self.ranker.rank(relevant))
        } else {
            let unfiltered = dedupe(pool);
            let deepened = match &self.deep {
                Some(deep) if !unfiltered.is_empty() => {
                    self.escalate(deep.as_ref(), club, &unfiltered).await
                }
                _ => Vec::new(),
            };
            if !deepened.is_empty() {
                self.confirmed(self.ranker.rank(deepened))
            } else if unfiltered.is_empty() {
                RankedResult::empty(self.clock.now())
            } else {
                counter!("fallback_unfiltered_total").increment(1);
                RankedResult {
                    items: self.ranker.latest(unfiltered),
                    kind: ResultKind::Latest,
                    generated_at: self.clock.now(),
                }
            }
        };

        info!(
            club = %club.id,
            adapters = self.sources.len(),
            failed,
            pool = pool_len,
            returned = result.len(),
            kind = ?result.kind,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation finished"
        );
        result
    }

    fn confirmed(&self, items: Vec<Candidate>) -> RankedResult {
        RankedResult {
            items,
            kind: ResultKind::Confirmed,
            generated_at: self.clock.now(),
        }
    }

    /// Sequential deep reads over the best-ranked prefix of the pool. Stops once
    /// `max_results` relevant items are found or the prefix is used up.
    async fn escalate(
        &self,
        deep: &dyn CandidateSource,
        club: &Club,
        pool: &[Candidate],
    ) -> Vec<Candidate> {
        counter!("escalations_total").increment(1);
        let prefix: Vec<Candidate> = self
            .ranker
            .order(pool.to_vec())
            .into_iter()
            .take(self.policy.escalation_prefix)
            .collect();
        debug!(club = %club.id, pages = prefix.len(), "escalating to body fetch");

        let mut found = Vec::new();
        for (i, candidate) in prefix.into_iter().enumerate() {
            if i > 0 && !self.policy.escalation_delay.is_zero() {
                tokio::time::sleep(self.policy.escalation_delay).await;
            }
            let outcome = self.call(deep, &Target::Article(candidate)).await;
            found.extend(
                outcome
                    .into_candidates()
                    .into_iter()
                    .filter(|c| self.filter.passes(c, club)),
            );
            if found.len() >= self.max_results() {
                break;
            }
        }
        dedupe(found)
    }

    /// One bounded adapter call; never fails outward.
    async fn call(&self, source: &dyn CandidateSource, target: &Target) -> AdapterOutcome {
        let name = source.name().to_string();
        let t0 = Instant::now();
        let result = match tokio::time::timeout(self.policy.fetch_timeout, source.fetch(target)).await
        {
            Ok(r) => r,
            Err(_) => Err(SourceError::Timeout(self.policy.fetch_timeout)),
        };
        histogram!("adapter_fetch_ms", "provider" => name.clone())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        match &result {
            Ok(items) => {
                counter!("adapter_candidates_total", "provider" => name.clone())
                    .increment(items.len() as u64);
                debug!(provider = %name, count = items.len(), "adapter ok");
            }
            Err(e) => {
                counter!("adapter_errors_total", "provider" => name.clone(), "kind" => e.kind())
                    .increment(1);
                warn!(provider = %name, error = %e, "adapter failed; contributing nothing");
            }
        }
        AdapterOutcome {
            source: name,
            result,
        }
    }
}
