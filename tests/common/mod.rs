// tests/common/mod.rs
//
// Shared builders for integration tests: in-memory adapters and a service
// wired the same way production wires it, minus the network.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use hnl_injury_bot::aggregate::{AggregatePolicy, Aggregator};
use hnl_injury_bot::cache::{ResultCache, DEFAULT_TTL};
use hnl_injury_bot::clock::ManualClock;
use hnl_injury_bot::config::BotTable;
use hnl_injury_bot::ingest::types::{Candidate, CandidateSource, SourceError, Target};
use hnl_injury_bot::rank::Ranker;
use hnl_injury_bot::registry::Registry;
use hnl_injury_bot::relevance::RelevanceFilter;
use hnl_injury_bot::service::InjuryService;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 14, 12, 0, 0).unwrap()
}

pub fn table() -> BotTable {
    BotTable::embedded().expect("embedded table")
}

/// Returns the same candidates on every call and counts calls.
pub struct StaticSource {
    name: String,
    items: Vec<Candidate>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: &str, items: Vec<Candidate>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            items,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    async fn fetch(&self, target: &Target) -> Result<Vec<Candidate>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match target {
            Target::Club(_) => Ok(self.items.clone()),
            Target::Article(_) => Err(SourceError::Unsupported),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Always fails like an upstream outage.
pub struct FailingSource;

#[async_trait]
impl CandidateSource for FailingSource {
    async fn fetch(&self, _target: &Target) -> Result<Vec<Candidate>, SourceError> {
        Err(SourceError::Status {
            status: 503,
            url: "https://unavailable.example/".into(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Deep adapter stand-in: attaches a canned body to known links and records
/// which links it was asked to open.
pub struct BodyStub {
    bodies: HashMap<String, String>,
    opened: parking_lot::Mutex<Vec<String>>,
}

impl BodyStub {
    pub fn new<I, K, V>(bodies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Arc::new(Self {
            bodies: bodies
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            opened: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl CandidateSource for BodyStub {
    async fn fetch(&self, target: &Target) -> Result<Vec<Candidate>, SourceError> {
        let Target::Article(c) = target else {
            return Err(SourceError::Unsupported);
        };
        self.opened.lock().push(c.link.clone());
        Ok(match self.bodies.get(&c.link) {
            Some(body) => vec![c.clone().with_body(body.clone())],
            None => vec![c.clone()],
        })
    }

    fn name(&self) -> &str {
        "body-stub"
    }
}

pub fn policy() -> AggregatePolicy {
    AggregatePolicy {
        fetch_timeout: Duration::from_secs(2),
        escalation_prefix: 5,
        escalation_delay: Duration::ZERO,
    }
}

pub fn aggregator(
    table: &BotTable,
    sources: Vec<Arc<dyn CandidateSource>>,
    deep: Option<Arc<dyn CandidateSource>>,
    policy: AggregatePolicy,
    clock: Arc<ManualClock>,
) -> Aggregator {
    let agg = Aggregator::new(
        sources,
        RelevanceFilter::from_table(table),
        Ranker::from_table(table),
        policy,
        clock,
    );
    match deep {
        Some(d) => agg.with_deep(d),
        None => agg,
    }
}

/// Service over the embedded table, in-memory adapters and a manual clock.
pub fn service(sources: Vec<Arc<dyn CandidateSource>>, clock: Arc<ManualClock>) -> InjuryService {
    let table = table();
    let registry = Arc::new(Registry::from_table(&table).expect("registry"));
    let cache = ResultCache::new(DEFAULT_TTL, clock.clone());
    let agg = aggregator(&table, sources, None, policy(), clock);
    InjuryService::new(registry, cache, agg)
}
