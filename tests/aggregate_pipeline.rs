// tests/aggregate_pipeline.rs
//
// Aggregator behaviour with in-memory adapters: settle-all tolerance, cross
// adapter dedup, escalation to body fetching and the unconfirmed fallback.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use hnl_injury_bot::aggregate::{AggregatePolicy, ResultKind};
use hnl_injury_bot::clock::ManualClock;
use hnl_injury_bot::ingest::types::{Candidate, CandidateSource};
use hnl_injury_bot::registry::{Club, Registry};

mod common;
use common::{BodyStub, FailingSource, StaticSource};

fn club(alias: &str) -> Club {
    let registry = Registry::from_table(&common::table()).unwrap();
    (*registry.resolve(alias).unwrap()).clone()
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(common::t0()))
}

#[tokio::test]
async fn one_failing_adapter_out_of_three_still_yields_results() {
    let at = common::t0();
    let a = StaticSource::new(
        "a",
        vec![Candidate::new("Hajduk: ozljeda Livaje", "https://a/1", "Index.hr")
            .published(at - ChronoDuration::hours(2))],
    );
    let c = StaticSource::new(
        "c",
        vec![
            Candidate::new("Hajduk bez kapetana, upitan za derbi", "https://c/1", "Blog")
                .published(at - ChronoDuration::hours(1)),
            Candidate::new("Rijeka: ozljeda stopera", "https://c/2", "Blog"),
        ],
    );
    let sources: Vec<Arc<dyn CandidateSource>> = vec![a.clone(), Arc::new(FailingSource), c.clone()];
    let agg = common::aggregator(&common::table(), sources, None, common::policy(), clock());

    let out = agg.fetch_for_club(&club("hajduk")).await;

    assert_eq!(out.kind, ResultKind::Confirmed);
    let links: Vec<&str> = out.items.iter().map(|c| c.link.as_str()).collect();
    // Index.hr is a priority source, so it leads despite being older.
    assert_eq!(links, vec!["https://a/1", "https://c/1"]);
    assert_eq!((a.calls(), c.calls()), (1, 1));
}

#[tokio::test]
async fn all_adapters_failing_is_an_empty_result() {
    let sources: Vec<Arc<dyn CandidateSource>> = vec![Arc::new(FailingSource), Arc::new(FailingSource)];
    let agg = common::aggregator(&common::table(), sources, None, common::policy(), clock());
    let out = agg.fetch_for_club(&club("istra")).await;
    assert!(out.is_empty());
    assert_eq!(out.generated_at, common::t0());
}

#[tokio::test]
async fn same_link_from_two_adapters_survives_once_first_seen() {
    let first = StaticSource::new(
        "first",
        vec![Candidate::new("Istra: OZLJEDA kapetana", "https://x/1", "Index.hr")],
    );
    let second = StaticSource::new(
        "second",
        vec![Candidate::new("istra: ozljeda kapetana", "https://x/1", "24sata")],
    );
    let sources: Vec<Arc<dyn CandidateSource>> = vec![first, second];
    let agg = common::aggregator(&common::table(), sources, None, common::policy(), clock());

    let out = agg.fetch_for_club(&club("istra")).await;
    assert_eq!(out.items.len(), 1);
    assert_eq!(out.items[0].title, "Istra: OZLJEDA kapetana");
    assert_eq!(out.items[0].source_label, "Index.hr");
}

#[tokio::test]
async fn results_are_capped_at_max_results() {
    let items: Vec<Candidate> = (0..12)
        .map(|i| Candidate::new(format!("Osijek: ozljeda #{i}"), format!("https://o/{i}"), "Blog"))
        .collect();
    let sources: Vec<Arc<dyn CandidateSource>> = vec![StaticSource::new("many", items)];
    let agg = common::aggregator(&common::table(), sources, None, common::policy(), clock());

    let out = agg.fetch_for_club(&club("osijek")).await;
    assert_eq!(out.items.len(), 7);
    assert_eq!(out.items[0].link, "https://o/0");
}

#[tokio::test]
async fn escalation_reads_bodies_and_confirms_from_them() {
    let listing = StaticSource::new(
        "listing",
        vec![
            Candidate::new("Istra slavi pobjedu protiv Gorice", "https://x/win", "24sata"),
            Candidate::new("Gorica mijenja trenera", "https://x/coach", "Blog"),
        ],
    );
    let deep = BodyStub::new([(
        "https://x/win",
        "Pobjedu je zasjenila ozljeda stopera Istre 1961, no Istra ostaje druga.",
    )]);
    let sources: Vec<Arc<dyn CandidateSource>> = vec![listing];
    let agg = common::aggregator(
        &common::table(),
        sources,
        Some(deep.clone()),
        common::policy(),
        clock(),
    );

    let out = agg.fetch_for_club(&club("istra")).await;
    assert_eq!(out.kind, ResultKind::Confirmed);
    assert_eq!(out.items.len(), 1);
    assert_eq!(out.items[0].link, "https://x/win");
    assert!(out.items[0].body_excerpt.is_some());
    // 24sata is a priority source, so its item is opened first.
    assert_eq!(deep.opened(), vec!["https://x/win", "https://x/coach"]);
}

#[tokio::test]
async fn escalation_is_bounded_by_prefix() {
    let items: Vec<Candidate> = (0..9)
        .map(|i| Candidate::new(format!("Dinamo vijest {i}"), format!("https://d/{i}"), "Blog"))
        .collect();
    let deep = BodyStub::new(Vec::<(String, String)>::new());
    let sources: Vec<Arc<dyn CandidateSource>> = vec![StaticSource::new("listing", items)];
    let agg = common::aggregator(
        &common::table(),
        sources,
        Some(deep.clone()),
        common::policy(),
        clock(),
    );

    let out = agg.fetch_for_club(&club("dinamo")).await;
    assert_eq!(deep.opened().len(), 5);
    // nothing confirmed: newest (here: input order) unfiltered items
    assert_eq!(out.kind, ResultKind::Latest);
    assert_eq!(out.items.len(), 7);
}

#[tokio::test]
async fn escalation_stops_once_enough_items_are_found() {
    let items: Vec<Candidate> = (0..5)
        .map(|i| Candidate::new(format!("Rijeka vijest {i}"), format!("https://r/{i}"), "Blog"))
        .collect();
    let deep = BodyStub::new((0..5).map(|i| {
        (
            format!("https://r/{i}"),
            "Rijeka ostaje bez napadača, ozljeda mišića.".to_string(),
        )
    }));
    let mut policy = common::policy();
    policy.escalation_prefix = 5;
    let table = {
        let mut t = common::table();
        t.ranking.max_results = 2;
        t
    };
    let sources: Vec<Arc<dyn CandidateSource>> = vec![StaticSource::new("listing", items)];
    let agg = common::aggregator(&table, sources, Some(deep.clone()), policy, clock());

    let out = agg.fetch_for_club(&club("rijeka")).await;
    assert_eq!(out.items.len(), 2);
    assert_eq!(deep.opened(), vec!["https://r/0", "https://r/1"]);
}

#[tokio::test(start_paused = true)]
async fn escalation_waits_between_deep_fetches() {
    let items: Vec<Candidate> = (0..3)
        .map(|i| Candidate::new(format!("Gorica vijest {i}"), format!("https://g/{i}"), "Blog"))
        .collect();
    let deep = BodyStub::new(Vec::<(String, String)>::new());
    let policy = AggregatePolicy {
        fetch_timeout: Duration::from_secs(2),
        escalation_prefix: 5,
        escalation_delay: Duration::from_millis(1500),
    };
    let sources: Vec<Arc<dyn CandidateSource>> = vec![StaticSource::new("listing", items)];
    let agg = common::aggregator(&common::table(), sources, Some(deep.clone()), policy, clock());

    let started = tokio::time::Instant::now();
    let out = agg.fetch_for_club(&club("gorica")).await;
    // three pages, two pauses
    assert_eq!(deep.opened().len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(3000));
    assert_eq!(out.kind, ResultKind::Latest);
}

#[tokio::test]
async fn fallback_without_deep_adapter_marks_results_latest() {
    let at = Utc::now();
    let items = vec![
        Candidate::new("Vukovar gostuje u Puli", "https://v/1", "Blog").published(at),
        Candidate::new("Vukovar trenira", "https://v/2", "Index.hr"),
    ];
    let sources: Vec<Arc<dyn CandidateSource>> = vec![StaticSource::new("listing", items)];
    let agg = common::aggregator(&common::table(), sources, None, common::policy(), clock());

    let out = agg.fetch_for_club(&club("vukovar")).await;
    assert_eq!(out.kind, ResultKind::Latest);
    let links: Vec<&str> = out.items.iter().map(|c| c.link.as_str()).collect();
    assert_eq!(links, vec!["https://v/1", "https://v/2"]);
}

#[tokio::test]
async fn latest_fallback_keeps_dated_items_over_undated_priority_ones() {
    let at = Utc::now();
    let mut items: Vec<Candidate> = (0..7)
        .map(|i| Candidate::new("Vukovar na treningu", format!("https://index/{i}"), "Index.hr"))
        .collect();
    items.push(
        Candidate::new("Vukovar gostuje u Puli", "https://blog/new", "Blog")
            .published(at - ChronoDuration::minutes(5)),
    );
    let sources: Vec<Arc<dyn CandidateSource>> = vec![StaticSource::new("listing", items)];
    let agg = common::aggregator(&common::table(), sources, None, common::policy(), clock());

    let out = agg.fetch_for_club(&club("vukovar")).await;
    assert_eq!(out.kind, ResultKind::Latest);
    assert_eq!(out.items.len(), 7);
    assert_eq!(out.items[0].link, "https://blog/new");
    assert_eq!(out.items[6].link, "https://index/5");
}
