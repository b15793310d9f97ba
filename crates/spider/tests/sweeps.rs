use futures::future::BoxFuture;
use sp500_spider::cache::{CacheStore, Category};
use sp500_spider::providers::CompanySource;
use sp500_spider::scheduler::{Scheduler, TickOutcome};
use sp500_spider::wiki::RosterSource;
use sp500_spider::Error;
use std::sync::Arc;
use std::time::Duration;

struct StaticRoster(Vec<&'static str>);

impl RosterSource for StaticRoster {
    fn fetch_symbols(&self) -> BoxFuture<'_, Result<Vec<String>, Error>> {
        let symbols = self.0.iter().map(|s| s.to_string()).collect();
        Box::pin(async move { Ok(symbols) })
    }
}

// Scripted provider: fetches succeed except for the listed symbols.
struct ScriptedSource {
    category: Category,
    failing: Vec<&'static str>,
}

impl CompanySource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn category(&self) -> Category {
        self.category
    }

    fn tick_interval(&self) -> Duration {
        Duration::from_millis(1)
    }

    fn fetch<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<serde_json::Value, Error>> {
        Box::pin(async move {
            if self.failing.contains(&symbol) {
                return Err(Error::Provider {
                    provider: "scripted",
                    symbol: symbol.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(serde_json::json!({ "symbol": symbol }))
        })
    }
}

fn scheduler(
    store: &CacheStore,
    roster: &[&'static str],
    failing: Vec<&'static str>,
) -> Scheduler {
    Scheduler::new(
        store.clone(),
        Arc::new(StaticRoster(roster.to_vec())),
        vec![Arc::new(ScriptedSource {
            category: Category::Info,
            failing,
        })],
    )
}

#[tokio::test]
async fn failed_symbol_is_skipped_and_sweep_drains() {
    let store = CacheStore::in_memory();
    let sched = scheduler(&store, &["A", "B"], vec!["A"]);
    sched.primary_refresh().await.unwrap();

    assert!(sched.begin_sweep(Category::Info).await.unwrap());

    assert_eq!(
        sched.sweep_tick(Category::Info).await,
        TickOutcome::Skipped("A".to_string())
    );
    assert_eq!(
        sched.sweep_tick(Category::Info).await,
        TickOutcome::Stored("B".to_string())
    );
    assert_eq!(sched.sweep_tick(Category::Info).await, TickOutcome::Drained);

    // only the good symbol has a record, and nothing is left queued
    assert!(store.read_company_record(Category::Info, "A").await.is_none());
    assert!(store.read_company_record(Category::Info, "B").await.is_some());
    assert_eq!(sched.pending(Category::Info).await, 0);
}

#[tokio::test]
async fn overlapping_sweep_for_same_category_is_refused() {
    let store = CacheStore::in_memory();
    let sched = scheduler(&store, &["A", "B"], vec![]);
    sched.primary_refresh().await.unwrap();

    assert!(sched.begin_sweep(Category::Info).await.unwrap());
    // still two symbols pending
    assert!(!sched.begin_sweep(Category::Info).await.unwrap());

    // partway through: the guard still holds
    sched.sweep_tick(Category::Info).await;
    assert!(!sched.begin_sweep(Category::Info).await.unwrap());

    // drain, then a new sweep may start
    sched.sweep_tick(Category::Info).await;
    assert_eq!(sched.sweep_tick(Category::Info).await, TickOutcome::Drained);
    assert!(sched.begin_sweep(Category::Info).await.unwrap());
}

#[tokio::test]
async fn sweep_cannot_start_before_the_roster_exists() {
    let store = CacheStore::in_memory();
    let sched = scheduler(&store, &["A"], vec![]);

    assert!(matches!(
        sched.begin_sweep(Category::Info).await,
        Err(Error::CacheEmpty(_))
    ));
}

#[tokio::test]
async fn category_without_a_source_never_sweeps() {
    let store = CacheStore::in_memory();
    let sched = scheduler(&store, &["A"], vec![]);
    sched.primary_refresh().await.unwrap();

    assert!(!sched.begin_sweep(Category::TimeSeries).await.unwrap());
    assert_eq!(
        sched.sweep_tick(Category::TimeSeries).await,
        TickOutcome::Drained
    );
}

#[tokio::test]
async fn start_runs_flush_refresh_and_sweeps_to_completion() {
    let store = CacheStore::in_memory();
    let sched = Arc::new(scheduler(&store, &["A", "B"], vec![]));

    sched.clone().start().await.unwrap();

    // millisecond tick interval: the spawned sweep finishes quickly
    for _ in 0..50 {
        if sched.pending(Category::Info).await == 0
            && store.read_company_record(Category::Info, "B").await.is_some()
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(store.read_symbol_set().await.unwrap().symbols, vec!["A", "B"]);
    assert!(store.read_company_record(Category::Info, "A").await.is_some());
    assert!(store.read_company_record(Category::Info, "B").await.is_some());

    sched.stop();
}
