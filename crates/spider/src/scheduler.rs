//! Refresh scheduler: one weekly roster refresh (checked daily) plus one
//! throttled company-data sweep per category.
//!
//! The scheduler is an explicit object with a `start()`/`stop()` lifecycle;
//! every cadence step is also a plain method (`primary_refresh`,
//! `daily_check`, `begin_sweep`, `sweep_tick`) so tests drive ticks
//! deterministically instead of waiting on wall-clock timers.

use crate::cache::{CacheStore, Category, SymbolSet};
use crate::providers::CompanySource;
use crate::wiki::{self, RosterSource};
use crate::Error;
use chrono::{DateTime, Datelike, Utc, Weekday};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Cadence of the roster check; the refresh itself only fires on the
/// designated weekday, giving the weekly cadence checked once per day.
const DAILY_CHECK: Duration = Duration::from_secs(24 * 60 * 60);
const REFRESH_WEEKDAY: Weekday = Weekday::Sun;

/// Result of advancing a sweep by one tick.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The symbol's record was fetched and written.
    Stored(String),
    /// The symbol failed and was dropped from the sweep; no retry.
    Skipped(String),
    /// The queue is empty; the sweep timer can be cleared.
    Drained,
}

// One sweep per category: the source, its queue of symbols still pending,
// and whether a sweep is mid-flight. `active` outlives the last pop so the
// overlap guard holds until the drain is observed.
struct Lane {
    source: Arc<dyn CompanySource>,
    state: Mutex<SweepState>,
}

#[derive(Default)]
struct SweepState {
    queue: VecDeque<String>,
    active: bool,
}

/// Owns the refresh timelines and the per-category sweep queues.
pub struct Scheduler {
    store: CacheStore,
    roster: Arc<dyn RosterSource>,
    lanes: Vec<Lane>,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        store: CacheStore,
        roster: Arc<dyn RosterSource>,
        sources: Vec<Arc<dyn CompanySource>>,
    ) -> Self {
        let lanes = sources
            .into_iter()
            .map(|source| Lane {
                source,
                state: Mutex::default(),
            })
            .collect();

        Self {
            store,
            roster,
            lanes,
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Tick pacing of `category`'s sweep, when a source is configured.
    pub fn tick_interval(&self, category: Category) -> Option<Duration> {
        self.lane(category).map(|lane| lane.source.tick_interval())
    }

    /// Symbols still queued for `category`'s sweep.
    pub async fn pending(&self, category: Category) -> usize {
        match self.lane(category) {
            Some(lane) => lane.state.lock().await.queue.len(),
            None => 0,
        }
    }

    /// Flush the cache, run the first refresh, start the sweeps and the
    /// daily cadence loop. Call on a clone: `sched.clone().start()`.
    ///
    /// A failed first refresh is logged and leaves the cache genuinely
    /// empty (the flush has already happened); readers see
    /// [`Error::CacheEmpty`] until a later cycle succeeds.
    pub async fn start(self: Arc<Self>) -> Result<(), Error> {
        self.store.flush().await?;

        match self.primary_refresh().await {
            Ok(count) => info!("startup refresh complete, {count} symbols"),
            Err(err) => error!("startup refresh failed, cache left empty, error({err})"),
        }

        for lane in &self.lanes {
            let category = lane.source.category();
            match self.begin_sweep(category).await {
                Ok(true) => self.clone().spawn_sweep(category),
                Ok(false) => {}
                Err(err) => error!("failed to start {category} sweep, error({err})"),
            }
        }

        let sched = Arc::clone(&self);
        let handle = tokio::spawn(async move { sched.daily_loop().await });
        self.handles
            .lock()
            .expect("scheduler handle list should not be poisoned")
            .push(handle);

        Ok(())
    }

    /// Abort the daily loop and any in-flight sweep timers.
    pub fn stop(&self) {
        for handle in self
            .handles
            .lock()
            .expect("scheduler handle list should not be poisoned")
            .drain(..)
        {
            handle.abort();
        }
        info!("scheduler stopped");
    }

    /// Run fetch→extract→normalize→store once.
    ///
    /// Only a fully successful cycle overwrites the cache; any failure
    /// leaves the prior roster in place.
    pub async fn primary_refresh(&self) -> Result<usize, Error> {
        let time = std::time::Instant::now();
        info!("refreshing roster ...");

        let raw = self.roster.fetch_symbols().await?;
        let symbols = wiki::dedup_symbols(raw);
        let count = symbols.len();

        let set = SymbolSet {
            symbols,
            updated: Utc::now(),
        };
        self.store.write_symbol_set(&set).await?;

        info!("roster refreshed, {count} symbols, time elapsed: {:?}", time.elapsed());
        Ok(count)
    }

    /// Weekly cadence, checked once per day: refresh only when `today`
    /// falls on the designated weekday. Returns whether a refresh ran.
    pub async fn daily_check(&self, today: DateTime<Utc>) -> Result<bool, Error> {
        if today.weekday() != REFRESH_WEEKDAY {
            trace!("{} is not refresh day, roster left as is", today.weekday());
            return Ok(false);
        }
        self.primary_refresh().await?;
        Ok(true)
    }

    /// Snapshot the current roster into `category`'s sweep queue.
    ///
    /// Refused (`Ok(false)`) while a previous sweep for the same category
    /// still has symbols pending — two interleaved sweeps of one category
    /// would race on the same `(category, symbol)` keys.
    pub async fn begin_sweep(&self, category: Category) -> Result<bool, Error> {
        let Some(lane) = self.lane(category) else {
            warn!("no source configured for {category}, sweep not started");
            return Ok(false);
        };

        let mut state = lane.state.lock().await;
        if state.active {
            warn!("{category} sweep already in progress, refusing to restart");
            return Ok(false);
        }

        let set = self.store.read_symbol_set().await?;
        state.queue = set.symbols.into();
        state.active = true;
        info!("{category} sweep started, {} symbols queued", state.queue.len());
        Ok(true)
    }

    /// Advance `category`'s sweep by one symbol.
    ///
    /// A failed fetch or store write is logged and the symbol stays
    /// dequeued; it is not retried within the sweep.
    pub async fn sweep_tick(&self, category: Category) -> TickOutcome {
        let Some(lane) = self.lane(category) else {
            return TickOutcome::Drained;
        };

        let symbol = {
            let mut state = lane.state.lock().await;
            match state.queue.pop_front() {
                Some(symbol) => symbol,
                None => {
                    if state.active {
                        state.active = false;
                        debug!("{category} sweep drained");
                    }
                    return TickOutcome::Drained;
                }
            }
        };

        match lane.source.fetch(&symbol).await {
            Ok(payload) => match self.store.write_company_record(category, &symbol, payload).await {
                Ok(()) => {
                    trace!("{category} record stored for {symbol}");
                    TickOutcome::Stored(symbol)
                }
                Err(err) => {
                    error!("failed to store {category} record for {symbol}, error({err})");
                    TickOutcome::Skipped(symbol)
                }
            },
            Err(err) => {
                error!("skipping {symbol} in {category} sweep, error({err})");
                TickOutcome::Skipped(symbol)
            }
        }
    }

    async fn daily_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(DAILY_CHECK);
        // the immediate first tick is consumed; startup already refreshed
        interval.tick().await;

        loop {
            interval.tick().await;
            let today = Utc::now();

            if let Err(err) = self.daily_check(today).await {
                error!("weekly refresh failed, cache left at prior state, error({err})");
            }

            for lane in &self.lanes {
                let category = lane.source.category();
                let due = match category {
                    Category::TimeSeries => true,
                    Category::Info => today.day() == 1,
                };
                if !due {
                    continue;
                }
                match self.begin_sweep(category).await {
                    Ok(true) => self.clone().spawn_sweep(category),
                    Ok(false) => {}
                    Err(err) => error!("failed to start {category} sweep, error({err})"),
                }
            }
        }
    }

    // Timer loop for one sweep; clears itself once the queue drains.
    fn spawn_sweep(self: Arc<Self>, category: Category) {
        let Some(lane) = self.lane(category) else {
            return;
        };
        let tick = lane.source.tick_interval();

        let sched = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                if matches!(sched.sweep_tick(category).await, TickOutcome::Drained) {
                    break;
                }
            }
        });
        self.handles
            .lock()
            .expect("scheduler handle list should not be poisoned")
            .push(handle);
    }

    fn lane(&self, category: Category) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.source.category() == category)
    }
}
