//! Key-value cache owning all persisted state of the spider.
//!
//! The layout mirrors the served data: one `sp500` record holding the roster
//! fields `dateAdded` and `tickerSymbols`, plus one map per company-data
//! category (`info`, `timeSeries`) keyed by symbol. The whole store is
//! flushed once at process start, so the in-process map is authoritative;
//! an optional JSON snapshot file keeps restarts cheap during development.

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// The current index roster.
///
/// Replaced wholesale on every successful refresh, never partially mutated.
/// Symbols carry no duplicates and keep the source table's row order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolSet {
    pub symbols: Vec<String>,
    pub updated: DateTime<Utc>,
}

/// Company-data record category; one background sweep runs per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Info,
    TimeSeries,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Info => "info",
            Category::TimeSeries => "timeSeries",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// The two roster fields are held separately so a half-written cache (one
// field missing) reads as "not set up" rather than panicking or serving a
// partial roster.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CacheInner {
    date_added: Option<DateTime<Utc>>,
    ticker_symbols: Option<Vec<String>>,
    info: HashMap<String, serde_json::Value>,
    time_series: HashMap<String, serde_json::Value>,
}

impl CacheInner {
    fn records(&self, category: Category) -> &HashMap<String, serde_json::Value> {
        match category {
            Category::Info => &self.info,
            Category::TimeSeries => &self.time_series,
        }
    }

    fn records_mut(&mut self, category: Category) -> &mut HashMap<String, serde_json::Value> {
        match category {
            Category::Info => &mut self.info,
            Category::TimeSeries => &mut self.time_series,
        }
    }
}

/// Thread-safe cache store; cheap to clone, all clones share state.
#[derive(Clone, Debug)]
pub struct CacheStore {
    inner: Arc<RwLock<CacheInner>>,
    snapshot: Option<PathBuf>,
}

impl CacheStore {
    /// Open the store, loading `snapshot` when the file exists.
    pub async fn open(snapshot: Option<PathBuf>) -> Result<Self, Error> {
        let inner = match &snapshot {
            Some(path) if path.exists() => {
                trace!("reading cache snapshot from {}", path.display());
                let bytes = tokio::fs::read(path).await?;
                serde_json::from_slice(&bytes)?
            }
            _ => CacheInner::default(),
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
            snapshot,
        })
    }

    /// Purely in-memory store; no snapshot file.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::default())),
            snapshot: None,
        }
    }

    /// Clear every key. Used once at process startup; destroys any
    /// previously cached roster and company records.
    pub async fn flush(&self) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        *inner = CacheInner::default();
        self.persist(&inner).await?;
        debug!("cache flushed");
        Ok(())
    }

    /// Atomically replace the stored roster; visible to reads immediately.
    pub async fn write_symbol_set(&self, set: &SymbolSet) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.date_added = Some(set.updated);
        inner.ticker_symbols = Some(set.symbols.clone());
        self.persist(&inner).await?;
        trace!("roster written, {} symbols", set.symbols.len());
        Ok(())
    }

    /// Current roster, or [`Error::CacheEmpty`] when either field has never
    /// been written. An absent field means "not set up", never a
    /// legitimately empty roster.
    pub async fn read_symbol_set(&self) -> Result<SymbolSet, Error> {
        let inner = self.inner.read().await;
        let symbols = inner
            .ticker_symbols
            .clone()
            .ok_or(Error::CacheEmpty("tickerSymbols"))?;
        let updated = inner.date_added.ok_or(Error::CacheEmpty("dateAdded"))?;
        Ok(SymbolSet { symbols, updated })
    }

    /// Upsert the company record for `(category, symbol)`.
    pub async fn write_company_record(
        &self,
        category: Category,
        symbol: &str,
        payload: serde_json::Value,
    ) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.records_mut(category).insert(symbol.to_string(), payload);
        self.persist(&inner).await?;
        trace!("{category} record written for {symbol}");
        Ok(())
    }

    /// Record for one `(category, symbol)` pair, if present.
    pub async fn read_company_record(
        &self,
        category: Category,
        symbol: &str,
    ) -> Option<serde_json::Value> {
        let inner = self.inner.read().await;
        inner.records(category).get(symbol).cloned()
    }

    /// Full symbol-to-payload map for one category.
    pub async fn read_company_records(
        &self,
        category: Category,
    ) -> HashMap<String, serde_json::Value> {
        let inner = self.inner.read().await;
        inner.records(category).clone()
    }

    // Snapshot write happens under the caller's write guard so readers never
    // observe a state the file does not.
    async fn persist(&self, inner: &CacheInner) -> Result<(), Error> {
        if let Some(path) = &self.snapshot {
            let bytes = serde_json::to_vec_pretty(inner)?;
            tokio::fs::write(path, bytes).await?;
        }
        Ok(())
    }
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////
