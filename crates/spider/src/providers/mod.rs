//! Per-symbol company-data providers behind the auxiliary sweeps.
//!
//! Each provider is one external JSON API with a daily quota; the quota is
//! the design constraint on its sweep's tick interval.

use crate::cache::Category;
use crate::Error;
use futures::future::BoxFuture;
use std::time::Duration;

/// [Alpha Vantage API](https://www.alphavantage.co/documentation/#company-overview)
pub mod alpha_vantage;

/// [Twelve Data API](https://twelvedata.com/docs#time-series)
pub mod twelve_data;

pub use alpha_vantage::AlphaVantage;
pub use twelve_data::TwelveData;

/// One per-symbol fetch against an external financial API.
///
/// Payloads stay opaque JSON; the cache serves them back untouched.
pub trait CompanySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Record category this source feeds.
    fn category(&self) -> Category;

    /// Pause between sweep ticks, sized so a full roster walk stays inside
    /// the provider's daily quota.
    fn tick_interval(&self) -> Duration;

    fn fetch<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<serde_json::Value, Error>>;
}
