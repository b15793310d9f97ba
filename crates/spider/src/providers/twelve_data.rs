use super::CompanySource;
use crate::cache::Category;
use crate::http::*;
use crate::Error;
use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{error, trace};

// RATE_LIMIT = 800 /day, 12 /min
//
// time_series = `https://api.twelvedata.com/time_series`, per symbol

const ENDPOINT: &str = "https://api.twelvedata.com/time_series";

/// 108s between ticks caps a sweep at 800 requests/day, the daily quota.
pub const TICK_INTERVAL: Duration = Duration::from_secs(108);

/// Daily closing series from the Twelve Data `time_series` endpoint.
pub struct TwelveData {
    http: HttpClient,
    endpoint: String,
    key: String,
}

impl TwelveData {
    pub fn from_env() -> Self {
        Self::with_endpoint(
            ENDPOINT,
            var("TWELVEDATA_API_KEY").expect("environment variable TWELVEDATA_API_KEY"),
        )
    }

    pub fn with_endpoint(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            key: key.into(),
        }
    }
}

impl CompanySource for TwelveData {
    fn name(&self) -> &'static str {
        "twelve_data"
    }

    fn category(&self) -> Category {
        Category::TimeSeries
    }

    fn tick_interval(&self) -> Duration {
        TICK_INTERVAL
    }

    fn fetch<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<serde_json::Value, Error>> {
        Box::pin(async move {
            trace!("fetching time series for {symbol}");
            let payload: serde_json::Value = self
                .http
                .get(&self.endpoint)
                .query(&[
                    ("symbol", symbol),
                    ("interval", "1day"),
                    ("outputsize", "90"),
                    ("apikey", self.key.as_str()),
                ])
                .send()
                .await
                .map_err(|err| provider_err(symbol, err))?
                .json()
                .await
                .map_err(|err| provider_err(symbol, err))?;

            // Twelve Data reports failures inside a 200 body:
            // `{"code": 404, "status": "error", "message": ...}`.
            if payload.get("status").and_then(|s| s.as_str()) == Some("error") {
                let message = payload
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string();
                error!("twelve_data error for {symbol}, error({message})");
                return Err(Error::Provider {
                    provider: "twelve_data",
                    symbol: symbol.to_string(),
                    reason: message,
                });
            }

            Ok(payload)
        })
    }
}

fn provider_err(symbol: &str, err: reqwest::Error) -> Error {
    error!("twelve_data fetch failed for {symbol}, error({err})");
    Error::Provider {
        provider: "twelve_data",
        symbol: symbol.to_string(),
        reason: err.to_string(),
    }
}
