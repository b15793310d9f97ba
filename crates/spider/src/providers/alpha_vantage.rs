use super::CompanySource;
use crate::cache::Category;
use crate::http::*;
use crate::Error;
use futures::future::BoxFuture;
use std::time::Duration;
use tracing::{error, trace};

// RATE_LIMIT = 500 /day, 5 /min
//
// overview = `https://www.alphavantage.co/query?function=OVERVIEW`, per symbol

const ENDPOINT: &str = "https://www.alphavantage.co/query";

/// 180s between ticks keeps a full ~505-symbol sweep at 480 requests/day,
/// under the 500/day quota and well under 5/min.
pub const TICK_INTERVAL: Duration = Duration::from_secs(180);

/// Company fundamentals from the Alpha Vantage `OVERVIEW` endpoint.
pub struct AlphaVantage {
    http: HttpClient,
    endpoint: String,
    key: String,
}

impl AlphaVantage {
    pub fn from_env() -> Self {
        Self::with_endpoint(
            ENDPOINT,
            var("ALPHAVANTAGE_API_KEY").expect("environment variable ALPHAVANTAGE_API_KEY"),
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

impl CompanySource for AlphaVantage {
    fn name(&self) -> &'static str {
        "alpha_vantage"
    }

    fn category(&self) -> Category {
        Category::Info
    }

    fn tick_interval(&self) -> Duration {
        TICK_INTERVAL
    }

    fn fetch<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<serde_json::Value, Error>> {
        Box::pin(async move {
            trace!("fetching fundamentals for {symbol}");
            let payload: serde_json::Value = self
                .http
                .get(&self.endpoint)
                .query(&[
                    ("function", "OVERVIEW"),
                    ("symbol", symbol),
                    ("apikey", self.key.as_str()),
                ])
                .send()
                .await
                .map_err(|err| provider_err(symbol, err))?
                .json()
                .await
                .map_err(|err| provider_err(symbol, err))?;

            // Alpha Vantage answers unknown symbols and exhausted quotas with
            // 200 and an empty object or a bare "Note" field.
            let empty = payload.as_object().map_or(true, |obj| obj.is_empty());
            if empty || payload.get("Note").is_some() {
                error!("alpha_vantage returned no data for {symbol}");
                return Err(Error::Provider {
                    provider: "alpha_vantage",
                    symbol: symbol.to_string(),
                    reason: "empty payload".to_string(),
                });
            }

            Ok(payload)
        })
    }
}

fn provider_err(symbol: &str, err: reqwest::Error) -> Error {
    error!("alpha_vantage fetch failed for {symbol}, error({err})");
    Error::Provider {
        provider: "alpha_vantage",
        symbol: symbol.to_string(),
        reason: err.to_string(),
    }
}
