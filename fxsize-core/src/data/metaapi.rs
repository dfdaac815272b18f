//! MetaAPI historical candles provider.
//!
//! Fetches candles from the MetaAPI market-data REST service for a
//! MetaTrader account. Handles rate limiting, retries with exponential
//! backoff, response parsing, and the circuit breaker.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{BarProvider, DataError};
use crate::domain::{Bar, BarSeries, Timeframe};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://mt-market-data-client-api-v1.new-york.agiliumtrade.ai";

/// The service caps one request at this many candles.
pub const MAX_CANDLES_PER_REQUEST: usize = 1000;

/// Account credentials for the MetaAPI service.
#[derive(Clone)]
pub struct MetaApiCredentials {
    pub access_token: String,
    pub account_id: String,
}

impl fmt::Debug for MetaApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaApiCredentials")
            .field("access_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// One candle as returned by the service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candle {
    time: DateTime<Utc>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    #[serde(default)]
    tick_volume: Option<f64>,
}

pub struct MetaApiProvider {
    client: reqwest::blocking::Client,
    credentials: MetaApiCredentials,
    base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl MetaApiProvider {
    pub fn new(
        credentials: MetaApiCredentials,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn candles_url(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> String {
        format!(
            "{}/users/current/accounts/{}/historical-market-data/symbols/{symbol}/timeframes/{}/candles?limit={limit}",
            self.base_url,
            self.credentials.account_id,
            timeframe.label(),
        )
    }

    /// Convert service candles into bars, oldest first.
    fn parse_candles(symbol: &str, candles: Vec<Candle>) -> Result<Vec<Bar>, DataError> {
        let mut bars: Vec<Bar> = candles
            .into_iter()
            .filter(|c| {
                c.open.is_some() || c.high.is_some() || c.low.is_some() || c.close.is_some()
            })
            .map(|c| Bar {
                timestamp: c.time,
                open: c.open.unwrap_or(f64::NAN),
                high: c.high.unwrap_or(f64::NAN),
                low: c.low.unwrap_or(f64::NAN),
                close: c.close.unwrap_or(f64::NAN),
                volume: c.tick_volume.unwrap_or(0.0),
            })
            .collect();

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn fetch_with_retry(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let url = self.candles_url(symbol, timeframe, limit);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying candle fetch");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped {
                    remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
                });
            }

            let resp = match self
                .client
                .get(&url)
                .header("auth-token", &self.credentials.access_token)
                .send()
            {
                Ok(resp) => resp,
                Err(e) => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
            };

            let status = resp.status();

            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
            {
                self.circuit_breaker.trip();
                return Err(DataError::AuthenticationRequired(format!(
                    "MetaAPI refused access to account {} (HTTP {status})",
                    self.credentials.account_id
                )));
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!(symbol, retry_after, "MetaAPI rate limit hit");
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let candles: Vec<Candle> = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse candles for {symbol}: {e}"
                ))
            })?;

            self.circuit_breaker.record_success();
            return Self::parse_candles(symbol, candles);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("all retries exhausted".into())))
    }
}

impl BarProvider for MetaApiProvider {
    fn name(&self) -> &str {
        "MetaAPI"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<BarSeries, DataError> {
        let limit = count.clamp(1, MAX_CANDLES_PER_REQUEST);
        let as_of = Utc::now();
        let bars = self.fetch_with_retry(symbol, timeframe, limit)?;
        info!(symbol, %timeframe, bars = bars.len(), "fetched candles from MetaAPI");
        Ok(BarSeries::new(symbol, timeframe, bars).with_as_of(as_of))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MetaApiProvider {
        MetaApiProvider::new(
            MetaApiCredentials {
                access_token: "secret".into(),
                account_id: "acc-123".into(),
            },
            Arc::new(CircuitBreaker::default_provider()),
        )
        .unwrap()
    }

    #[test]
    fn candles_url_shape() {
        let p = provider().with_base_url("https://example.test/");
        assert_eq!(
            p.candles_url("EURUSD", Timeframe::H1, 15),
            "https://example.test/users/current/accounts/acc-123/historical-market-data/symbols/EURUSD/timeframes/1h/candles?limit=15"
        );
    }

    #[test]
    fn parse_candles_sorts_and_skips_empty() {
        let json = r#"[
            {"symbol":"EURUSD","timeframe":"1h","time":"2024-01-02T11:00:00.000Z","open":1.1010,"high":1.1030,"low":1.1000,"close":1.1020,"tickVolume":812},
            {"symbol":"EURUSD","timeframe":"1h","time":"2024-01-02T10:00:00.000Z","open":1.1000,"high":1.1015,"low":1.0990,"close":1.1010,"tickVolume":640},
            {"symbol":"EURUSD","timeframe":"1h","time":"2024-01-02T12:00:00.000Z"}
        ]"#;
        let candles: Vec<Candle> = serde_json::from_str(json).unwrap();
        let bars = MetaApiProvider::parse_candles("EURUSD", candles).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert_eq!(bars[0].close, 1.1010);
        assert_eq!(bars[1].volume, 812.0);
    }

    #[test]
    fn parse_empty_is_symbol_not_found() {
        let err = MetaApiProvider::parse_candles("NOPE", vec![]).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn open_breaker_refuses_without_network() {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        breaker.trip();
        let p = MetaApiProvider::new(
            MetaApiCredentials {
                access_token: "secret".into(),
                account_id: "acc-123".into(),
            },
            breaker,
        )
        .unwrap()
        .with_retries(0, Duration::ZERO);
        let err = p.fetch_bars("EURUSD", Timeframe::H1, 15).unwrap_err();
        assert!(matches!(err, DataError::CircuitBreakerTripped { .. }));
    }

    #[test]
    fn credentials_debug_redacts_token() {
        let creds = MetaApiCredentials {
            access_token: "very-secret".into(),
            account_id: "acc".into(),
        };
        assert!(!format!("{creds:?}").contains("very-secret"));
    }
}
