//! Market data provider boundary
//!
//! The provider trait keeps the fetch/cache/retry pipeline testable;
//! the HTTP implementation talks to the external market data API.

use crate::error::{AgentError, Result};
use crate::models::{HistorySeries, Quote, Symbol, TimeSeriesPoint};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const QUOTE_PATH: &str = "/v1/quote";
const HISTORY_PATH: &str = "/v1/history";

/// Raw outcome of a single provider call, before any retry handling.
#[derive(Debug)]
pub enum ProviderResponse<T> {
    Ok(T),
    /// The provider does not know this symbol. Never retried.
    NotFound,
    /// The provider asked us to slow down. Retried with longer backoff.
    RateLimited,
    /// Timeout, transport failure, 5xx, or unparseable payload.
    Transient(String),
}

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_quote(&self, symbol: &Symbol) -> ProviderResponse<Quote>;

    async fn fetch_history(&self, symbol: &Symbol, days: u32) -> ProviderResponse<HistorySeries>;
}

/// HTTP JSON provider with a long-lived connection-pooled client.
#[derive(Debug, Clone)]
pub struct HttpMarketDataProvider {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMarketDataProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self> {
        let timeout_secs = env::var("MARKET_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url = env::var("MARKET_API_BASE_URL").map_err(|_| {
            AgentError::ConfigError("MARKET_API_BASE_URL is not configured".to_string())
        })?;
        let api_key = env::var("MARKET_API_KEY").ok().filter(|k| !k.is_empty());

        Self::new(base_url, api_key)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ProviderResponse<T> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.http.get(&url).query(query);
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(path, error = %e, "Market API request failed");
                return ProviderResponse::Transient(format!("request failed: {}", e));
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => return ProviderResponse::NotFound,
            StatusCode::TOO_MANY_REQUESTS => return ProviderResponse::RateLimited,
            status if status.is_server_error() => {
                return ProviderResponse::Transient(format!("provider returned {}", status));
            }
            status if !status.is_success() => {
                return ProviderResponse::Transient(format!("unexpected status {}", status));
            }
            _ => {}
        }

        match response.json::<T>().await {
            Ok(parsed) => ProviderResponse::Ok(parsed),
            Err(e) => {
                error!(path, error = %e, "Market API payload parse failed");
                ProviderResponse::Transient(format!("invalid payload: {}", e))
            }
        }
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpMarketDataProvider {
    fn provider_name(&self) -> &'static str {
        "http-market-api"
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> ProviderResponse<Quote> {
        debug!(symbol = %symbol, "Fetching quote");

        let response: ProviderResponse<QuoteDto> = self
            .get_json(QUOTE_PATH, &[("symbol", symbol.as_str().to_string())])
            .await;

        match response {
            ProviderResponse::Ok(dto) => ProviderResponse::Ok(dto.into_quote(symbol)),
            ProviderResponse::NotFound => ProviderResponse::NotFound,
            ProviderResponse::RateLimited => ProviderResponse::RateLimited,
            ProviderResponse::Transient(reason) => ProviderResponse::Transient(reason),
        }
    }

    async fn fetch_history(&self, symbol: &Symbol, days: u32) -> ProviderResponse<HistorySeries> {
        debug!(symbol = %symbol, days, "Fetching history");

        let response: ProviderResponse<HistoryDto> = self
            .get_json(
                HISTORY_PATH,
                &[
                    ("symbol", symbol.as_str().to_string()),
                    ("days", days.to_string()),
                ],
            )
            .await;

        match response {
            ProviderResponse::Ok(dto) => ProviderResponse::Ok(dto.into_series(symbol)),
            ProviderResponse::NotFound => ProviderResponse::NotFound,
            ProviderResponse::RateLimited => ProviderResponse::RateLimited,
            ProviderResponse::Transient(reason) => ProviderResponse::Transient(reason),
        }
    }
}

//
// ================= Wire Format =================
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteDto {
    #[serde(default)]
    company_name: Option<String>,
    current_price: f64,
    previous_close: Option<f64>,
}

impl QuoteDto {
    /// Daily change is derived from the previous close, the way the
    /// upstream quote feeds report it.
    fn into_quote(self, symbol: &Symbol) -> Quote {
        let (daily_change, daily_change_percent) = match self.previous_close {
            Some(prev) if prev != 0.0 => {
                let change = self.current_price - prev;
                (change, change / prev * 100.0)
            }
            _ => (0.0, 0.0),
        };

        Quote {
            symbol: symbol.clone(),
            company_name: self.company_name,
            current_price: self.current_price,
            daily_change,
            daily_change_percent,
            as_of: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryDto {
    points: Vec<HistoryPointDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryPointDto {
    date: chrono::NaiveDate,
    close: f64,
    #[serde(default)]
    volume: u64,
}

impl HistoryDto {
    fn into_series(self, symbol: &Symbol) -> HistorySeries {
        let mut points: Vec<TimeSeriesPoint> = self
            .points
            .into_iter()
            .map(|p| TimeSeriesPoint {
                date: p.date,
                close: p.close,
                volume: p.volume,
            })
            .collect();

        // The provider promises full windows, but ordering is ours to
        // guarantee.
        points.sort_by_key(|p| p.date);

        HistorySeries {
            symbol: symbol.clone(),
            points,
        }
    }
}
