//! Market Data Client
//!
//! Cache-first fetch orchestration over the provider boundary: check the
//! TTL cache, call the provider on miss, retry transient failures with
//! exponential backoff, and cache every result — including negative
//! lookups.

pub mod cache;
pub mod provider;
pub mod retry;

pub use cache::{CachedValue, Clock, DataKind, ManualClock, MarketCache, SystemClock, TtlPolicy};
pub use provider::{HttpMarketDataProvider, MarketDataProvider, ProviderResponse};
pub use retry::{BackoffPolicy, RetrySchedule, RetryState};

use crate::config::AgentConfig;
use crate::models::{FetchOutcome, HistorySeries, Quote, Symbol};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a single-kind lookup (quote or history).
#[derive(Debug)]
pub enum DataOutcome<T> {
    Success(T),
    NotFound,
    ProviderError { reason: String },
}

pub struct MarketDataClient {
    provider: Arc<dyn MarketDataProvider>,
    cache: MarketCache,
    backoff: BackoffPolicy,
    history_days: u32,
}

impl MarketDataClient {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        config: &AgentConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl = TtlPolicy {
            quote: config.quote_ttl,
            history: config.history_ttl,
            not_found: config.not_found_ttl,
        };

        Self {
            provider,
            cache: MarketCache::new(ttl, clock),
            backoff: BackoffPolicy::new(config.backoff_base, config.max_fetch_attempts),
            history_days: config.history_days,
        }
    }

    pub async fn get_quote(&self, symbol: &Symbol) -> DataOutcome<Quote> {
        match self.cache.get(symbol, DataKind::Quote).await {
            Some(CachedValue::Quote(quote)) => return DataOutcome::Success(quote),
            Some(CachedValue::NotFound) => return DataOutcome::NotFound,
            // Keys are kind-scoped; a history value can't sit under a
            // quote key.
            Some(CachedValue::History(_)) | None => {}
        }

        self.fetch_with_retry(
            symbol,
            DataKind::Quote,
            || self.provider.fetch_quote(symbol),
            CachedValue::Quote,
        )
        .await
    }

    pub async fn get_history(&self, symbol: &Symbol) -> DataOutcome<HistorySeries> {
        match self.cache.get(symbol, DataKind::History).await {
            Some(CachedValue::History(series)) => return DataOutcome::Success(series),
            Some(CachedValue::NotFound) => return DataOutcome::NotFound,
            Some(CachedValue::Quote(_)) | None => {}
        }

        self.fetch_with_retry(
            symbol,
            DataKind::History,
            || self.provider.fetch_history(symbol, self.history_days),
            CachedValue::History,
        )
        .await
    }

    /// Quote and history for one symbol, fetched concurrently. A
    /// not-found on either side marks the symbol invalid.
    pub async fn fetch_pair(&self, symbol: &Symbol) -> FetchOutcome {
        let (quote, history) = tokio::join!(self.get_quote(symbol), self.get_history(symbol));

        match (quote, history) {
            (DataOutcome::Success(quote), DataOutcome::Success(history)) => {
                FetchOutcome::Success { quote, history }
            }
            (DataOutcome::NotFound, _) | (_, DataOutcome::NotFound) => FetchOutcome::NotFound,
            (DataOutcome::ProviderError { reason }, _)
            | (_, DataOutcome::ProviderError { reason }) => FetchOutcome::ProviderError { reason },
        }
    }

    async fn fetch_with_retry<T, F, Fut>(
        &self,
        symbol: &Symbol,
        kind: DataKind,
        call: F,
        wrap: fn(T) -> CachedValue,
    ) -> DataOutcome<T>
    where
        T: Clone,
        F: Fn() -> Fut,
        Fut: Future<Output = ProviderResponse<T>>,
    {
        let mut schedule = RetrySchedule::new(self.backoff.clone());
        let mut last_reason = String::from("no attempts made");

        while let Some(attempt) = schedule.current_attempt() {
            match call().await {
                ProviderResponse::Ok(value) => {
                    schedule.record_success();
                    self.cache.insert(symbol, kind, wrap(value.clone())).await;
                    return DataOutcome::Success(value);
                }
                ProviderResponse::NotFound => {
                    // Definitive answer; cache it so repeat lookups of a
                    // bad ticker don't hit the provider again.
                    info!(symbol = %symbol, ?kind, "Symbol not known to provider");
                    self.cache.insert(symbol, kind, CachedValue::NotFound).await;
                    return DataOutcome::NotFound;
                }
                ProviderResponse::RateLimited => {
                    last_reason = "provider rate limited".to_string();
                    warn!(symbol = %symbol, ?kind, attempt, "Rate limited by provider");
                    match schedule.record_failure(true) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => break,
                    }
                }
                ProviderResponse::Transient(reason) => {
                    warn!(symbol = %symbol, ?kind, attempt, reason = %reason, "Transient provider failure");
                    last_reason = reason;
                    match schedule.record_failure(false) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => break,
                    }
                }
            }
        }

        warn!(symbol = %symbol, ?kind, reason = %last_reason, "Fetch attempts exhausted");
        DataOutcome::ProviderError {
            reason: last_reason,
        }
    }
}

//
// ================= Test Support =================
//
