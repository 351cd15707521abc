//! Comparison Orchestrator
//!
//! Fans out quote+history fetches for up to N symbols with bounded
//! concurrency, waits for every outcome, and reports results keyed by
//! the original symbol order. Partial failure is normal operation here;
//! even a total failure returns a result rather than an error.

use crate::config::AgentConfig;
use crate::market::MarketDataClient;
use crate::models::{FetchOutcome, HistorySeries, Quote, Symbol, SymbolFailure};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Per-symbol outcomes in original request order.
#[derive(Debug)]
pub struct ComparisonResult {
    pub per_symbol: Vec<(Symbol, FetchOutcome)>,
}

impl ComparisonResult {
    /// Successful fetches, original order preserved.
    pub fn successes(&self) -> Vec<(&Symbol, &Quote, &HistorySeries)> {
        self.per_symbol
            .iter()
            .filter_map(|(symbol, outcome)| match outcome {
                FetchOutcome::Success { quote, history } => Some((symbol, quote, history)),
                FetchOutcome::NotFound | FetchOutcome::ProviderError { .. } => None,
            })
            .collect()
    }

    /// Failure entries parallel to the successes list.
    pub fn failures(&self) -> Vec<SymbolFailure> {
        self.per_symbol
            .iter()
            .filter_map(|(symbol, outcome)| match outcome {
                FetchOutcome::Success { .. } => None,
                FetchOutcome::NotFound => Some(SymbolFailure {
                    symbol: symbol.clone(),
                    reason: "symbol not found".to_string(),
                }),
                FetchOutcome::ProviderError { reason } => Some(SymbolFailure {
                    symbol: symbol.clone(),
                    reason: reason.clone(),
                }),
            })
            .collect()
    }

    pub fn all_failed(&self) -> bool {
        self.per_symbol
            .iter()
            .all(|(_, outcome)| !outcome.is_success())
    }
}

pub struct ComparisonOrchestrator {
    market: Arc<MarketDataClient>,
    concurrency: usize,
    fetch_timeout: Duration,
}

impl ComparisonOrchestrator {
    pub fn new(market: Arc<MarketDataClient>, config: &AgentConfig) -> Self {
        Self {
            market,
            concurrency: config.fetch_concurrency.max(1),
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Fetch all symbols and wait for every outcome. A single stuck
    /// symbol is bounded by the per-fetch timeout, so it cannot stall
    /// the rest of the batch.
    pub async fn fetch_all(&self, symbols: &[Symbol]) -> ComparisonResult {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(symbols.len());

        info!(count = symbols.len(), "Fanning out comparison fetches");

        for symbol in symbols {
            let market = Arc::clone(&self.market);
            let semaphore = Arc::clone(&semaphore);
            let symbol = symbol.clone();
            let fetch_timeout = self.fetch_timeout;

            // Detached tasks: if the caller goes away, in-flight fetches
            // still complete and populate the cache.
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore closed while fetches pending");

                match tokio::time::timeout(fetch_timeout, market.fetch_pair(&symbol)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(symbol = %symbol, "Per-symbol fetch timed out");
                        FetchOutcome::ProviderError {
                            reason: "fetch timed out".to_string(),
                        }
                    }
                }
            }));
        }

        // Collected by input index, not completion order, to keep the
        // ordering invariant.
        let mut per_symbol = Vec::with_capacity(symbols.len());
        for (symbol, handle) in symbols.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Fetch task failed");
                    FetchOutcome::ProviderError {
                        reason: "fetch task failed".to_string(),
                    }
                }
            };
            per_symbol.push((symbol.clone(), outcome));
        }

        ComparisonResult { per_symbol }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::testing::{fast_config, ScriptedProvider, SymbolBehavior};
    use crate::market::{ManualClock, MarketDataClient};
    use chrono::Utc;

    fn orchestrator_with(
        provider: Arc<ScriptedProvider>,
        config: AgentConfig,
    ) -> ComparisonOrchestrator {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let market = Arc::new(MarketDataClient::new(provider, &config, clock));
        ComparisonOrchestrator::new(market, &config)
    }

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(Symbol::new).collect()
    }

    #[tokio::test]
    async fn preserves_order_with_partial_failure() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with("AAPL", SymbolBehavior::Ok { price: 190.0 })
                .with("ZZZZ", SymbolBehavior::NotFound)
                .with("MSFT", SymbolBehavior::Ok { price: 410.0 }),
        );
        let orchestrator = orchestrator_with(provider, fast_config());

        let result = orchestrator
            .fetch_all(&symbols(&["AAPL", "ZZZZ", "MSFT"]))
            .await;

        let order: Vec<&str> = result
            .per_symbol
            .iter()
            .map(|(s, _)| s.as_str())
            .collect();
        assert_eq!(order, vec!["AAPL", "ZZZZ", "MSFT"]);

        assert!(result.per_symbol[0].1.is_success());
        assert!(matches!(result.per_symbol[1].1, FetchOutcome::NotFound));
        assert!(result.per_symbol[2].1.is_success());

        let failures = result.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].symbol.as_str(), "ZZZZ");
        assert_eq!(failures[0].reason, "symbol not found");
    }

    #[tokio::test]
    async fn total_failure_returns_instead_of_erroring() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with("AAA", SymbolBehavior::AlwaysTransient)
                .with("BBB", SymbolBehavior::NotFound),
        );
        let orchestrator = orchestrator_with(provider, fast_config());

        let result = orchestrator.fetch_all(&symbols(&["AAA", "BBB"])).await;

        assert!(result.all_failed());
        assert!(result.successes().is_empty());
        assert_eq!(result.failures().len(), 2);
    }

    #[tokio::test]
    async fn degenerate_single_symbol_comparison_works() {
        let provider = Arc::new(
            ScriptedProvider::new().with("AAPL", SymbolBehavior::Ok { price: 190.0 }),
        );
        let orchestrator = orchestrator_with(provider, fast_config());

        let result = orchestrator.fetch_all(&symbols(&["AAPL"])).await;

        assert_eq!(result.per_symbol.len(), 1);
        assert_eq!(result.successes().len(), 1);
        assert!(result.failures().is_empty());
    }

    #[tokio::test]
    async fn stuck_symbol_times_out_without_stalling_the_batch() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with("AAPL", SymbolBehavior::Ok { price: 190.0 })
                .with(
                    "SLOW",
                    SymbolBehavior::Slow {
                        delay: Duration::from_millis(500),
                        price: 1.0,
                    },
                ),
        );
        let config = AgentConfig {
            fetch_timeout: Duration::from_millis(50),
            ..fast_config()
        };
        let orchestrator = orchestrator_with(provider, config);

        let result = orchestrator.fetch_all(&symbols(&["AAPL", "SLOW"])).await;

        assert!(result.per_symbol[0].1.is_success());
        let failures = result.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].symbol.as_str(), "SLOW");
        assert_eq!(failures[0].reason, "fetch timed out");
    }

    #[tokio::test]
    async fn handles_more_symbols_than_permits() {
        let names = ["S1", "S2", "S3", "S4", "S5", "S6", "S7", "S8"];
        let mut provider = ScriptedProvider::new();
        for name in names {
            provider = provider.with(name, SymbolBehavior::Ok { price: 10.0 });
        }
        let config = AgentConfig {
            fetch_concurrency: 2,
            ..fast_config()
        };
        let orchestrator = orchestrator_with(Arc::new(provider), config);

        let result = orchestrator.fetch_all(&symbols(&names)).await;

        assert_eq!(result.per_symbol.len(), 8);
        assert_eq!(result.successes().len(), 8);
    }
}
