//! Stock chat agent pipeline
//!
//! message → classify → fetch (single or fan-out) → narrate → assemble.
//!
//! Per-symbol problems become failure entries in the reply; the only
//! hard error out of `handle_message` is a general-knowledge question
//! with the completion capability down, where there is nothing of value
//! left to return.

use crate::assembler::ResponseAssembler;
use crate::classifier::QueryClassifier;
use crate::comparison::ComparisonOrchestrator;
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::gemini::TextCompletion;
use crate::market::{Clock, MarketDataClient, MarketDataProvider, SystemClock};
use crate::models::{
    AgentReply, ClassificationResult, FetchOutcome, SessionContext, Symbol, SymbolFailure,
};
use crate::narrative::{fallback_narrative, NarrativeGenerator, NarrativeInput};
use crate::resolver::resolve_candidates;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub struct StockChatAgent {
    market: Arc<MarketDataClient>,
    comparison: ComparisonOrchestrator,
    narrative: NarrativeGenerator,
    config: AgentConfig,
}

impl StockChatAgent {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        completion: Arc<dyn TextCompletion>,
        config: AgentConfig,
    ) -> Self {
        Self::with_clock(provider, completion, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        provider: Arc<dyn MarketDataProvider>,
        completion: Arc<dyn TextCompletion>,
        config: AgentConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let market = Arc::new(MarketDataClient::new(provider, &config, clock));
        let comparison = ComparisonOrchestrator::new(Arc::clone(&market), &config);
        let narrative = NarrativeGenerator::new(completion);

        Self {
            market,
            comparison,
            narrative,
            config,
        }
    }

    /// Handle one user message end to end. Stateless across turns;
    /// `session` is opaque pass-through used for logging and storage.
    pub async fn handle_message(
        &self,
        text: &str,
        session: Option<&SessionContext>,
    ) -> Result<AgentReply> {
        let candidates = resolve_candidates(text);
        let classification =
            QueryClassifier::classify(&candidates, text, self.config.max_compare_symbols);

        info!(
            session_id = ?session.map(|s| s.session_id),
            request_id = ?session.map(|s| s.request_id),
            classification = ?classification,
            "Classified message"
        );

        match classification {
            ClassificationResult::GeneralFinance => self.answer_general(text).await,
            ClassificationResult::SingleTicker { symbol } => {
                self.answer_single(text, symbol).await
            }
            ClassificationResult::Comparison { symbols } => {
                self.answer_comparison(text, &symbols).await
            }
        }
    }

    async fn answer_general(&self, text: &str) -> Result<AgentReply> {
        let narrative = self
            .narrative
            .generate(text, &NarrativeInput::General)
            .await?;

        Ok(AgentReply::Single(ResponseAssembler::general(narrative)))
    }

    async fn answer_single(&self, text: &str, symbol: Symbol) -> Result<AgentReply> {
        match self.market.fetch_pair(&symbol).await {
            FetchOutcome::Success { quote, history } => {
                let input = NarrativeInput::Single {
                    quote: &quote,
                    history: &history,
                };
                let narrative = self.narrate_or_fallback(text, &input).await;

                Ok(AgentReply::Single(ResponseAssembler::single(
                    narrative, quote, history,
                )))
            }
            FetchOutcome::NotFound => {
                // No facts to narrate; a canned reply avoids a wasted
                // completion call.
                let narrative = format!(
                    "I couldn't fetch data for {}. Please check the ticker symbol and try again.",
                    symbol
                );
                Ok(AgentReply::Single(ResponseAssembler::single_failure(
                    narrative,
                    SymbolFailure {
                        symbol,
                        reason: "symbol not found".to_string(),
                    },
                )))
            }
            FetchOutcome::ProviderError { reason } => {
                warn!(symbol = %symbol, reason = %reason, "Single-ticker fetch failed");
                let narrative = format!(
                    "I'm having trouble reaching market data for {} right now. Please try again shortly.",
                    symbol
                );
                Ok(AgentReply::Single(ResponseAssembler::single_failure(
                    narrative,
                    SymbolFailure { symbol, reason },
                )))
            }
        }
    }

    async fn answer_comparison(&self, text: &str, symbols: &[Symbol]) -> Result<AgentReply> {
        let result = self.comparison.fetch_all(symbols).await;

        if result.all_failed() {
            warn!(count = symbols.len(), "All comparison fetches failed");
        }

        let input = NarrativeInput::Comparison { result: &result };
        let narrative = self.narrate_or_fallback(text, &input).await;

        Ok(AgentReply::Comparison(ResponseAssembler::comparison(
            narrative, &result,
        )))
    }

    /// When facts were fetched, a completion outage must not discard
    /// them: substitute the deterministic fallback narrative instead.
    async fn narrate_or_fallback(&self, text: &str, input: &NarrativeInput<'_>) -> String {
        match self.narrative.generate(text, input).await {
            Ok(narrative) => narrative,
            Err(AgentError::NarrativeUnavailable(reason)) => {
                warn!(reason = %reason, "Falling back to deterministic narrative");
                fallback_narrative(input)
            }
            Err(e) => {
                warn!(error = %e, "Unexpected narrative error, falling back");
                fallback_narrative(input)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::testing::{fast_config, ScriptedProvider, SymbolBehavior};
    use crate::narrative::testing::CountingCompletion;

    fn agent_with(
        provider: Arc<ScriptedProvider>,
        completion: Arc<CountingCompletion>,
    ) -> StockChatAgent {
        StockChatAgent::new(provider, completion, fast_config())
    }

    #[tokio::test]
    async fn general_question_never_touches_the_market_client() {
        let provider = Arc::new(ScriptedProvider::new());
        let completion = Arc::new(CountingCompletion::succeeding());
        let agent = agent_with(provider.clone(), completion.clone());

        let reply = agent
            .handle_message("What is compound interest?", None)
            .await
            .unwrap();

        match reply {
            AgentReply::Single(envelope) => {
                assert!(!envelope.narrative_text.is_empty());
                assert!(envelope.quote.is_none());
            }
            other => panic!("expected single reply, got {other:?}"),
        }

        assert_eq!(provider.total_calls(), 0);
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn single_ticker_reply_carries_quote_and_history() {
        let provider = Arc::new(
            ScriptedProvider::new().with("AAPL", SymbolBehavior::Ok { price: 190.0 }),
        );
        let completion = Arc::new(CountingCompletion::succeeding());
        let agent = agent_with(provider, completion.clone());

        let reply = agent
            .handle_message("How is AAPL doing today?", None)
            .await
            .unwrap();

        match reply {
            AgentReply::Single(envelope) => {
                assert_eq!(envelope.symbol.as_ref().unwrap().as_str(), "AAPL");
                assert_eq!(envelope.quote.as_ref().unwrap().current_price, 190.0);
                assert_eq!(envelope.history.as_ref().unwrap().points.len(), 30);
                assert!(envelope.failures.is_empty());
            }
            other => panic!("expected single reply, got {other:?}"),
        }

        // One narrative call for the whole message.
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_single_ticker_skips_the_completion_call() {
        let provider = Arc::new(ScriptedProvider::new().with("ZZZZ", SymbolBehavior::NotFound));
        let completion = Arc::new(CountingCompletion::succeeding());
        let agent = agent_with(provider, completion.clone());

        let reply = agent.handle_message("How is ZZZZ doing?", None).await.unwrap();

        match reply {
            AgentReply::Single(envelope) => {
                assert!(envelope.quote.is_none());
                assert_eq!(envelope.failures.len(), 1);
                assert!(envelope.narrative_text.contains("ZZZZ"));
            }
            other => panic!("expected single reply, got {other:?}"),
        }

        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn comparison_keeps_order_and_reports_bad_symbols() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with("AAPL", SymbolBehavior::Ok { price: 190.0 })
                .with("ZZZZ", SymbolBehavior::NotFound)
                .with("MSFT", SymbolBehavior::Ok { price: 410.0 }),
        );
        let completion = Arc::new(CountingCompletion::succeeding());
        let agent = agent_with(provider, completion.clone());

        let reply = agent
            .handle_message("Compare AAPL ZZZZ MSFT", None)
            .await
            .unwrap();

        let AgentReply::Comparison(envelopes) = reply else {
            panic!("expected comparison reply");
        };

        assert_eq!(envelopes.len(), 3);
        let order: Vec<&str> = envelopes
            .iter()
            .map(|e| e.symbol.as_ref().unwrap().as_str())
            .collect();
        assert_eq!(order, vec!["AAPL", "ZZZZ", "MSFT"]);

        assert!(envelopes[0].quote.is_some());
        assert!(envelopes[1].quote.is_none());
        assert_eq!(envelopes[1].failures.len(), 1);
        assert!(envelopes[2].quote.is_some());

        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn comparison_is_capped_at_ten_symbols() {
        let names = [
            "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "NFLX", "ORCL", "CRM",
            "AMD", "INTC",
        ];
        let mut provider = ScriptedProvider::new();
        for name in names {
            provider = provider.with(name, SymbolBehavior::Ok { price: 10.0 });
        }
        let completion = Arc::new(CountingCompletion::succeeding());
        let agent = agent_with(Arc::new(provider), completion);

        let text = format!("Compare {}", names.join(" "));
        let reply = agent.handle_message(&text, None).await.unwrap();

        let AgentReply::Comparison(envelopes) = reply else {
            panic!("expected comparison reply");
        };

        assert_eq!(envelopes.len(), 10);
        let order: Vec<&str> = envelopes
            .iter()
            .map(|e| e.symbol.as_ref().unwrap().as_str())
            .collect();
        assert_eq!(order, names[..10].to_vec());
    }

    #[tokio::test]
    async fn completion_outage_still_returns_market_facts() {
        let provider = Arc::new(
            ScriptedProvider::new().with("AAPL", SymbolBehavior::Ok { price: 190.0 }),
        );
        let completion = Arc::new(CountingCompletion::failing());
        let agent = agent_with(provider, completion);

        let reply = agent
            .handle_message("How is AAPL doing today?", None)
            .await
            .unwrap();

        match reply {
            AgentReply::Single(envelope) => {
                assert!(envelope.quote.is_some());
                assert!(envelope.narrative_text.contains("not financial advice"));
            }
            other => panic!("expected single reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn general_question_with_completion_down_is_a_hard_error() {
        let provider = Arc::new(ScriptedProvider::new());
        let completion = Arc::new(CountingCompletion::failing());
        let agent = agent_with(provider, completion);

        let result = agent.handle_message("What is compound interest?", None).await;

        assert!(matches!(
            result,
            Err(AgentError::NarrativeUnavailable(_))
        ));
    }
}
