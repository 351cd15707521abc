//! Response Assembler
//!
//! Pure combination of narrative text and fetched facts into response
//! envelopes. For comparisons the envelope count and order always match
//! the classifier's capped symbol list, so the caller can correlate
//! envelope N with requested symbol N whatever the fetch outcomes were.

use crate::comparison::ComparisonResult;
use crate::models::{
    FetchOutcome, HistorySeries, Quote, ResponseEnvelope, SymbolFailure,
};

pub struct ResponseAssembler;

impl ResponseAssembler {
    pub fn general(narrative_text: String) -> ResponseEnvelope {
        ResponseEnvelope::narrative_only(narrative_text)
    }

    pub fn single(narrative_text: String, quote: Quote, history: HistorySeries) -> ResponseEnvelope {
        ResponseEnvelope {
            narrative_text,
            symbol: Some(quote.symbol.clone()),
            quote: Some(quote),
            history: Some(history),
            failures: Vec::new(),
        }
    }

    /// Single-ticker question whose fetch failed: facts are gone but the
    /// failure is still structured.
    pub fn single_failure(narrative_text: String, failure: SymbolFailure) -> ResponseEnvelope {
        ResponseEnvelope {
            narrative_text,
            symbol: Some(failure.symbol.clone()),
            quote: None,
            history: None,
            failures: vec![failure],
        }
    }

    /// One envelope per requested symbol, in request order. The shared
    /// narrative rides on the first envelope; the rest carry facts (or a
    /// failure entry) only.
    pub fn comparison(narrative_text: String, result: &ComparisonResult) -> Vec<ResponseEnvelope> {
        let mut narrative = Some(narrative_text);

        result
            .per_symbol
            .iter()
            .map(|(symbol, outcome)| {
                let narrative_text = narrative.take().unwrap_or_default();

                match outcome {
                    FetchOutcome::Success { quote, history } => ResponseEnvelope {
                        narrative_text,
                        symbol: Some(symbol.clone()),
                        quote: Some(quote.clone()),
                        history: Some(history.clone()),
                        failures: Vec::new(),
                    },
                    FetchOutcome::NotFound => ResponseEnvelope {
                        narrative_text,
                        symbol: Some(symbol.clone()),
                        quote: None,
                        history: None,
                        failures: vec![SymbolFailure {
                            symbol: symbol.clone(),
                            reason: "symbol not found".to_string(),
                        }],
                    },
                    FetchOutcome::ProviderError { reason } => ResponseEnvelope {
                        narrative_text,
                        symbol: Some(symbol.clone()),
                        quote: None,
                        history: None,
                        failures: vec![SymbolFailure {
                            symbol: symbol.clone(),
                            reason: reason.clone(),
                        }],
                    },
                }
            })
            .collect()
    }
}
