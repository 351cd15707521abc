//! Core data models for the stock chat orchestrator

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Symbol =================
//

/// Uppercase ticker symbol. Construction normalizes case; real-world
/// existence is only established by a successful provider lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ================= Market Data =================
//

/// Point-in-time price snapshot. Immutable once fetched; a refresh
/// produces a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub company_name: Option<String>,
    pub current_price: f64,
    pub daily_change: f64,
    pub daily_change_percent: f64,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

/// Trailing window of daily closes, ascending by date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySeries {
    pub symbol: Symbol,
    pub points: Vec<TimeSeriesPoint>,
}

impl HistorySeries {
    pub fn first_close(&self) -> Option<f64> {
        self.points.first().map(|p| p.close)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    pub fn min_close(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.close)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn max_close(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.close)
            .max_by(|a, b| a.total_cmp(b))
    }
}

//
// ================= Classification =================
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassificationResult {
    /// No ticker involved; answered from general finance knowledge.
    GeneralFinance,
    /// One ticker, no comparison language.
    SingleTicker { symbol: Symbol },
    /// One or more tickers to compare. Deduplicated, first-mention
    /// order, capped at the configured maximum.
    Comparison { symbols: Vec<Symbol> },
}

//
// ================= Fetch Outcomes =================
//

/// Per-symbol result of a quote + history fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success {
        quote: Quote,
        history: HistorySeries,
    },
    NotFound,
    ProviderError {
        reason: String,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// Failure entry surfaced to the caller for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: Symbol,
    pub reason: String,
}

//
// ================= Response Envelope =================
//

/// Normalized unit of response data handed to the delivery collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub narrative_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<Quote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistorySeries>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SymbolFailure>,
}

impl ResponseEnvelope {
    pub fn narrative_only(narrative_text: String) -> Self {
        Self {
            narrative_text,
            symbol: None,
            quote: None,
            history: None,
            failures: Vec::new(),
        }
    }
}

/// Reply shape returned by the agent. A comparison always yields one
/// envelope per requested symbol, in classifier order, so the caller
/// can correlate envelope N with requested symbol N.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "envelopes", rename_all = "snake_case")]
pub enum AgentReply {
    Single(ResponseEnvelope),
    Comparison(Vec<ResponseEnvelope>),
}

impl AgentReply {
    pub fn envelopes(&self) -> Vec<&ResponseEnvelope> {
        match self {
            AgentReply::Single(envelope) => vec![envelope],
            AgentReply::Comparison(envelopes) => envelopes.iter().collect(),
        }
    }
}

//
// ================= Session =================
//

/// Opaque session identity passed through from the calling collaborator.
/// The core logs it and hands it to storage; it never influences
/// classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub request_id: Uuid,
}

impl SessionContext {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            request_id: Uuid::new_v4(),
        }
    }
}
