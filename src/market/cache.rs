//! Time-bounded cache for market data
//!
//! Process-wide, keyed by (symbol, kind). Entries are idempotent
//! snapshots; concurrent writes are last-writer-wins per key. The clock
//! is injectable so tests can force expiry without waiting.

use crate::models::{HistorySeries, Quote, Symbol};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic expiry in tests.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += ChronoDuration::from_std(delta).unwrap_or(ChronoDuration::zero());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Quote,
    History,
}

/// Cached payload. Negative lookups are cached too, with a shorter TTL,
/// to avoid hammering the provider with persistently-invalid tickers.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Quote(Quote),
    History(HistorySeries),
    NotFound,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    fetched_at: DateTime<Utc>,
}

/// Per-kind entry lifetimes.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    pub quote: Duration,
    pub history: Duration,
    pub not_found: Duration,
}

impl TtlPolicy {
    fn ttl_for(&self, kind: DataKind, value: &CachedValue) -> Duration {
        match value {
            CachedValue::NotFound => self.not_found,
            _ => match kind {
                DataKind::Quote => self.quote,
                DataKind::History => self.history,
            },
        }
    }
}

pub struct MarketCache {
    entries: RwLock<HashMap<(Symbol, DataKind), CacheEntry>>,
    ttl: TtlPolicy,
    clock: Arc<dyn Clock>,
}

impl MarketCache {
    pub fn new(ttl: TtlPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Return a live entry, or None on miss/expiry. Expired entries are
    /// never served.
    pub async fn get(&self, symbol: &Symbol, kind: DataKind) -> Option<CachedValue> {
        let key = (symbol.clone(), kind);
        let now = self.clock.now();

        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;

        let ttl = self.ttl.ttl_for(kind, &entry.value);
        let age = (now - entry.fetched_at).to_std().unwrap_or(Duration::MAX);

        if age < ttl {
            debug!(symbol = %symbol, ?kind, "Cache hit");
            Some(entry.value.clone())
        } else {
            debug!(symbol = %symbol, ?kind, "Cache entry expired");
            None
        }
    }

    /// Store a fresh entry, overwriting any previous one for the key.
    pub async fn insert(&self, symbol: &Symbol, kind: DataKind, value: CachedValue) {
        let entry = CacheEntry {
            value,
            fetched_at: self.clock.now(),
        };

        let mut entries = self.entries.write().await;
        entries.insert((symbol.clone(), kind), entry);
    }

    /// Drop expired entries. Called opportunistically; correctness never
    /// depends on it since `get` re-checks age.
    pub async fn evict_expired(&self) {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        entries.retain(|(_, kind), entry| {
            let ttl = self.ttl.ttl_for(*kind, &entry.value);
            let age = (now - entry.fetched_at).to_std().unwrap_or(Duration::MAX);
            age < ttl
        });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
