//! Persistence collaborator boundary
//!
//! The core hands finished exchanges to a store and never reads them
//! back; durable storage belongs to the calling collaborator. The
//! in-memory implementation keeps the server binary self-contained.

use crate::models::AgentReply;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredExchange {
    pub session_id: Uuid,
    pub user_text: String,
    pub reply: AgentReply,
    pub stored_at: DateTime<Utc>,
}

/// Write-only boundary for finished exchanges.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn record_exchange(
        &self,
        session_id: Uuid,
        user_text: &str,
        reply: &AgentReply,
    ) -> Result<()>;
}

/// In-memory store for development and tests.
pub struct InMemoryMessageStore {
    exchanges: Arc<RwLock<HashMap<Uuid, Vec<StoredExchange>>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            exchanges: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn exchange_count(&self, session_id: Uuid) -> usize {
        self.exchanges
            .read()
            .await
            .get(&session_id)
            .map_or(0, Vec::len)
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn record_exchange(
        &self,
        session_id: Uuid,
        user_text: &str,
        reply: &AgentReply,
    ) -> Result<()> {
        let exchange = StoredExchange {
            session_id,
            user_text: user_text.to_string(),
            reply: reply.clone(),
            stored_at: Utc::now(),
        };

        let mut exchanges = self.exchanges.write().await;
        exchanges.entry(session_id).or_default().push(exchange);

        debug!(%session_id, "Recorded exchange");
        Ok(())
    }
}
