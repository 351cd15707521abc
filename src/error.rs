//! Error types for the stock chat orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Provider error after retries: {0}")]
    ProviderTransient(String),

    #[error("Provider rate limited")]
    ProviderRateLimited,

    #[error("Narrative generation unavailable: {0}")]
    NarrativeUnavailable(String),

    #[error("Completion error: {0}")]
    CompletionError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
