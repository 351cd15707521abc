use std::sync::Arc;
use stock_chat_orchestrator::{
    agent::StockChatAgent,
    api::start_server,
    config::AgentConfig,
    gemini::GeminiClient,
    market::HttpMarketDataProvider,
    storage::InMemoryMessageStore,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Stock Chat Orchestrator - API Server");
    info!("Port: {}", api_port);

    // Create components
    let config = AgentConfig::from_env();
    let provider = Arc::new(HttpMarketDataProvider::from_env()?);
    let completion = Arc::new(GeminiClient::from_env()?);
    let store = Arc::new(InMemoryMessageStore::new());

    let agent = Arc::new(StockChatAgent::new(provider, completion, config));

    info!("Agent initialized");
    info!("Starting API server...");

    // Start API server
    start_server(agent, store, api_port).await?;

    Ok(())
}
