use std::sync::Arc;
use stock_chat_orchestrator::{
    agent::StockChatAgent, config::AgentConfig, gemini::GeminiClient,
    market::HttpMarketDataProvider,
};
use tracing::info;

/// One-shot runner: sends a single message through the pipeline and
/// prints the reply as JSON.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenv::dotenv().ok();

    let message: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let message = if message.trim().is_empty() {
        "How is AAPL doing today?".to_string()
    } else {
        message
    };

    let config = AgentConfig::from_env();
    let provider = Arc::new(HttpMarketDataProvider::from_env()?);
    let completion = Arc::new(GeminiClient::from_env()?);
    let agent = StockChatAgent::new(provider, completion, config);

    info!(message = %message, "Running pipeline");

    match agent.handle_message(&message, None).await {
        Ok(reply) => {
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Pipeline failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
