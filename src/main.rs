use clap::Parser;
use gemini_bridge::config::BridgeConfig;
use gemini_bridge::observability::init_tracing;
use gemini_bridge::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let config = BridgeConfig::parse();
    config.validate()?;
    init_tracing(&config.log_level);

    server::run(config).await
}
