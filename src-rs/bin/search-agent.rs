use std::sync::Arc;

use search_agent_rs::api::AgentServer;
use search_agent_rs::Settings;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "search_agent_rs=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Credentials are checked here, before the listener is bound.
    let settings = Arc::new(Settings::from_env()?);
    info!(
        gemini_keys = settings.gemini_api_keys.len(),
        openai_keys = settings.openai_api_keys.len(),
        max_iterations = settings.max_iterations,
        "loaded configuration"
    );

    let server = AgentServer::from_settings(settings)?;
    server.start().await?;
    Ok(())
}
