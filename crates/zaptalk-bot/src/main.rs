use std::sync::Arc;

use tracing::info;

use zaptalk_agent::{GeminiProvider, TurnPipeline};
use zaptalk_core::config::ZaptalkConfig;
use zaptalk_memory::PgConversationStore;
use zaptalk_telegram::TelegramAdapter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // load config: ZAPTALK_CONFIG env > ~/.zaptalk/zaptalk.toml.
    // Placeholder credentials are rejected here — the process must not start
    // half-configured.
    let config_path = std::env::var("ZAPTALK_CONFIG").ok();
    let config = ZaptalkConfig::load(config_path.as_deref())?;
    config.validate()?;

    // Open the conversation store and run schema init (idempotent). Both are
    // fatal on failure; the bot cannot run without its memory.
    info!("connecting to conversation store");
    let store = PgConversationStore::connect(&config.database).await?;
    zaptalk_memory::db::init_db(store.pool()).await?;
    info!("database initialized");

    let provider = Arc::new(GeminiProvider::new(&config.gemini));
    let pipeline = Arc::new(TurnPipeline::new(
        Arc::new(store.clone()),
        provider,
        config.persona.clone(),
    ));

    let adapter = TelegramAdapter::new(&config.telegram, pipeline);

    info!(persona = %config.persona.name, model = %config.gemini.model, "bot is running");
    tokio::select! {
        result = adapter.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    store.close().await;
    Ok(())
}
