//! Mindbridge application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the session store (SQLite file or in-memory with expiry)
//! 3. Build the dialogue engine client, Messenger client and orchestrator
//! 4. Serve the webhook API until Ctrl-C

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use mindbridge_api::state::AppState;
use mindbridge_bot::{EventHandlers, HttpDialogueEngine, MessengerClient, Orchestrator};
use mindbridge_core::config::{MindbridgeConfig, StorageBackend};
use mindbridge_storage::{Database, MemorySessionStore, SessionStore, SqliteSessionStore};

use crate::cli::CliArgs;

/// How often the in-memory store drops expired sessions.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = MindbridgeConfig::load(&config_file)?;
    config.server.port = args.resolve_port(config.server.port);
    config.server.log_level = args.resolve_log_level(&config.server.log_level);
    config.storage.backend = args.resolve_storage(config.storage.backend);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level)),
        )
        .init();

    tracing::info!("Starting Mindbridge v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");
    config.validate()?;

    // Session store.
    let mut purge_task = None;
    let store: Arc<dyn SessionStore> = match config.storage.backend {
        StorageBackend::Sqlite => {
            let db_path = config.storage.resolved_database_path();
            let db = Database::new(&db_path)?;
            tracing::info!(path = %db_path.display(), "SQLite session store opened");
            Arc::new(SqliteSessionStore::new(Arc::new(db)))
        }
        StorageBackend::Memory => {
            let store = Arc::new(MemorySessionStore::new());
            purge_task = Some(Arc::clone(&store).spawn_purge_task(PURGE_INTERVAL));
            tracing::info!(
                max_idle_secs = config.bot.max_idle_session_secs,
                "In-memory session store ready"
            );
            store
        }
    };

    // Collaborators.
    let engine = Arc::new(HttpDialogueEngine::from_config(&config.bot, &config.engine)?);
    let transport = Arc::new(MessengerClient::from_config(
        &config.messenger,
        &config.bot,
        &config.engine,
    )?);
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(config.bot.clone()),
        store,
        engine,
        transport,
    ));
    tracing::info!(
        page_id = %config.bot.page_id,
        story = %config.bot.story,
        "Bot ready"
    );

    // === HTTP server ===

    let state = AppState::new(
        EventHandlers::new(orchestrator),
        &config.messenger.verify_token,
        &config.bot.page_id,
        config.storage.backend,
    );
    let addr = format!("{}:{}", config.server.host, config.server.port);

    if let Err(e) = mindbridge_api::start_server(&addr, state, shutdown_signal()).await {
        tracing::error!(addr = %addr, error = %e, "Server failed");
        return Err(e.into());
    }

    if let Some(task) = purge_task {
        task.abort();
    }
    tracing::info!("Mindbridge stopped");
    Ok(())
}
