// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ticketline serve` command implementation.
//!
//! Wires SQLite storage, the encrypted media archive and the stdio bridge
//! channel into the intake loop, then runs until the bridge closes or a
//! shutdown signal arrives.

use std::sync::Arc;

use ticketline_config::model::TicketlineConfig;
use ticketline_core::{
    ChannelAdapter, MediaIndex, StorageAdapter, TicketResolver, TicketlineError,
};
use ticketline_intake::{
    ConversationEngine, DedupFilter, InMemorySessionStore, IntakeLoop, MediaArchiver, Responder,
    SessionStore, shutdown,
};
use ticketline_storage::SqliteStorage;
use ticketline_vault::MediaVault;
use tracing::{info, warn};

use crate::bridge::BridgeChannel;

/// Runs the `ticketline serve` command.
pub async fn run_serve(config: TicketlineConfig) -> Result<(), TicketlineError> {
    init_tracing(&config.agent.log_level);

    info!(agent = config.agent.name.as_str(), "starting ticketline serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let persist = config.storage.enable_database_storage;
    if !persist {
        warn!("database storage disabled; conversations run but tickets are not written");
    }

    let mut bridge = BridgeChannel::stdio();
    bridge.connect().await?;
    let channel: Arc<dyn ChannelAdapter> = Arc::new(bridge);

    let sessions: Arc<dyn SessionStore> =
        Arc::new(InMemorySessionStore::new(config.intake.session_timeout()));
    let engine = Arc::new(ConversationEngine::new(
        Arc::clone(&storage) as Arc<dyn TicketResolver>,
        sessions,
        Responder::new(Arc::clone(&channel)),
        config.intake.clone(),
        persist,
    ));

    let media = MediaVault::from_config(&config.media).map(|vault| {
        info!(dir = %vault.dir().display(), "media archiving enabled");
        let index = persist.then(|| Arc::clone(&storage) as Arc<dyn MediaIndex>);
        MediaArchiver::new(vault, index)
    });

    let intake = IntakeLoop::new(
        Arc::clone(&channel),
        engine,
        DedupFilter::from_config(&config.intake),
        media,
        config.media.enable_text_logging,
    );

    let cancel = shutdown::install_signal_handler();
    if !intake.run(cancel).await {
        warn!("shutdown drain incomplete");
    }

    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "bridge shutdown failed");
    }
    storage.close().await?;

    info!("ticketline serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr; stdout carries bridge replies.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ticketline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
