//! Simon Duel Server
//!
//! Pairs connecting players and referees their duels.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use simon_duel::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Simon Duel Server v{}", VERSION);

    let config = ServerConfig::from_env()?;
    info!(
        "Deadlines: {:?} first press, {:?} thereafter",
        config.session.initial_deadline, config.session.replay_deadline
    );

    let server = Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_server.shutdown(),
            Err(e) => error!("Failed to listen for ctrl-c: {}", e),
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
