//! Multi-variant poker room server.
//!
//! Wires the pokerroom core to a WebSocket endpoint: an in-memory
//! wallet and a static identity resolver stand in for the external
//! services in development; production deployments swap both through
//! the core's adapter traits.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use pico_args::Arguments;
use pokerroom::{
    LobbyConfig, auth::StaticIdentities, session::SessionCoordinator, wallet::InMemoryWallet,
};

use pr_server::{api, config::ServerConfig, logging};

const HELP: &str = "\
Run a multi-variant poker room server

USAGE:
  pr_server [OPTIONS]

OPTIONS:
  --bind IP:PORT    Server socket bind address  [default: env PR_BIND or 127.0.0.1:7070]

FLAGS:
  -h, --help        Print help information

ENVIRONMENT:
  PR_BIND               Server bind address (e.g. 0.0.0.0:7070)
  PR_STAKES             Stake sheet, e.g. \"1/2,5/10,25/50\"
  PR_VARIANTS           Variants to open system tables for, e.g. \"texas,omaha\"
  PR_STARTING_BALANCE   Dev-wallet starting balance per player
  PR_DEV_TOKENS         Static credentials, e.g. \"tok1:alice:Alice,tok2:bob:Bob\"
  RUST_LOG              Log filter (default: info)
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }
    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override).context("loading configuration")?;
    tracing::info!(
        "starting poker room at {} ({} variants × {} stakes)",
        config.bind,
        config.variants.len(),
        config.stakes.len()
    );

    let identities = Arc::new(StaticIdentities::new());
    for token in &config.dev_tokens {
        identities
            .register(&token.token, &token.player, &token.display_name)
            .await;
    }
    if config.dev_tokens.is_empty() {
        tracing::warn!("no PR_DEV_TOKENS configured; every session will be a spectator");
    }

    let wallet = Arc::new(InMemoryWallet::new(config.starting_balance));
    let lobby_config = LobbyConfig {
        stakes: config.stakes.clone(),
        variants: config.variants.clone(),
    };
    let coordinator = SessionCoordinator::start(lobby_config, identities, wallet).await;

    let tables = coordinator.lobby().summaries().await;
    tracing::info!("{} tables open:", tables.len());
    for table in &tables {
        tracing::info!(
            "  {} — {} {} {}, {}/{} seats",
            table.id,
            table.betting,
            table.variant,
            table.blinds,
            table.seats_taken,
            table.max_seats
        );
    }

    let app = api::create_router(api::AppState { coordinator });
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!("listening on ws://{}/ws — press Ctrl+C to stop", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
}
