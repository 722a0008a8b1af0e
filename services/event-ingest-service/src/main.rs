mod app;
mod config;
mod error;
mod handlers;
mod logic;
mod models;
mod server;
mod sink;
mod state;

use std::{io, sync::Arc};

use ingest_common::{bind_listener, init_tracing, shutdown_signal};

use crate::config::ServerConfig;
use crate::sink::TracingSink;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    let guards = init_tracing("event-ingest-service");

    let config = ServerConfig::from_env();
    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "server failed");
        // Flush the file writer before exiting.
        drop(guards);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> io::Result<()> {
    // One sink handle shared by every request.
    let state = AppState::new(Arc::new(TracingSink), config.max_body_bytes);
    let app = app::build_router(state);
    let listener = bind_listener(config.port).await?;

    tracing::info!(
        addr = %listener.local_addr()?,
        header_read_timeout = ?config.header_read_timeout,
        max_body_bytes = config.max_body_bytes,
        "starting server"
    );

    server::serve(listener, app, config.header_read_timeout, shutdown_signal()).await
}
