//! Presence relay: fans player join/move/leave events out to every
//! connected map client. Holds no map state and enforces nothing.

use anyhow::Context;
use community_map::protocol::relay_addr;
use community_map::relay::{serve, Hub, SharedHub};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let addr = relay_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Relay listening on {addr}");

    let hub: SharedHub = Arc::new(Mutex::new(Hub::new()));
    serve(listener, hub).await
}
