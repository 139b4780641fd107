use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use note_store_gateway::logging::{info, warn};
use note_store_gateway::{Config, create_default_accessor, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    if let Err(err) = logging::init(config.log_level) {
        eprintln!("logging already initialised: {err}");
    }

    let accessor = create_default_accessor(&config);
    let stores: Vec<String> = accessor.stores().iter().map(|s| s.to_string()).collect();
    let app = server::router(Arc::new(accessor));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(
        "Serving [{}] on {}",
        stores.join(", "),
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
