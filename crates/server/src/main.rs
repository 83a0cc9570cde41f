//! zubid-sw host entry point.
//!
//! Boots configuration, the cache store, the origin client and the worker,
//! then serves the worker events as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use zubid_sw_client::{FetchClient, FetchConfig};
use zubid_sw_core::{AppConfig, CacheDb, Worker, WorkerSettings};

mod handler;
mod platform;
mod tools;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    tracing::info!(
        origin = %config.origin_url,
        version = %config.version,
        db_path = %config.db_path.display(),
        "Starting zubid-sw worker host on stdio transport"
    );

    let store = CacheDb::open(&config.db_path).await?.with_quota(config.max_generation_bytes);
    let origin = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config))?);
    let platform = Arc::new(platform::HostPlatform::default());
    let worker = Worker::new(WorkerSettings::from_config(&config)?, store, origin, platform.clone());

    let handler = handler::ZubidWorkerServer::new(Arc::new(worker), platform);
    let background = handler.background();

    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    let pending = std::mem::take(&mut *background.lock().await);
    if !pending.is_empty() {
        tracing::info!(tasks = pending.len(), "settling background work before exit");
    }
    if let Err(err) = pending.settle().await {
        tracing::warn!(error = %err, "background work failed during shutdown");
    }

    Ok(())
}
