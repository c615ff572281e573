//! peekbox server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use peekbox_client::{FetchClient, FetchConfig, Fetcher, HttpImageProbe, PageSession, Resolver};
use peekbox_core::{AppConfig, CacheDb, ThumbnailCache};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), "Starting peekbox server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let cache = ThumbnailCache::open(Arc::new(db)).await;
    let fetcher: Arc<dyn Fetcher> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let probe = Arc::new(HttpImageProbe::new(fetcher.clone()));
    let session = PageSession::new(Resolver::new(fetcher.clone(), cache), probe, config.viewport());

    let handler = handler::PeekboxServer::new(session, fetcher);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
