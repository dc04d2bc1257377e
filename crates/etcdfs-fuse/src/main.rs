#![warn(missing_docs)]
//! etcdfs: mount an etcd key tree as a read-only filesystem

use std::sync::Arc;

use clap::Parser;
use etcdfs_client::HttpKeysClient;
use etcdfs_fuse::cli::Cli;
use etcdfs_fuse::server::FuseServer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = cli.into_config()?;
    let client = HttpKeysClient::new(config.client_config())?;
    for endpoint in client.endpoints() {
        tracing::info!("Using etcd endpoint {}", endpoint);
    }

    let server = FuseServer::new(config);
    server.run(Arc::new(client)).await?;

    tracing::info!("etcdfs stopped");
    Ok(())
}
