//! Main entry point for the zipshelf server.
//!
//! Indexes the data directory, then serves it until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use zipshelf::Cli;
use zipshelf::catalog;
use zipshelf::server::{App, Server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();

    let report = catalog::index(&cli.data, cli.index_policy())
        .await
        .with_context(|| format!("cannot index {}", cli.data.display()))?;
    let app = Arc::new(App::new(Arc::new(report.catalog))?);

    let server = Server::bind(cli.server_config()).await?;
    server
        .serve(app, async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupt received"),
                Err(err) => {
                    warn!(error = %err, "cannot watch for interrupts, running until killed");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
}
