mod cli;
mod config;
mod file;
mod oracle;
mod search;
mod server;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filesage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI and execute command
    cli::run().await
}
