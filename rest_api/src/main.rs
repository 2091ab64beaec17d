use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rest_api::{load_server_config, start_server};
use storage::SledPatientStore;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_server_config().context("Failed to load REST API configuration")?;

    let store = Arc::new(
        SledPatientStore::open(&config.data_directory).map_err(|e| {
            anyhow::anyhow!("Failed to open patient store at {}: {}", config.data_directory, e)
        })?,
    );
    info!("patient store ready at {}", config.data_directory);

    start_server(config, store.clone()).await?;

    // Flush once the listener has drained so nothing accepted before
    // shutdown is lost.
    store.flush().map_err(|e| anyhow::anyhow!("Failed to flush patient store: {}", e))?;
    Ok(())
}
