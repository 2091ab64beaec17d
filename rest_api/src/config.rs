// rest_api/src/config.rs

use std::env;

use anyhow::{Context, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATA_DIRECTORY: &str = "patient_data";

/// Represents the configuration for the REST API server itself.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path handed to the sled store, the stand-in for a database
    /// connection string.
    pub data_directory: String,
}

/// Loads the server configuration from the environment (`HOST`, `PORT`,
/// `DATA_DIRECTORY`), falling back to defaults for anything unset. A `.env`
/// file loaded by the binary feeds the same variables.
pub fn load_server_config() -> Result<ServerConfig> {
    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = match env::var("PORT") {
        Ok(raw) => raw
            .parse::<u16>()
            .context(format!("Invalid PORT value: {}", raw))?,
        Err(_) => DEFAULT_PORT,
    };
    let data_directory =
        env::var("DATA_DIRECTORY").unwrap_or_else(|_| DEFAULT_DATA_DIRECTORY.to_string());

    Ok(ServerConfig {
        host,
        port,
        data_directory,
    })
}
