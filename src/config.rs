use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // REST backend
    pub api_base_url: String,
    pub api_timeout_seconds: u64,

    // Local persistence
    pub storage_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if exists

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .map_err(|_| ConfigError::Missing("API_BASE_URL"))?,
            api_timeout_seconds: env::var("API_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("API_TIMEOUT_SECONDS"))?,
            storage_dir: env::var("STORAGE_DIR")
                .unwrap_or_else(|_| ".foryou-estate".to_string())
                .into(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid environment variable: {0}")]
    Invalid(&'static str),
}
