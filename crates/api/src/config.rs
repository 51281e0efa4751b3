use std::time::Duration;

use callboard_core::import::{DELAY_BETWEEN_BATCHES_MS, MAX_BATCH_SIZE};
use callboard_pipeline::ImportSettings;

/// Default upload body limit: 50 MiB.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Largest accepted request body in bytes (default: 50 MiB).
    pub max_upload_bytes: usize,
    /// Batch size and pacing for spreadsheet imports.
    pub import: ImportSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `MAX_UPLOAD_BYTES`      | `52428800`              |
    /// | `IMPORT_BATCH_SIZE`     | `50`                    |
    /// | `IMPORT_BATCH_DELAY_MS` | `1000`                  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", 3000).expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 =
            env_or("REQUEST_TIMEOUT_SECS", 30).expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let batch_size: usize = env_or("IMPORT_BATCH_SIZE", MAX_BATCH_SIZE)
            .expect("IMPORT_BATCH_SIZE must be a valid usize");

        let batch_delay_ms: u64 = env_or("IMPORT_BATCH_DELAY_MS", DELAY_BETWEEN_BATCHES_MS)
            .expect("IMPORT_BATCH_DELAY_MS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes,
            import: ImportSettings::new(batch_size, Duration::from_millis(batch_delay_ms)),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, T::Err> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse(),
        Err(_) => Ok(default),
    }
}
