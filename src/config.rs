use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Path of the bundled scan source image, relative to the working directory.
const DEFAULT_IMAGE_PATH: &str = "assets/line-scan-source.jpg";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind address (0.0.0.0 for LAN, 127.0.0.1 for localhost)
    pub bind_addr: String,
    /// Override path for the scan source image
    pub image_path: Option<PathBuf>,
    /// Bundled image tried when no override is set or the override fails
    pub default_image_path: PathBuf,
    /// Delay between row sends in the production loop
    pub line_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env::var("LINESCAN_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            bind_addr: env::var("LINESCAN_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            image_path: env::var("LINE_SCAN_IMAGE_PATH").ok().map(PathBuf::from),
            default_image_path: PathBuf::from(DEFAULT_IMAGE_PATH),
            line_interval: Duration::from_millis(
                env::var("LINE_SCAN_INTERVAL_MS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
            ),
        })
    }

    /// Get the full bind address (addr:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
}
