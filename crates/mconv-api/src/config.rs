//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default upload ceiling: 500 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_upload_bytes: usize,
    /// Where uploads are stored until cleanup
    pub upload_dir: PathBuf,
    /// Where outputs are written and served from
    pub output_dir: PathBuf,
    /// Delay between a job's outcome and removal of its files
    pub cleanup_grace: Duration,
    /// Environment (development/production)
    pub environment: String,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_dir: PathBuf::from("./uploads"),
            output_dir: PathBuf::from("./outputs"),
            cleanup_grace: Duration::from_secs(300),
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup; unset or malformed values keep their defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: var("API_HOST").unwrap_or(defaults.host),
            port: parsed(&var, "API_PORT").unwrap_or(defaults.port),
            cors_origins: var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_upload_bytes: parsed(&var, "MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            cleanup_grace: parsed(&var, "CLEANUP_GRACE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_grace),
            environment: var("ENVIRONMENT").unwrap_or(defaults.environment),
            metrics_enabled: var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    var(key).and_then(|s| s.trim().parse().ok())
}
