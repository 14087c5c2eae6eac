use std::path::PathBuf;

use nbrelay_core::images::{PredefinedImage, DEFAULT_DOCKER_IMAGE};
use nbrelay_core::url::normalize_url;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
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
    /// Public base URL of this service, normalized. Embedded in job
    /// documents so the execution backend can reach the callback endpoints.
    pub url_root: String,
    /// Directory where uploaded notebooks and their results are stored.
    pub notebook_dir: PathBuf,
    /// Web session lifetime in days (default: `30`).
    pub session_expiry_days: i64,
    /// Docker images users may pick by name.
    pub predefined_images: Vec<PredefinedImage>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `URL_ROOT`             | `http://localhost:3000`    |
    /// | `NOTEBOOK_DIR`         | `./notebooks`              |
    /// | `SESSION_EXPIRY_DAYS`  | `30`                       |
    /// | `PREDEFINED_IMAGES`    | papermill base image only  |
    ///
    /// `PREDEFINED_IMAGES` is a JSON array of `{name, description, url}`
    /// objects.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        // Normalized so callback URLs can be built by plain concatenation.
        let url_root = normalize_url(
            &std::env::var("URL_ROOT").unwrap_or_else(|_| "http://localhost:3000".into()),
        );

        let notebook_dir =
            PathBuf::from(std::env::var("NOTEBOOK_DIR").unwrap_or_else(|_| "./notebooks".into()));

        let session_expiry_days: i64 = std::env::var("SESSION_EXPIRY_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SESSION_EXPIRY_DAYS must be a valid i64");

        let predefined_images = match std::env::var("PREDEFINED_IMAGES") {
            Ok(raw) => serde_json::from_str(&raw).expect("PREDEFINED_IMAGES must be a JSON array"),
            Err(_) => default_predefined_images(),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            url_root,
            notebook_dir,
            session_expiry_days,
            predefined_images,
        }
    }
}

/// Image catalog used when `PREDEFINED_IMAGES` is not set.
fn default_predefined_images() -> Vec<PredefinedImage> {
    vec![PredefinedImage {
        name: "base".into(),
        description: "Python 3 with papermill preinstalled".into(),
        url: DEFAULT_DOCKER_IMAGE.into(),
    }]
}
