use std::path::PathBuf;

use serde::Deserialize;

use bboard_core::config::Config;

/// Board service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Secret for session tokens and activation-link signatures.
    pub secret_key: String,
    /// TCP port to listen on (default 8000). Env var: `BOARD_PORT`.
    #[serde(default = "default_port")]
    pub board_port: u16,
    /// Public base URL used in activation links (no trailing slash).
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Directory for uploaded images, served under `/media/`.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// Directory served under `/static/`.
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,
    #[serde(default = "default_listings_per_page")]
    pub listings_per_page: u64,
    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Request body limit for multipart uploads.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Config for BoardConfig {}

impl BoardConfig {
    /// `site_url` without a trailing slash.
    pub fn site_url(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }
}

fn default_port() -> u16 {
    8000
}

fn default_site_url() -> String {
    "http://localhost:8000".to_owned()
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_static_root() -> PathBuf {
    PathBuf::from("./static")
}

fn default_listings_per_page() -> u64 {
    2
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
