//! HTTP API server configuration

use serde::{Deserialize, Serialize};

/// HTTP control surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address for the API server (e.g. "127.0.0.1:8080")
    pub listen_addr: String,
    /// Enable CORS for browser-based clients
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            cors_enabled: false,
        }
    }
}
