//! Configuration for linkpulse

mod crawl;
mod http;
mod logging;

pub use crawl::CrawlConfig;
pub use http::HttpConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for all requests and robots group matching
pub const DEFAULT_USER_AGENT: &str = "PulseLinkChecker/1.0 (+local)";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Crawl engine configuration
    #[serde(default)]
    pub crawl: CrawlConfig,
    /// HTTP API server configuration
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects every violation so the user can fix them in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.crawl.user_agent.trim().is_empty() {
            errors.push("crawl.user_agent must not be empty".to_string());
        }
        if self.crawl.global_concurrency == 0 {
            errors.push("crawl.global_concurrency must be positive".to_string());
        }
        if self.crawl.per_host_concurrency == 0 {
            errors.push("crawl.per_host_concurrency must be positive".to_string());
        }
        if self.crawl.page_delay_max_ms <= self.crawl.page_delay_min_ms {
            errors.push(
                "crawl.page_delay_max_ms must be greater than crawl.page_delay_min_ms".to_string(),
            );
        }
        if self.crawl.max_urls == 0 {
            errors.push("crawl.max_urls must be positive".to_string());
        }
        if self.crawl.max_depth_ceiling > 5 {
            errors.push("crawl.max_depth_ceiling must be <= 5".to_string());
        }
        if self.crawl.request_timeout_secs == 0 {
            errors.push("crawl.request_timeout_secs must be positive".to_string());
        }
        if self.http.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "http.listen_addr '{}' is not a valid socket address",
                self.http.listen_addr
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Invalid configuration:\n  - {}",
                errors.join("\n  - ")
            ))
        }
    }
}
