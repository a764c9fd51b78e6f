// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::env::DEFAULT_API_BASE;

pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BACKEND_PORT: u16 = 8000;
pub const DEFAULT_FRONTEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_FRONTEND_PORT: u16 = 5173;
pub const DEFAULT_PROXY_PREFIX: &str = "/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_PROXY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_METRICS_PATH: &str = "/__metrics";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub frontend: FrontendConfig,
    pub client: ClientConfig,
    pub proxy: ProxyConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    /// Explicit origin; wins over `host`/`port` when set.
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub host: String,
    pub port: u16,
    /// Built single-page assets served for every non-proxied path.
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Relative path (resolved against the front-end origin) or absolute URL.
    pub api_base: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub prefix: String,
    pub change_origin: bool,
    /// Upper bound on waiting for the backend's response head.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("proxy prefix must start with '/', got {0:?}")]
    InvalidPrefix(String),

    #[error("backend origin {origin:?} is not an absolute http(s) URL: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("{0} port must be non-zero")]
    ZeroPort(&'static str),

    #[error("{0} timeout must be non-zero")]
    ZeroTimeout(&'static str),

    #[error("metrics path must start with '/', got {0:?}")]
    InvalidMetricsPath(String),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BACKEND_HOST.to_string(),
            port: DEFAULT_BACKEND_PORT,
            origin: None,
        }
    }
}

impl BackendConfig {
    /// The origin requests are forwarded to.
    pub fn origin(&self) -> String {
        match &self.origin {
            Some(origin) => origin.clone(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FRONTEND_HOST.to_string(),
            port: DEFAULT_FRONTEND_PORT,
            static_dir: None,
        }
    }
}

impl FrontendConfig {
    pub fn origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PROXY_PREFIX.to_string(),
            change_origin: true,
            timeout_ms: DEFAULT_PROXY_TIMEOUT_MS,
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.proxy.prefix.starts_with('/') {
            return Err(ConfigError::InvalidPrefix(self.proxy.prefix.clone()));
        }

        let origin = self.backend.origin();
        match Url::parse(&origin) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(url) => {
                return Err(ConfigError::InvalidOrigin {
                    origin,
                    reason: format!("unsupported scheme {:?}", url.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::InvalidOrigin {
                    origin,
                    reason: e.to_string(),
                })
            }
        }

        if self.backend.origin.is_none() && self.backend.port == 0 {
            return Err(ConfigError::ZeroPort("backend"));
        }
        if self.frontend.port == 0 {
            return Err(ConfigError::ZeroPort("frontend"));
        }
        if self.client.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("client"));
        }
        if self.proxy.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("proxy"));
        }
        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(self.metrics.path.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.backend.origin(), "http://127.0.0.1:8000");
        assert_eq!(config.frontend.origin(), "http://127.0.0.1:5173");
        assert_eq!(config.proxy.prefix, "/api");
        assert!(config.proxy.change_origin);
        assert_eq!(config.proxy.timeout(), Duration::from_secs(30));
        assert_eq!(config.client.timeout(), Duration::from_millis(15_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_origin_wins() {
        let backend = BackendConfig {
            host: "10.0.0.5".to_string(),
            port: 9000,
            origin: Some("https://api.example.com".to_string()),
        };
        assert_eq!(backend.origin(), "https://api.example.com");
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let mut config = Config::default();
        config.proxy.prefix = "api".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPrefix(_))));

        config.proxy.prefix = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPrefix(_))));
    }

    #[test]
    fn test_rejects_non_http_origin() {
        let mut config = Config::default();
        config.backend.origin = Some("ftp://files.example.com".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOrigin { .. })));

        config.backend.origin = Some("not a url".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOrigin { .. })));
    }

    #[test]
    fn test_rejects_zero_frontend_port() {
        let mut config = Config::default();
        config.frontend.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPort("frontend"))));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.client.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout("client"))));

        let mut config = Config::default();
        config.proxy.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout("proxy"))));
    }
}
