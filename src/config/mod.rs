// src/config/mod.rs
pub mod env;
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    parse_config(path, &contents)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(contents).context("Failed to parse JSON config")?,
    };
    Ok(config)
}

/// File values (when a path is given) overlaid with the process environment.
pub async fn resolve(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config(path).await?,
        None => Config::default(),
    };
    env::apply_env(&mut config, env::process_env);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = "backend:\n  port: 9100\nproxy:\n  change_origin: false\nmetrics:\n  enabled: true\n";
        let config = parse_config(Path::new("dev.yaml"), yaml).unwrap();
        assert_eq!(config.backend.port, 9100);
        assert_eq!(config.backend.host, "127.0.0.1");
        assert!(!config.proxy.change_origin);
        assert_eq!(config.proxy.prefix, "/api");
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.path, "/__metrics");
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"frontend": {"port": 3001, "static_dir": "dist"}, "client": {"timeout_ms": 500}}"#;
        let config = parse_config(Path::new("dev.json"), json).unwrap();
        assert_eq!(config.frontend.port, 3001);
        assert_eq!(
            config.frontend.static_dir.as_deref(),
            Some(Path::new("dist"))
        );
        assert_eq!(config.client.timeout_ms, 500);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config =
            parse_config(Path::new("dev.yml"), "backend:\n  host: 10.1.1.1\n").unwrap();
        env::apply_env(&mut config, |key| {
            (key == env::BACKEND_HOST).then(|| "10.0.0.5".to_string())
        });
        assert_eq!(config.backend.origin(), "http://10.0.0.5:8000");
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let err = load_config("/nonexistent/intuipilot-dev.yaml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
