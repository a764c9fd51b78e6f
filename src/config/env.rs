// src/config/env.rs
// Environment overlay for the dev server configuration.
use super::models::Config;
use std::path::PathBuf;
use tracing::warn;

/// Client base path baked in at build time, `/api` when `API_BASE` is unset.
pub const DEFAULT_API_BASE: &str = match option_env!("API_BASE") {
    Some(base) => base,
    None => "/api",
};

pub const BACKEND_HOST: &str = "BACKEND_HOST";
pub const BACKEND_PORT: &str = "BACKEND_PORT";
pub const BACKEND_ORIGIN: &str = "BACKEND_ORIGIN";
pub const FRONTEND_HOST: &str = "FRONTEND_HOST";
pub const FRONTEND_PORT: &str = "FRONTEND_PORT";
pub const PORT: &str = "PORT";
pub const API_BASE: &str = "API_BASE";
pub const STATIC_DIR: &str = "STATIC_DIR";

/// Reads the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Overlays environment values onto `config`. Empty values count as unset.
pub fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(host) = get(BACKEND_HOST) {
        config.backend.host = host;
    }
    if let Some(raw) = get(BACKEND_PORT) {
        match raw.trim().parse::<u16>() {
            Ok(port) => config.backend.port = port,
            Err(_) => warn!(
                value = %raw,
                "ignoring non-numeric {}, keeping {}",
                BACKEND_PORT,
                config.backend.port
            ),
        }
    }
    if let Some(origin) = get(BACKEND_ORIGIN) {
        config.backend.origin = Some(origin);
    }

    if let Some(host) = get(FRONTEND_HOST) {
        config.frontend.host = host;
    }
    // FRONTEND_PORT, then PORT, then whatever the file or default said.
    if let Some(port) = [FRONTEND_PORT, PORT]
        .iter()
        .filter_map(|key| get(*key))
        .find_map(|raw| raw.trim().parse::<u16>().ok())
    {
        config.frontend.port = port;
    }
    if let Some(dir) = get(STATIC_DIR) {
        config.frontend.static_dir = Some(PathBuf::from(dir));
    }

    if let Some(base) = get(API_BASE) {
        config.client.api_base = base;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = Config::default();
        apply_env(&mut config, |key| vars.get(key).cloned());
        config
    }

    #[test]
    fn test_defaults_without_env() {
        let config = resolve(&[]);
        assert_eq!(config.backend.origin(), "http://127.0.0.1:8000");
        assert_eq!(config.frontend.host, "127.0.0.1");
        assert_eq!(config.frontend.port, 5173);
    }

    #[test]
    fn test_host_and_port_compose_origin() {
        let config = resolve(&[(BACKEND_HOST, "10.0.0.5"), (BACKEND_PORT, "9000")]);
        assert_eq!(config.backend.origin(), "http://10.0.0.5:9000");
    }

    #[test]
    fn test_origin_override_is_verbatim() {
        let config = resolve(&[
            (BACKEND_HOST, "10.0.0.5"),
            (BACKEND_PORT, "9000"),
            (BACKEND_ORIGIN, "https://api.example.com"),
        ]);
        assert_eq!(config.backend.origin(), "https://api.example.com");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = resolve(&[(BACKEND_HOST, ""), (BACKEND_ORIGIN, "  ")]);
        assert_eq!(config.backend.origin(), "http://127.0.0.1:8000");
    }

    #[test]
    fn test_frontend_port_fallback_chain() {
        assert_eq!(resolve(&[(PORT, "3000")]).frontend.port, 3000);
        assert_eq!(
            resolve(&[(FRONTEND_PORT, "4000"), (PORT, "3000")]).frontend.port,
            4000
        );
        assert_eq!(
            resolve(&[(FRONTEND_PORT, "abc"), (PORT, "3000")]).frontend.port,
            3000
        );
        assert_eq!(resolve(&[(FRONTEND_PORT, "abc")]).frontend.port, 5173);
    }

    #[test]
    fn test_bad_backend_port_keeps_default() {
        let config = resolve(&[(BACKEND_PORT, "eighty")]);
        assert_eq!(config.backend.port, 8000);
    }

    #[test]
    fn test_api_base_override() {
        let config = resolve(&[(API_BASE, "https://api.example.com/v2")]);
        assert_eq!(config.client.api_base, "https://api.example.com/v2");
    }
}
