//! Server configuration
//!
//! Defaults, optionally overlaid by a TOML file, then by environment variables.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Seed for the mock data generator. Absent means seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_exception_count")]
    pub exception_count: usize,

    #[serde(default = "default_event_count")]
    pub event_count: usize,

    #[serde(default = "default_comparison_count")]
    pub comparison_count: usize,

    /// How many exceptions the dashboard lists under "recent".
    #[serde(default = "default_recent_exception_limit")]
    pub recent_exception_limit: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_exception_count() -> usize {
    30
}

fn default_event_count() -> usize {
    24
}

fn default_comparison_count() -> usize {
    20
}

fn default_recent_exception_limit() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            seed: None,
            exception_count: default_exception_count(),
            event_count: default_event_count(),
            comparison_count: default_comparison_count(),
            recent_exception_limit: default_recent_exception_limit(),
        }
    }
}

impl ServerConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply `BIND_ADDR`, `PORT` and `MOCK_SEED` on top of the current values.
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(addr) = std::env::var("BIND_ADDR").ok().filter(|v| !v.trim().is_empty()) {
            self.bind_addr = addr;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Some(seed) = std::env::var("MOCK_SEED").ok().and_then(|v| v.parse().ok()) {
            self.seed = Some(seed);
        }
        self
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind_addr, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.exception_count, 30);
        assert_eq!(config.recent_exception_limit, 10);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 8088\nseed = 42").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.event_count, 24);
        assert_eq!(config.bind_addr, "0.0.0.0");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(ServerConfig::load("/nonexistent/quality-desk.toml").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 9000,
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 9000);

        let bad = ServerConfig {
            bind_addr: "not an address".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }
}
