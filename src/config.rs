//! Configuration loading and management.
//!
//! Values are layered, later wins:
//! 1. YAML file (`--config <path>` or `task-manager.yaml` in the working directory)
//! 2. Environment variables (`DATABASE_URL` or `MONGODB_URI`, `HOST`, `PORT`)
//! 3. CLI flags (applied by the binary)

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "task-manager.yaml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Database configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `sqlite://data/tasks.db`. Required.
    #[serde(default)]
    pub url: Option<String>,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from an explicit path, or the default file if present, then
    /// apply environment overrides.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").or_else(|| lookup("MONGODB_URI")) {
            self.database.url = Some(url);
        }

        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value '{}'", port))?;
        }

        Ok(())
    }

    /// The database URL, or an error if none was configured.
    pub fn database_url(&self) -> Result<&str> {
        self.database
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("No database configured: set DATABASE_URL, pass --database, or add database.url to the config file")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert!(config.database.url.is_none());
        assert!(config.database_url().is_err());
    }

    #[test]
    fn test_yaml_partial_sections_use_defaults() {
        let config: Config = serde_yaml::from_str("server:\n  port: 8080\n").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: Config =
            serde_yaml::from_str("database:\n  url: sqlite://file.db\n").unwrap();
        let vars = env(&[("DATABASE_URL", "sqlite::memory:"), ("PORT", "7000")]);
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.database_url().unwrap(), "sqlite::memory:");
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_mongodb_uri_is_accepted_as_fallback() {
        let mut config = Config::default();
        let vars = env(&[("MONGODB_URI", "tasks.db")]);
        config.apply_env(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.database_url().unwrap(), "tasks.db");
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let mut config = Config::default();
        let vars = env(&[("PORT", "not-a-port")]);
        assert!(config.apply_env(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  host: 127.0.0.1\n  port: 9000\ndatabase:\n  url: sqlite://tasks.db\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database_url().unwrap(), "sqlite://tasks.db");
    }
}
