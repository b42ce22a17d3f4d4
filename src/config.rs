use anyhow::{Context, Result};
use chrono::Local;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::export::{CsvTransport, Transport, WebhookTransport};

/// Environment variable names - single source of truth
pub mod env_vars {
    /// SQLite database holding the entries
    pub const DB_PATH: &str = "THOUGHTS_DB";
    /// Directory for dated CSV exports
    pub const EXPORT_DIR: &str = "THOUGHTS_EXPORT_DIR";
    /// When set, exports are POSTed here instead of written as CSV
    pub const EXPORT_URL: &str = "THOUGHTS_EXPORT_URL";
    pub const EXPORT_TIMEOUT_SECS: &str = "THOUGHTS_EXPORT_TIMEOUT_SECS";
    pub const PORT: &str = "PORT";
}

/// Default values
pub mod defaults {
    pub const DB_PATH: &str = "thoughts.db";
    pub const EXPORT_DIR: &str = ".";
    pub const EXPORT_TIMEOUT_SECS: u64 = 30;
    pub const PORT: u16 = 3000;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub export_url: Option<String>,
    pub export_timeout: Duration,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(defaults::DB_PATH),
            export_dir: PathBuf::from(defaults::EXPORT_DIR),
            export_url: None,
            export_timeout: Duration::from_secs(defaults::EXPORT_TIMEOUT_SECS),
            port: defaults::PORT,
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(path) = get(env_vars::DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = get(env_vars::EXPORT_DIR) {
            config.export_dir = PathBuf::from(dir);
        }
        config.export_url = get(env_vars::EXPORT_URL);

        if let Some(secs) = get(env_vars::EXPORT_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", env_vars::EXPORT_TIMEOUT_SECS))?;
            config.export_timeout = Duration::from_secs(secs);
        }
        if let Some(port) = get(env_vars::PORT) {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number", env_vars::PORT))?;
        }

        Ok(config)
    }

    /// Webhook when a URL is configured, otherwise today's CSV file
    pub fn transport(&self) -> Result<Box<dyn Transport>> {
        match &self.export_url {
            Some(url) => Ok(Box::new(WebhookTransport::new(url.clone(), self.export_timeout)?)),
            None => Ok(Box::new(CsvTransport::dated_in(
                &self.export_dir,
                Local::now().date_naive(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.db_path, PathBuf::from("thoughts.db"));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("THOUGHTS_DB", "/var/lib/thoughts.db"),
            ("THOUGHTS_EXPORT_URL", "https://example.com/hook"),
            ("THOUGHTS_EXPORT_TIMEOUT_SECS", "5"),
            ("PORT", "8081"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/thoughts.db"));
        assert_eq!(config.export_url.as_deref(), Some("https://example.com/hook"));
        assert_eq!(config.export_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = Config::from_lookup(lookup(&[("THOUGHTS_EXPORT_URL", "  ")])).unwrap();
        assert_eq!(config.export_url, None);
    }

    #[test]
    fn test_bad_numbers_error() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("THOUGHTS_EXPORT_TIMEOUT_SECS", "-1")])).is_err());
    }

    #[test]
    fn test_transport_selection() {
        let csv = Config::default().transport().unwrap();
        assert!(csv.describe().starts_with("CSV "));

        let config = Config {
            export_url: Some("http://localhost:1/hook".to_string()),
            ..Config::default()
        };
        assert_eq!(config.transport().unwrap().describe(), "webhook http://localhost:1/hook");
    }
}
