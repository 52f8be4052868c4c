//! Configuration management for Querychat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{QuerychatError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Querychat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote chat service settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Where the bearer token is persisted between runs
    #[serde(default)]
    pub auth: AuthConfig,
    /// Terminal rendering settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Remote chat service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to (e.g. `http://host/api`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Database questions are asked against (e.g. `raw_database`); the
    /// service picks its default when unset
    #[serde(default)]
    pub database_type: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            database_type: None,
        }
    }
}

/// Credential backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// OS native keyring
    #[default]
    Keyring,
    /// JSON file in the user data directory (or `credentials_path`)
    File,
}

/// Credential persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Backend used to persist the session token
    #[serde(default)]
    pub store: CredentialBackend,

    /// Explicit path for the file backend
    #[serde(default)]
    pub credentials_path: Option<String>,
}

/// Terminal rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Maximum number of result rows printed per reply
    #[serde(default = "default_max_table_rows")]
    pub max_table_rows: usize,

    /// Print the generated SQL above results
    #[serde(default = "default_true")]
    pub show_sql: bool,

    /// Print latency and execution time under replies
    #[serde(default = "default_true")]
    pub show_timing: bool,
}

fn default_max_table_rows() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_table_rows: default_max_table_rows(),
            show_sql: true,
            show_timing: true,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QuerychatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| QuerychatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("QUERYCHAT_API_URL") {
            tracing::debug!(base_url = %base_url, "Env override: QUERYCHAT_API_URL");
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("QUERYCHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid QUERYCHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(database) = std::env::var("QUERYCHAT_DATABASE") {
            tracing::debug!(database = %database, "Env override: QUERYCHAT_DATABASE");
            self.api.database_type = Some(database);
        }

        if let Ok(store) = std::env::var("QUERYCHAT_AUTH_STORE") {
            self.auth.store = match store.to_lowercase().as_str() {
                "keyring" => CredentialBackend::Keyring,
                "file" => CredentialBackend::File,
                _ => {
                    tracing::warn!("Invalid credential store: {}, using default", store);
                    CredentialBackend::default()
                }
            };
        }

        if let Ok(path) = std::env::var("QUERYCHAT_CREDENTIALS_PATH") {
            self.auth.credentials_path = Some(path);
        }

        if let Ok(rows) = std::env::var("QUERYCHAT_MAX_TABLE_ROWS") {
            if let Ok(value) = rows.parse() {
                self.display.max_table_rows = value;
            } else {
                tracing::warn!("Invalid QUERYCHAT_MAX_TABLE_ROWS: {}", rows);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            self.api.base_url = api_url.clone();
        }
        if let Some(database) = cli.command.database() {
            self.api.database_type = Some(database.to_string());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not an absolute http(s) URL or a
    /// numeric limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(QuerychatError::Config("api.base_url cannot be empty".to_string()).into());
        }

        let parsed = url::Url::parse(&self.api.base_url).map_err(|e| {
            QuerychatError::Config(format!(
                "Invalid api.base_url {}: {}",
                self.api.base_url, e
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(QuerychatError::Config(format!(
                "api.base_url must use http or https, got {}",
                parsed.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(QuerychatError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if matches!(&self.api.database_type, Some(db) if db.trim().is_empty()) {
            return Err(
                QuerychatError::Config("api.database_type cannot be empty".to_string()).into(),
            );
        }

        if self.display.max_table_rows == 0 {
            return Err(QuerychatError::Config(
                "display.max_table_rows must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.timeout_seconds, 120);
        assert_eq!(config.auth.store, CredentialBackend::Keyring);
        assert_eq!(config.display.max_table_rows, 50);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_bad_urls() {
        let mut config = Config::default();
        config.api.base_url = String::new();
        assert!(config.validate().is_err());

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_limits() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.display.max_table_rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_blank_database() {
        let mut config = Config::default();
        config.api.database_type = Some("  ".to_string());
        assert!(config.validate().is_err());

        config.api.database_type = Some("agg_database".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: https://sql.example.com/api
  timeout_seconds: 30
  database_type: agg_database
auth:
  store: file
  credentials_path: /tmp/creds.json
display:
  max_table_rows: 10
  show_sql: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://sql.example.com/api");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.api.database_type.as_deref(), Some("agg_database"));
        assert_eq!(config.auth.store, CredentialBackend::File);
        assert_eq!(
            config.auth.credentials_path.as_deref(),
            Some("/tmp/creds.json")
        );
        assert_eq!(config.display.max_table_rows, 10);
        assert!(!config.display.show_sql);
        assert!(config.display.show_timing);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("display:\n  show_timing: false\n").unwrap();
        assert_eq!(config.api.base_url, default_base_url());
        assert!(!config.display.show_timing);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = crate::cli::Cli::default();
        let config = Config::load("/nonexistent/querychat.yaml", &cli).unwrap();
        assert_eq!(config.api.timeout_seconds, 120);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_fields() {
        std::env::set_var("QUERYCHAT_API_URL", "https://env.example.com");
        std::env::set_var("QUERYCHAT_AUTH_STORE", "file");
        std::env::set_var("QUERYCHAT_MAX_TABLE_ROWS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("QUERYCHAT_API_URL");
        std::env::remove_var("QUERYCHAT_AUTH_STORE");
        std::env::remove_var("QUERYCHAT_MAX_TABLE_ROWS");

        assert_eq!(config.api.base_url, "https://env.example.com");
        assert_eq!(config.auth.store, CredentialBackend::File);
        assert_eq!(config.display.max_table_rows, 50);
    }

    #[test]
    #[serial]
    fn test_cli_api_url_overrides_env() {
        std::env::set_var("QUERYCHAT_API_URL", "https://env.example.com");
        let mut cli = crate::cli::Cli::default();
        cli.api_url = Some("https://cli.example.com".to_string());
        let config = Config::load("/nonexistent/querychat.yaml", &cli).unwrap();
        std::env::remove_var("QUERYCHAT_API_URL");

        assert_eq!(config.api.base_url, "https://cli.example.com");
    }

    #[test]
    #[serial]
    fn test_database_flag_overrides_env() {
        std::env::set_var("QUERYCHAT_DATABASE", "raw_database");
        let cli = crate::cli::Cli::try_parse_from([
            "querychat",
            "ask",
            "total sales?",
            "--database",
            "agg_database",
        ])
        .unwrap();
        let config = Config::load("/nonexistent/querychat.yaml", &cli).unwrap();
        let plain = Config::load("/nonexistent/querychat.yaml", &crate::cli::Cli::default()).unwrap();
        std::env::remove_var("QUERYCHAT_DATABASE");

        assert_eq!(config.api.database_type.as_deref(), Some("agg_database"));
        assert_eq!(plain.api.database_type.as_deref(), Some("raw_database"));
    }
}
