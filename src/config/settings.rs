//! Configuration settings for the civic agenda service.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::directory::Establishment;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub scheduling: SchedulingConfig,
    /// Establishments known to the display directory.
    pub establishments: Vec<Establishment>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("civic-agenda.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("civic-agenda/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".civic-agenda/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackendType::File && self.storage.data_dir.is_empty() {
            return Err(ConfigError::MissingField("storage.data_dir".to_string()).into());
        }
        if self.scheduling.max_title_length == 0 {
            return Err(
                ConfigError::Invalid("scheduling.max_title_length must be > 0".to_string()).into(),
            );
        }
        if self.scheduling.max_range_days < 1 {
            return Err(
                ConfigError::Invalid("scheduling.max_range_days must be >= 1".to_string()).into(),
            );
        }
        if self.scheduling.default_range_days < 1
            || self.scheduling.default_range_days > self.scheduling.max_range_days
        {
            return Err(ConfigError::Invalid(
                "scheduling.default_range_days must be between 1 and max_range_days".to_string(),
            )
            .into());
        }
        if !self.api.prefix.is_empty() && !self.api.prefix.starts_with('/') {
            return Err(ConfigError::Invalid("api.prefix must start with '/'".to_string()).into());
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// HTTP port.
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            http_port: 8080,
        }
    }
}

/// REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API prefix (e.g., "/api/v1").
    pub prefix: String,
    /// Enable permissive CORS.
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api/v1".to_string(),
            enable_cors: true,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend type: "memory" or "file"
    pub backend: StorageBackendType,
    /// Data directory for file storage
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::File,
            data_dir: "~/.local/share/civic-agenda".to_string(),
        }
    }
}

impl StorageConfig {
    /// Expand the data directory path.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::tilde(&self.data_dir);
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

/// Storage backend type enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendType {
    Memory,
    File,
}

/// Scheduling engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Maximum activity title length in characters.
    pub max_title_length: usize,
    /// Widest occurrence query accepted, in days.
    pub max_range_days: i64,
    /// Range used when a caller gives only a start date.
    pub default_range_days: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_title_length: 255,
            max_range_days: 366,
            default_range_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgendaError;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.storage.backend, StorageBackendType::File);
        assert_eq!(config.scheduling.max_title_length, 255);
        assert_eq!(config.api.prefix, "/api/v1");
        assert!(config.establishments.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
http_port = 9000

[storage]
backend = "memory"

[scheduling]
max_title_length = 80
max_range_days = 62

[[establishments]]
id = "est-1"
name = "Maison de quartier Nord"
sector = "Nord"
"#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.server.http_port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackendType::Memory);
        assert_eq!(config.scheduling.max_title_length, 80);
        assert_eq!(config.scheduling.max_range_days, 62);
        assert_eq!(config.scheduling.default_range_days, 7);
        assert_eq!(config.establishments.len(), 1);
        assert_eq!(config.establishments[0].sector.as_deref(), Some("Nord"));
    }

    #[test]
    fn test_invalid_config() {
        let err = Config::from_str("[scheduling]\nmax_title_length = 0\n").unwrap_err();
        assert!(matches!(err, AgendaError::Config(ConfigError::Invalid(_))));

        let err = Config::from_str("[scheduling]\nmax_range_days = 5\ndefault_range_days = 7\n")
            .unwrap_err();
        assert!(matches!(err, AgendaError::Config(ConfigError::Invalid(_))));

        let err = Config::from_str("[storage]\nbackend = \"file\"\ndata_dir = \"\"\n").unwrap_err();
        assert!(matches!(err, AgendaError::Config(ConfigError::MissingField(_))));

        let err = Config::from_str("[storage]\nbackend = \"postgres\"\n").unwrap_err();
        assert!(matches!(err, AgendaError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_data_dir_expansion() {
        let config = StorageConfig {
            backend: StorageBackendType::File,
            data_dir: "/tmp/civic-agenda".to_string(),
        };
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/civic-agenda"));
    }
}
