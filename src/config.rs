//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Development server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the built shell assets
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5173
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            assets_dir: default_assets_dir(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Planner backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Origin the proxied prefixes are forwarded to
    #[serde(default = "default_backend_url")]
    pub url: String,
}

fn default_backend_url() -> String {
    "http://localhost:8501".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("planner-shell").join("config.toml")),
            Some(PathBuf::from("/etc/planner-shell/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("PLANNER_SHELL_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PLANNER_SHELL_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(assets_dir) = std::env::var("PLANNER_SHELL_ASSETS_DIR") {
            self.server.assets_dir = PathBuf::from(assets_dir);
        }

        if let Ok(url) = std::env::var("PLANNER_SHELL_BACKEND_URL") {
            self.backend.url = url;
        }

        if let Ok(level) = std::env::var("PLANNER_SHELL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("PLANNER_SHELL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Planner Shell Configuration
#
# Environment variables override these settings:
# - PLANNER_SHELL_HOST
# - PLANNER_SHELL_PORT
# - PLANNER_SHELL_ASSETS_DIR
# - PLANNER_SHELL_BACKEND_URL
# - PLANNER_SHELL_LOG_LEVEL
# - PLANNER_SHELL_LOG_FORMAT

[server]
# Dev server host
host = "127.0.0.1"

# Dev server port
port = 5173

# Directory holding the built shell assets
assets_dir = "dist"

[backend]
# Planner backend origin; the /streamlit, /_stcore, /static, /vendor and
# /component prefixes are forwarded here
url = "http://localhost:8501"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.addr(), "127.0.0.1:5173");
        assert_eq!(config.backend.url, "http://localhost:8501");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 4000

            [backend]
            url = "http://localhost:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 4000);
        // Unspecified fields fall back to defaults
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.backend.url, "http://localhost:9000");
    }

    #[test]
    fn test_generated_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 5173);
        assert_eq!(config.server.assets_dir, PathBuf::from("dist"));
    }
}
