//! Configuration management for DocSign Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub convert: ConvertConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit; data-URL payloads of 3x exports are large
    pub body_limit_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of the per-customer upload directories, served at `/uploads`
    pub upload_base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    /// Directory holding the bundled `bin/` and `poppler/` binaries
    pub app_root: PathBuf,
    /// Upper bound for each converter attempt
    pub timeout_secs: u64,
}

impl ConvertConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ServerConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// A variable was set but could not be parsed
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                body_limit_mb: 200,
            },
            storage: StorageConfig {
                upload_base_dir: PathBuf::from("./uploads"),
            },
            convert: ConvertConfig {
                app_root: PathBuf::from("."),
                timeout_secs: 60,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                body_limit_mb: parse_var("BODY_LIMIT_MB", defaults.server.body_limit_mb)?,
            },
            storage: StorageConfig {
                upload_base_dir: env::var("UPLOAD_BASE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_base_dir),
            },
            convert: ConvertConfig {
                app_root: env::var("APP_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.convert.app_root),
                timeout_secs: parse_var("CONVERT_TIMEOUT_SECS", defaults.convert.timeout_secs)?,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.body_limit_bytes(), 200 * 1024 * 1024);
        assert_eq!(config.storage.upload_base_dir, PathBuf::from("./uploads"));
        assert_eq!(config.convert.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        // Unique key so parallel tests don't race on the environment
        env::set_var("DOCSIGN_TEST_PORT_GARBAGE", "not-a-port");
        let result: Result<u16, _> = parse_var("DOCSIGN_TEST_PORT_GARBAGE", 3000);
        let err = result.unwrap_err();
        assert_eq!(err.key, "DOCSIGN_TEST_PORT_GARBAGE");
        assert_eq!(err.value, "not-a-port");

        let missing: u16 = parse_var("DOCSIGN_TEST_PORT_MISSING", 3000).unwrap();
        assert_eq!(missing, 3000);
    }
}
