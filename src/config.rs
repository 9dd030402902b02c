use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Secret used to sign and verify bearer tokens. Required outside development.
    pub jwt_secret: Option<String>,

    /// Lifetime of issued tokens, in days
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,

    /// Database URL. In-memory stores are used when absent.
    pub db_url: Option<String>,

    /// Reject websocket joins for rooms that were never created through the API
    #[serde(default)]
    pub enforce_room_registry: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub identity_cache_ttl_secs: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub doc_cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn identity_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_cache_ttl_secs)
    }

    pub fn doc_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.doc_cache_ttl_secs)
    }

    /// Make sure bearer tokens have a signing secret. Development falls back to
    /// a random per-process secret; any other environment must set `JWT_SECRET`.
    pub fn ensure_jwt_secret(&mut self) -> Result<(), ConfigError> {
        if self.jwt_secret.as_deref().is_some_and(|secret| !secret.is_empty()) {
            return Ok(());
        }
        if !self.is_development() {
            return Err(ConfigError::MissingJwtSecret(self.environment.clone()));
        }
        error!("❌ JWT_SECRET is not set, signing tokens with a random secret that dies with this process");
        self.jwt_secret = Some(Uuid::new_v4().simple().to_string());
        Ok(())
    }

    /// Configured CORS origins, empty when any origin is allowed
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            jwt_secret: None,
            token_ttl_days: default_token_ttl_days(),
            db_url: None,
            enforce_room_registry: false,
            identity_cache_ttl_secs: default_cache_ttl_secs(),
            doc_cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
    #[error("JWT_SECRET must be set when ENVIRONMENT is '{0}'")]
    MissingJwtSecret(String),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_token_ttl_days() -> i64 {
    7
}

fn default_cache_ttl_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_all_interfaces() {
        let config = Config::default();
        assert_eq!(config.server_address(), "0.0.0.0:5000");
        assert!(config.is_development());
        assert!(!config.enforce_room_registry);
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = Config {
            cors_origins: Some("http://a.test, http://b.test,,".to_string()),
            ..Config::default()
        };
        assert_eq!(config.allowed_origins(), vec!["http://a.test", "http://b.test"]);
        assert!(Config::default().allowed_origins().is_empty());
    }

    #[test]
    fn missing_jwt_secret_refuses_production() {
        let mut config = Config { environment: "production".to_string(), ..Config::default() };
        assert!(matches!(config.ensure_jwt_secret(), Err(ConfigError::MissingJwtSecret(_))));

        let mut config = Config {
            environment: "production".to_string(),
            jwt_secret: Some(String::new()),
            ..Config::default()
        };
        assert!(config.ensure_jwt_secret().is_err());
    }

    #[test]
    fn development_gets_a_random_secret_per_process() {
        let mut first = Config::default();
        let mut second = Config::default();
        first.ensure_jwt_secret().unwrap();
        second.ensure_jwt_secret().unwrap();

        let first = first.jwt_secret.unwrap();
        assert!(!first.is_empty());
        assert_ne!(Some(first), second.jwt_secret);
    }

    #[test]
    fn configured_secret_is_kept() {
        let mut config = Config {
            environment: "production".to_string(),
            jwt_secret: Some("s3cret".to_string()),
            ..Config::default()
        };
        config.ensure_jwt_secret().unwrap();
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
    }
}
