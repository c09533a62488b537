/// Configuration management for the moderation service
use crate::error::{ModError, ModResult};
use crate::moderation::StrikePolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub moderation: ModerationConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret used to verify actor access tokens
    pub jwt_secret: String,
}

/// Longest accepted strike window, in days
pub const MAX_STRIKE_WINDOW_DAYS: i64 = 36_500;

/// Strike escalation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub strike_window_days: i64,
    pub strike_threshold: i64,
}

impl ModerationConfig {
    pub fn policy(&self) -> StrikePolicy {
        StrikePolicy {
            window: chrono::Duration::days(self.strike_window_days.clamp(1, MAX_STRIKE_WINDOW_DAYS)),
            threshold: self.strike_threshold,
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        let policy = StrikePolicy::default();
        Self {
            strike_window_days: policy.window.num_days(),
            strike_threshold: policy.threshold,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ModResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("MOD_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("MOD_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ModError::Validation("Invalid port number".to_string()))?;

        let database = env::var("MOD_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/moderation.sqlite"));
        let max_connections = env::var("MOD_DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let jwt_secret = env::var("MOD_JWT_SECRET")
            .map_err(|_| ModError::Validation("JWT secret required".to_string()))?;

        let defaults = ModerationConfig::default();
        let strike_window_days = env::var("MOD_STRIKE_WINDOW_DAYS")
            .ok()
            .map(|v| {
                v.parse()
                    .map_err(|_| ModError::Validation(format!("Invalid strike window: {}", v)))
            })
            .transpose()?
            .unwrap_or(defaults.strike_window_days);
        let strike_threshold = env::var("MOD_STRIKE_THRESHOLD")
            .ok()
            .map(|v| {
                v.parse()
                    .map_err(|_| ModError::Validation(format!("Invalid strike threshold: {}", v)))
            })
            .transpose()?
            .unwrap_or(defaults.strike_threshold);

        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let json = env::var("MOD_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig {
                database,
                max_connections,
            },
            authentication: AuthConfig { jwt_secret },
            moderation: ModerationConfig {
                strike_window_days,
                strike_threshold,
            },
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ModResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ModError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ModError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(ModError::Validation(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        if self.moderation.strike_window_days < 1 || self.moderation.strike_threshold < 1 {
            return Err(ModError::Validation(
                "Strike window and threshold must be positive".to_string(),
            ));
        }

        if self.moderation.strike_window_days > MAX_STRIKE_WINDOW_DAYS {
            return Err(ModError::Validation(format!(
                "Strike window cannot exceed {} days",
                MAX_STRIKE_WINDOW_DAYS
            )));
        }

        Ok(())
    }
}
