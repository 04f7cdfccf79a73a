//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.

use std::env;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port
    pub port: u16,

    /// SQLite database file path
    pub database_path: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT token lifetime in seconds
    pub jwt_lifetime_secs: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            port: env::var("CHAI_PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHAI_PORT".to_string()))?,

            database_path: env::var("CHAI_DATABASE_PATH")
                .unwrap_or_else(|_| "./chai_pos.db".to_string()),

            jwt_secret: env::var("CHAI_JWT_SECRET").unwrap_or_else(|_| {
                // In production, this MUST be set via environment variable
                "chai-pos-dev-secret-change-in-production".to_string()
            }),

            jwt_lifetime_secs: env::var("CHAI_JWT_LIFETIME_SECS")
                .unwrap_or_else(|_| "86400".to_string()) // 24 hours
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHAI_JWT_LIFETIME_SECS".to_string()))?,
        };

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Only checks the fallbacks that are safe to assert regardless of
        // the ambient environment
        let config = ServerConfig::load().unwrap();
        assert!(config.port > 0);
        assert!(config.jwt_lifetime_secs > 0);
    }
}
