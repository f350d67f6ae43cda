//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    DatabaseConfig, FileSettings, JwtConfig, LoggerSettings, OrdersConfig, ServerConfig,
    Settings, StorageBackend,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// Widest offsets in use by real time zones: UTC-12:00 and UTC+14:00
const OFFSET_RANGE_MINUTES: std::ops::RangeInclusive<i32> = -720..=840;

impl ServerConfig {
    /// Validate server configuration
    ///
    /// # Validation Rules
    /// - Port must be between 1 and 65535
    /// - Request timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Validate database configuration
    ///
    /// The URL is only checked for the postgres backend. Pool sizes and the
    /// query timeout are checked regardless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == StorageBackend::Postgres {
            if self.url.is_empty() {
                return Err(ConfigError::validation(
                    "database.url",
                    "Database URL is required. Please specify a valid database connection string.",
                ));
            }
            if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
                return Err(ConfigError::validation(
                    "database.url",
                    "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
                ));
            }
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::ValidationError {
                field: "database.min_connections".to_string(),
                message: format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            });
        }

        if self.query_timeout == 0 {
            return Err(ConfigError::validation(
                "database.query_timeout",
                "Query timeout must be greater than 0 milliseconds.",
            ));
        }

        Ok(())
    }
}

impl JwtConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.len() < 32 {
            return Err(ConfigError::validation(
                "jwt.secret",
                "JWT secret must be at least 32 characters.",
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(ConfigError::validation(
                "jwt.access_token_expiration",
                "Access token expiration must be positive.",
            ));
        }

        Ok(())
    }
}

impl OrdersConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !OFFSET_RANGE_MINUTES.contains(&self.utc_offset_minutes) {
            return Err(ConfigError::ValidationError {
                field: "orders.utc_offset_minutes".to_string(),
                message: format!(
                    "UTC offset {} is outside {}..={} minutes.",
                    self.utc_offset_minutes,
                    OFFSET_RANGE_MINUTES.start(),
                    OFFSET_RANGE_MINUTES.end()
                ),
            });
        }
        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - At least one output must be enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.jwt.validate()?;
        self.logger.validate()?;
        self.orders.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = "postgres://localhost/storefront".to_string();
        settings.jwt.secret = "0123456789abcdef0123456789abcdef".to_string();
        settings
    }

    fn failing_field(settings: &Settings) -> String {
        match settings.validate() {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_server_port_zero() {
        let mut settings = valid_settings();
        settings.server.port = 0;
        assert_eq!(failing_field(&settings), "server.port");
    }

    #[test]
    fn test_postgres_requires_url() {
        let mut settings = valid_settings();
        settings.database.url.clear();
        assert_eq!(failing_field(&settings), "database.url");

        settings.database.url = "mysql://localhost/db".to_string();
        assert_eq!(failing_field(&settings), "database.url");
    }

    #[test]
    fn test_memory_backend_needs_no_url() {
        let mut settings = valid_settings();
        settings.database.url.clear();
        settings.database.backend = StorageBackend::Memory;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_pool_bounds() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        settings.database.max_connections = 5;
        assert_eq!(failing_field(&settings), "database.min_connections");
    }

    #[test]
    fn test_zero_query_timeout() {
        let mut settings = valid_settings();
        settings.database.query_timeout = 0;
        assert_eq!(failing_field(&settings), "database.query_timeout");
    }

    #[test]
    fn test_short_jwt_secret() {
        let mut settings = valid_settings();
        settings.jwt.secret = "short".to_string();
        assert_eq!(failing_field(&settings), "jwt.secret");
    }

    #[test]
    fn test_offset_range() {
        let mut settings = valid_settings();
        settings.orders.utc_offset_minutes = 840;
        assert!(settings.validate().is_ok());
        settings.orders.utc_offset_minutes = 900;
        assert_eq!(failing_field(&settings), "orders.utc_offset_minutes");
    }

    #[test]
    fn test_logger_needs_an_output() {
        let mut settings = valid_settings();
        settings.logger.console.enabled = false;
        assert_eq!(failing_field(&settings), "logger");
    }

    #[test]
    fn test_logger_level() {
        let mut settings = valid_settings();
        settings.logger.level = "loud".to_string();
        assert_eq!(failing_field(&settings), "logger.level");
    }
}
