// ABOUTME: Logging configuration and structured event helpers for the Cragbook persistence core
// ABOUTME: Installs a tracing-subscriber with env filtering and json/pretty/compact output
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Structured logging
//!
//! Events use dotted field names (`auth.event`, `db.collection`, ...) so
//! that json output can be queried without parsing messages. Credentials
//! and password hashes are never logged.

use std::env;
use std::io;

use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::service_names;
use crate::errors::{AppError, AppResult};

/// Crates whose debug output drowns ours
const QUIET_TARGETS: [&str; 2] = ["sqlx", "sqlx::query"];

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-field human output
    Pretty,
    /// Single-line human output without targets
    Compact,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value, defaulting to pretty
    #[must_use]
    pub fn from_str_or_default(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Logging settings, read from the environment by the binary at start-up
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level directive when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Add source file and line to every event
    pub include_location: bool,
    /// Service name attached to the start-up event
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            service_name: service_names::CRAGBOOK_SERVER.into(),
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG`, `LOG_FORMAT`, `LOG_INCLUDE_LOCATION` and `SERVICE_NAME`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: env::var("RUST_LOG").unwrap_or(defaults.level),
            format: env::var("LOG_FORMAT")
                .map(|value| LogFormat::from_str_or_default(&value))
                .unwrap_or(defaults.format),
            include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
        }
    }

    /// Level filter with third-party noise capped at `warn`
    ///
    /// An explicit `RUST_LOG` wins over [`LoggingConfig::level`].
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let directive = env::var("RUST_LOG").unwrap_or_else(|_| self.level.clone());
        QUIET_TARGETS
            .iter()
            .filter_map(|target| format!("{target}=warn").parse().ok())
            .fold(EnvFilter::new(directive), EnvFilter::add_directive)
    }

    fn layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + 'static,
    {
        let base = fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_writer(io::stdout);
        match self.format {
            LogFormat::Json => base.json().boxed(),
            LogFormat::Pretty => base.boxed(),
            LogFormat::Compact => base.compact().with_target(false).boxed(),
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a global subscriber is already installed
    pub fn init(&self) -> AppResult<()> {
        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(self.layer())
            .try_init()
            .map_err(|e| AppError::config(format!("Failed to install logger: {e}")))?;

        info!(
            service.name = %self.service_name,
            service.version = env!("CARGO_PKG_VERSION"),
            log.level = %self.level,
            log.format = ?self.format,
            "logging initialised"
        );
        Ok(())
    }
}

/// Structured events shared by the session and account code
pub struct AppLogger;

impl AppLogger {
    /// Session lifecycle event; failures are logged at `warn`
    pub fn log_auth_event(subject: &str, event: &str, success: bool, details: Option<&str>) {
        let details = details.unwrap_or("");
        if success {
            info!(auth.subject = %subject, auth.event = %event, auth.details = details, "auth");
        } else {
            warn!(auth.subject = %subject, auth.event = %event, auth.details = details, "auth rejected");
        }
    }

    /// Bulk mutation with the number of affected documents
    pub fn log_database_operation(operation: &str, collection: &str, affected: u64) {
        info!(
            db.operation = %operation,
            db.collection = %collection,
            db.affected = affected,
            "database operation"
        );
    }

    /// Account-wide security change (revocations, deletions)
    pub fn log_security_event(event_type: &str, details: &str, user_id: Option<&str>) {
        warn!(
            security.event = %event_type,
            security.details = %details,
            user.id = user_id.unwrap_or("-"),
            "security event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str_or_default("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_str_or_default("fancy"), LogFormat::Pretty);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.service_name, service_names::CRAGBOOK_SERVER);
        assert_eq!(config.level, "info");
        assert!(!config.include_location);
    }
}
