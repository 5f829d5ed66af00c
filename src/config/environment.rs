// ABOUTME: Environment-based server configuration loaded once at process start
// ABOUTME: Database backend, session signing secret, token lifetime and cookie policy
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Server configuration is read from environment variables only; there are no
//! configuration files.

use std::env;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::database::DatabaseConfig;
use crate::constants::session::{DEFAULT_BCRYPT_COST, DEFAULT_TOKEN_TTL_HOURS};
use crate::errors::{AppError, AppResult};

/// Session credential settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session credentials
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Credential lifetime in hours
    pub token_ttl_hours: i64,
    /// Add `Secure` to the session cookie
    pub cookie_secure: bool,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Load session settings from environment
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `JWT_SECRET` is missing or a numeric
    /// or boolean value does not parse
    pub fn from_env() -> AppResult<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::config("JWT_SECRET must be set"))?;
        Ok(Self {
            jwt_secret,
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?,
            cookie_secure: parse_var("AUTH_COOKIE_SECURE", true)?,
            bcrypt_cost: parse_var("BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
        })
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a non-positive lifetime or an
    /// out-of-range bcrypt cost
    pub fn validate(&self) -> AppResult<()> {
        if self.token_ttl_hours <= 0 {
            return Err(AppError::config("TOKEN_TTL_HOURS must be positive"));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(AppError::config("BCRYPT_COST must be between 4 and 31"));
        }
        Ok(())
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Storage backend and connection settings
    pub database: DatabaseConfig,
    /// Session credential settings
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any variable is missing or invalid
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");
        let config = Self {
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
        };
        config.validate()?;
        info!(
            backend = %config.database.backend,
            token_ttl_hours = config.auth.token_ttl_hours,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found
    pub fn validate(&self) -> AppResult<()> {
        self.database.validate()?;
        self.auth.validate()
    }
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_var<T>(key: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value: {e}"))),
        Err(_) => Ok(default),
    }
}
