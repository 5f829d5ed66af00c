// ABOUTME: Centralized resource container for dependency injection
// ABOUTME: Builds the database facade and session manager once per process from configuration
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Server Resources
//!
//! Built once at startup and passed explicitly (usually as
//! `Arc<ServerResources>`) to every consumer. There are no global statics: a
//! second call to [`ServerResources::initialize`] builds an independent
//! instance.

use std::sync::Arc;

use tracing::info;

use crate::auth::AuthManager;
use crate::config::environment::ServerConfig;
use crate::database_plugins::Database;
use crate::errors::AppResult;

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// The one database facade of this process
    pub database: Arc<Database>,
    /// Session credential manager
    pub auth_manager: Arc<AuthManager>,
}

impl ServerResources {
    /// Assemble resources from already-built parts
    #[must_use]
    pub fn new(config: ServerConfig, database: Database, auth_manager: AuthManager) -> Self {
        Self {
            config: Arc::new(config),
            database: Arc::new(database),
            auth_manager: Arc::new(auth_manager),
        }
    }

    /// Build the configured backend, connect it and create the session manager
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings, or a database error
    /// if the durable backend cannot be reached
    pub async fn initialize(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;
        let database =
            Database::new(config.database.backend).with_max_connections(config.database.max_connections);
        database.connect_with_config(&config.database).await?;
        info!(backend = database.backend_info(), "database ready");

        let auth_manager = AuthManager::from_config(&config.auth);
        Ok(Self::new(config, database, auth_manager))
    }

    /// Shared handle, as consumers usually hold it
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
