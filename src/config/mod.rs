// ABOUTME: Configuration management module for process-wide server settings
// ABOUTME: Environment-only loading of database backend and session settings
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Configuration module
//!
//! - **Environment**: Server configuration from environment variables
//! - **Database**: Backend selection and connection URL templating

/// Database backend and connection configuration
pub mod database;
/// Environment and server configuration
pub mod environment;

pub use database::{BackendKind, DatabaseConfig};
pub use environment::{AuthConfig, ServerConfig};
