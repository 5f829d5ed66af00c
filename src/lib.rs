// ABOUTME: Main library entry point for the Cragbook climbing log persistence core
// ABOUTME: Storage plugins, session handling and privacy-aware listings over two backends
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Cragbook Server
//!
//! Persistence and authorization core of a climbing activity log. Users record
//! locations, routes, sessions, attempts, shoe usage, ratings and reviews;
//! each principal chooses, per resource kind, whether others may see them.
//!
//! ## Architecture
//!
//! - **Database plugins**: one generic DAO contract, a volatile in-memory
//!   backend and a durable SQLite document backend, behind a `Database` facade
//! - **Auth**: signed session credentials checked against revocable token records
//! - **Services**: privacy-filtered listings with batched reference tables,
//!   owner scoping, account deletion and the follow graph
//! - **Resources**: the dependency container built once per process
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cragbook_server::config::environment::ServerConfig;
//! use cragbook_server::errors::AppResult;
//! use cragbook_server::resources::ServerResources;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = ServerResources::initialize(config).await?.into_shared();
//!     println!("Storage: {}", resources.database.backend_info());
//!     Ok(())
//! }
//! ```

/// Authentication and session management
pub mod auth;

/// Configuration management
pub mod config;

/// Application constants organized by domain
pub mod constants;

/// Storage abstraction layer with volatile and durable backends
pub mod database_plugins;

/// Unified error handling system with standard error codes
pub mod errors;

/// Structured logging configuration
pub mod logging;

/// Persisted entity models
pub mod models;

/// Offset/limit pagination
pub mod pagination;

/// Dependency container shared by every consumer
pub mod resources;

/// Session cookie and credential transport helpers
pub mod security;

/// Domain services: visibility, listings, ownership, accounts, follows
pub mod services;
