// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides database builders for both backends, auth managers and fixture records
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `cragbook_server`

use std::sync::{Arc, Once};

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use cragbook_server::{
    auth::AuthManager,
    database_plugins::{Dao, Database},
    models::{Location, Privacy, PrivacySettings, Route, User},
};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fresh in-memory database
pub fn create_volatile_database() -> Arc<Database> {
    init_test_logging();
    Arc::new(Database::volatile())
}

/// Fresh durable database on a private in-memory SQLite store
pub async fn create_durable_database() -> Result<Arc<Database>> {
    init_test_logging();
    let database = Database::durable();
    database.connect(Some("sqlite::memory:"), None, None).await?;
    Ok(Arc::new(database))
}

/// One fresh database per backend, labelled for assertion messages
pub async fn all_backends() -> Result<Vec<(&'static str, Arc<Database>)>> {
    Ok(vec![
        ("volatile", create_volatile_database()),
        ("durable", create_durable_database().await?),
    ])
}

/// Session manager with a cheap bcrypt cost and a non-`Secure` cookie
pub fn create_test_auth_manager() -> AuthManager {
    AuthManager::new(b"integration-test-secret", 24)
        .with_bcrypt_cost(4)
        .with_cookie_secure(false)
}

/// Fixed instant `offset_ms` milliseconds after a base time
pub fn at(offset_ms: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + Duration::milliseconds(offset_ms)
}

/// Persist a user whose settings are all `privacy`
pub async fn create_user(database: &Database, username: &str, privacy: Privacy) -> Result<User> {
    let mut user = User::new(username, format!("{username}@example.com"), "not-a-real-hash");
    user.privacy = PrivacySettings::uniform(privacy);
    Ok(database.users().create(user).await?)
}

/// Persist an administrator
pub async fn create_admin(database: &Database, username: &str) -> Result<User> {
    let mut user = User::new(username, format!("{username}@example.com"), "not-a-real-hash");
    user.is_admin = true;
    Ok(database.users().create(user).await?)
}

/// Persist a location and one route at it
pub async fn create_route(database: &Database, submitter: &User, name: &str) -> Result<(Location, Route)> {
    let location = database
        .locations()
        .create(Location::new(format!("{name} crag"), submitter.id))
        .await?;
    let route = database
        .routes()
        .create(Route::new(name, location.id, "6a", submitter.id))
        .await?;
    Ok((location, route))
}
