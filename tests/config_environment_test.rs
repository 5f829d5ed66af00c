// ABOUTME: Unit tests for environment-driven configuration
// ABOUTME: Backend selection, URL credential templating, session settings and validation errors
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use cragbook_server::config::database::{render_url, BackendKind, DatabaseConfig};
use cragbook_server::config::environment::{AuthConfig, ServerConfig};
use cragbook_server::errors::ErrorCode;
use serial_test::serial;

const VARIABLES: [&str; 9] = [
    "DATABASE_BACKEND",
    "DATABASE_URL",
    "DATABASE_USER",
    "DATABASE_PASSWORD",
    "DATABASE_MAX_CONNECTIONS",
    "JWT_SECRET",
    "TOKEN_TTL_HOURS",
    "AUTH_COOKIE_SECURE",
    "BCRYPT_COST",
];

fn clear_env() {
    for key in VARIABLES {
        env::remove_var(key);
    }
}

#[test]
fn test_backend_kind_parsing() {
    assert_eq!("durable".parse::<BackendKind>().unwrap(), BackendKind::Durable);
    assert_eq!(" Volatile ".parse::<BackendKind>().unwrap(), BackendKind::Volatile);
    assert_eq!(
        "mongodb".parse::<BackendKind>().unwrap_err().code,
        ErrorCode::ConfigError
    );
    assert_eq!(BackendKind::default(), BackendKind::Volatile);
}

#[test]
fn test_render_url_encodes_credentials() {
    let url = render_url(
        "sqlite://{user}:{password}@/data/cragbook.db",
        Some("climber"),
        Some("p@ss/word"),
    )
    .unwrap();
    assert_eq!(url, "sqlite://climber:p%40ss%2Fword@/data/cragbook.db");

    // Templates without placeholders pass through untouched
    assert_eq!(
        render_url("sqlite::memory:", None, None).unwrap(),
        "sqlite::memory:"
    );

    let err = render_url("sqlite://{user}@/db", None, None).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
}

#[test]
#[serial]
fn test_defaults_from_minimal_environment() {
    clear_env();
    env::set_var("JWT_SECRET", "s3cret");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.database.backend, BackendKind::Volatile);
    assert!(config.database.url.is_none());
    assert_eq!(config.database.max_connections, 5);
    assert_eq!(config.auth.token_ttl_hours, 24);
    assert!(config.auth.cookie_secure);
    assert_eq!(config.auth.bcrypt_cost, 12);

    clear_env();
}

#[test]
#[serial]
fn test_durable_environment() {
    clear_env();
    env::set_var("DATABASE_BACKEND", "durable");
    env::set_var("DATABASE_URL", "sqlite://{user}:{password}@/tmp/cragbook.db");
    env::set_var("DATABASE_USER", "ops");
    env::set_var("DATABASE_PASSWORD", "hunter2");
    env::set_var("DATABASE_MAX_CONNECTIONS", "8");
    env::set_var("JWT_SECRET", "s3cret");
    env::set_var("TOKEN_TTL_HOURS", "2");
    env::set_var("AUTH_COOKIE_SECURE", "false");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.database.backend, BackendKind::Durable);
    assert_eq!(config.database.user.as_deref(), Some("ops"));
    assert_eq!(config.database.max_connections, 8);
    assert_eq!(config.auth.token_ttl_hours, 2);
    assert!(!config.auth.cookie_secure);

    // Secrets stay out of serialized configuration
    let rendered = serde_json::to_string(&config).unwrap();
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("s3cret"));

    clear_env();
}

#[test]
#[serial]
fn test_durable_without_url_is_rejected() {
    clear_env();
    env::set_var("DATABASE_BACKEND", "durable");
    env::set_var("JWT_SECRET", "s3cret");

    let err = ServerConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
    assert!(err.message.contains("DATABASE_URL"));

    clear_env();
}

#[test]
#[serial]
fn test_missing_secret_is_rejected() {
    clear_env();
    assert_eq!(AuthConfig::from_env().unwrap_err().code, ErrorCode::ConfigError);

    env::set_var("JWT_SECRET", "");
    assert_eq!(AuthConfig::from_env().unwrap_err().code, ErrorCode::ConfigError);

    clear_env();
}

#[test]
#[serial]
fn test_malformed_numbers_are_rejected() {
    clear_env();
    env::set_var("JWT_SECRET", "s3cret");
    env::set_var("TOKEN_TTL_HOURS", "a day");
    assert_eq!(ServerConfig::from_env().unwrap_err().code, ErrorCode::ConfigError);

    env::set_var("TOKEN_TTL_HOURS", "0");
    assert_eq!(ServerConfig::from_env().unwrap_err().code, ErrorCode::ConfigError);

    env::remove_var("TOKEN_TTL_HOURS");
    env::set_var("BCRYPT_COST", "40");
    assert_eq!(ServerConfig::from_env().unwrap_err().code, ErrorCode::ConfigError);

    env::remove_var("BCRYPT_COST");
    env::set_var("DATABASE_MAX_CONNECTIONS", "many");
    assert_eq!(DatabaseConfig::from_env().unwrap_err().code, ErrorCode::ConfigError);

    clear_env();
}
