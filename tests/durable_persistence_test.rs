// ABOUTME: Integration tests for the durable backend lifecycle on a real database file
// ABOUTME: Reconnects, closed handles, concurrent writers, missing URL and use before connect
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use cragbook_server::{
    database_plugins::{Dao, Database, Filter, Update},
    errors::ErrorCode,
    models::{Privacy, ResourceKind, User},
    services::accounts,
};
use tempfile::TempDir;

fn file_url(dir: &TempDir) -> String {
    format!("sqlite:{}", dir.path().join("cragbook.db").display())
}

#[tokio::test]
async fn test_data_survives_reconnect() {
    common::init_test_logging();
    let dir = TempDir::new().unwrap();
    let url = file_url(&dir);

    let first = Database::durable();
    first.connect(Some(&url), None, None).await.unwrap();
    let user = first
        .users()
        .create(User::new("ada", "ada@example.com", "hash"))
        .await
        .unwrap();
    accounts::set_privacy(&first, user.id, ResourceKind::Attempts, Privacy::Private)
        .await
        .unwrap();
    first.close().await;
    assert!(!first.is_connected());

    let second = Database::durable();
    second.connect(Some(&url), None, None).await.unwrap();
    let restored = second.users().find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(restored.username, "ada");
    assert_eq!(restored.privacy.attempts, Privacy::Private);
    assert_eq!(
        restored.created_at.timestamp_millis(),
        user.created_at.timestamp_millis()
    );
    second.close().await;
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let url = file_url(&dir);
    let database = Database::durable();

    database.connect(Some(&url), None, None).await.unwrap();
    database
        .users()
        .create(User::new("ada", "ada@example.com", "hash"))
        .await
        .unwrap();
    database.connect(Some(&url), None, None).await.unwrap();

    assert!(database.is_connected());
    assert_eq!(database.users().count(&Filter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn test_durable_requires_url() {
    let database = Database::durable();
    let err = database.connect(None, None, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);

    let err = database.connect(Some("  "), None, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
    assert!(!database.is_connected());
}

#[tokio::test]
async fn test_durable_unusable_before_connect() {
    let database = Database::durable();
    assert!(!database.is_connected());

    let err = database.users().count(&Filter::All).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
}

#[tokio::test]
async fn test_missing_credentials_fail_templated_url() {
    let dir = TempDir::new().unwrap();
    let template = format!("sqlite:{}/{{user}}.db", dir.path().display());
    let database = Database::durable();

    let err = database.connect(Some(&template), None, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);

    database
        .connect(Some(&template), Some("climber"), None)
        .await
        .unwrap();
    assert!(dir.path().join("climber.db").exists());
}

#[tokio::test]
async fn test_connect_after_close_is_rejected() {
    let dir = TempDir::new().unwrap();
    let url = file_url(&dir);
    let database = Database::durable();

    database.connect(Some(&url), None, None).await.unwrap();
    database.close().await;

    let err = database.connect(Some(&url), None, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
    assert!(!database.is_connected());
    assert!(database.users().count(&Filter::All).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_all_commit() {
    common::init_test_logging();
    let dir = TempDir::new().unwrap();
    let url = file_url(&dir);
    let database = Arc::new(Database::durable().with_max_connections(8));
    database.connect(Some(&url), None, None).await.unwrap();

    let user = database
        .users()
        .create(User::new("ada", "ada@example.com", "hash"))
        .await
        .unwrap();

    let writers: Vec<_> = (0..32)
        .map(|i| {
            let database = Arc::clone(&database);
            tokio::spawn(async move {
                database
                    .users()
                    .update_one(
                        &Filter::by_id(user.id),
                        &Update::new().set("email", format!("ada{i}@example.com")),
                        false,
                    )
                    .await
            })
        })
        .collect();

    for writer in writers {
        assert!(writer.await.unwrap().unwrap(), "every update should commit");
    }

    let stored = database.users().find_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.email.starts_with("ada") && stored.email.ends_with("@example.com"));
    database.close().await;
}
