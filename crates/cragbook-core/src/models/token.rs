// ABOUTME: Server-side session token record proving an active login
// ABOUTME: Existence of the record is the sole authority for session validity
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{impl_entity, impl_owned};
use crate::constants::collections;

/// One active login; a user may hold several at once (one per device)
///
/// Records are created at login/registration and deleted at logout or
/// revocation. They are never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Record identifier
    pub id: Uuid,
    /// Owning user
    pub user: Uuid,
    /// The exact signed credential issued for this login
    pub token: String,
    /// Issue time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(SessionToken, collections::TOKENS, indexed = ["user", "token"]);
impl_owned!(SessionToken, user);

impl SessionToken {
    /// Create a record for a freshly issued credential
    #[must_use]
    pub fn new(user: Uuid, token: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            user,
            token: token.into(),
            created_at: Utc::now(),
        }
    }
}
