// ABOUTME: Follow graph edge between two users
// ABOUTME: Owned by the follower; duplicates are prevented by a pre-check in the social service
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{impl_entity, impl_owned};
use crate::constants::collections;

/// `follower` follows `followee`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    /// Identifier
    pub id: Uuid,
    /// User doing the following
    pub follower: Uuid,
    /// User being followed
    pub followee: Uuid,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(Follow, collections::FOLLOWS, indexed = ["follower", "followee"]);
impl_owned!(Follow, follower);

impl Follow {
    /// New, not yet persisted, edge
    #[must_use]
    pub fn new(follower: Uuid, followee: Uuid) -> Self {
        Self {
            id: Uuid::nil(),
            follower,
            followee,
            created_at: Utc::now(),
        }
    }
}
