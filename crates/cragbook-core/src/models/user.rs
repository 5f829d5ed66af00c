// ABOUTME: Principal model with credentials, admin flag and per-resource privacy settings
// ABOUTME: Includes the public projection exposed in listing reference tables
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::impl_entity;
use super::privacy::{Privacy, PrivacySettings, ResourceKind};
use crate::constants::collections;

/// A registered principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Unique login name
    pub username: String,
    /// Contact address (unique)
    pub email: String,
    /// bcrypt hash of the password
    pub password_hash: String,
    /// Administrators see every record regardless of privacy
    #[serde(default)]
    pub is_admin: bool,
    /// Visibility per resource kind
    #[serde(default)]
    pub privacy: PrivacySettings,
    /// Registration time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(User, collections::USERS, indexed = ["username", "email"]);

impl User {
    /// Create a new, not yet persisted, non-admin user with public defaults
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            is_admin: false,
            privacy: PrivacySettings::default(),
            created_at: Utc::now(),
        }
    }

    /// Privacy setting governing this user's records of `kind`
    #[must_use]
    pub const fn privacy_for(&self, kind: ResourceKind) -> Privacy {
        self.privacy.get(kind)
    }

    /// Whether `viewer` may see this user's records of `kind`
    #[must_use]
    pub fn visible_to(&self, viewer: Option<&Self>, kind: ResourceKind) -> bool {
        viewer.is_some_and(|viewer| viewer.is_admin || viewer.id == self.id)
            || !self.privacy_for(kind).is_private()
    }

    /// Projection safe to show to any other principal
    #[must_use]
    pub fn public_view(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Public projection of a [`User`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    /// User identifier
    pub id: Uuid,
    /// Login name
    pub username: String,
}
