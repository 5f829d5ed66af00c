// ABOUTME: Climbing shoe inventory and per-session shoe usage records
// ABOUTME: Shoe logs reference a shoe and are listed under the shoe-log privacy setting
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{impl_entity, impl_owned};
use crate::constants::collections;

/// A pair of climbing shoes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shoe {
    /// Identifier
    pub id: Uuid,
    /// Owner
    pub user: Uuid,
    /// Manufacturer
    pub brand: String,
    /// Model name
    pub model: String,
    /// Whether the pair has been retired
    #[serde(default)]
    pub retired: bool,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(Shoe, collections::SHOES, indexed = ["user"]);
impl_owned!(Shoe, user);

impl Shoe {
    /// New, not yet persisted, shoe
    #[must_use]
    pub fn new(user: Uuid, brand: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            user,
            brand: brand.into(),
            model: model.into(),
            retired: false,
            created_at: Utc::now(),
        }
    }

    /// Reference-table projection
    #[must_use]
    pub fn summary(&self) -> ShoeSummary {
        ShoeSummary {
            id: self.id,
            brand: self.brand.clone(),
            model: self.model.clone(),
        }
    }
}

/// Public projection of a [`Shoe`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoeSummary {
    /// Identifier
    pub id: Uuid,
    /// Manufacturer
    pub brand: String,
    /// Model name
    pub model: String,
}

/// Shoe worn during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoeLog {
    /// Identifier
    pub id: Uuid,
    /// Wearer
    pub user: Uuid,
    /// Shoe worn
    pub shoe: Uuid,
    /// Session the shoe was worn in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Uuid>,
    /// Minutes of use
    #[serde(default)]
    pub minutes: u32,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(ShoeLog, collections::SHOE_LOGS, indexed = ["user", "shoe"]);
impl_owned!(ShoeLog, user);

impl ShoeLog {
    /// New, not yet persisted, shoe log
    #[must_use]
    pub fn new(user: Uuid, shoe: Uuid, minutes: u32) -> Self {
        Self {
            id: Uuid::nil(),
            user,
            shoe,
            session: None,
            minutes,
            created_at: Utc::now(),
        }
    }
}
