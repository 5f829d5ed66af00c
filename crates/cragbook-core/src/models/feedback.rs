// ABOUTME: Route ratings and location reviews submitted by users
// ABOUTME: Both carry a numeric `rating` field averaged by listing operations
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{impl_entity, impl_owned};
use crate::constants::collections;

/// A user's star rating of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRating {
    /// Identifier
    pub id: Uuid,
    /// Rater
    pub user: Uuid,
    /// Rated route
    pub route: Uuid,
    /// Stars, 1 to 5 (clamped by the request layer)
    pub rating: u8,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(RouteRating, collections::RATINGS, indexed = ["user", "route"]);
impl_owned!(RouteRating, user);

impl RouteRating {
    /// New, not yet persisted, rating
    #[must_use]
    pub fn new(user: Uuid, route: Uuid, rating: u8) -> Self {
        Self {
            id: Uuid::nil(),
            user,
            route,
            rating,
            created_at: Utc::now(),
        }
    }
}

/// A user's written review of a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationReview {
    /// Identifier
    pub id: Uuid,
    /// Reviewer
    pub user: Uuid,
    /// Reviewed location
    pub location: Uuid,
    /// Stars, 1 to 5
    pub rating: u8,
    /// Review text
    #[serde(default)]
    pub body: String,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(LocationReview, collections::REVIEWS, indexed = ["user", "location"]);
impl_owned!(LocationReview, user);

impl LocationReview {
    /// New, not yet persisted, review
    #[must_use]
    pub fn new(user: Uuid, location: Uuid, rating: u8, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            user,
            location,
            rating,
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}
