// ABOUTME: Climbing catalogue and activity models: locations, routes, sessions, attempts, interests
// ABOUTME: Catalogue entries are owned through `submitted_by`, activity records through `user`
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{impl_entity, impl_owned};
use crate::constants::collections;

/// A crag, wall or gym
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// User who added the location
    pub submitted_by: Uuid,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(Location, collections::LOCATIONS, indexed = ["name"]);
impl_owned!(Location, submitted_by);

impl Location {
    /// New, not yet persisted, location
    #[must_use]
    pub fn new(name: impl Into<String>, submitted_by: Uuid) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            description: None,
            submitted_by,
            created_at: Utc::now(),
        }
    }

    /// Reference-table projection
    #[must_use]
    pub fn summary(&self) -> LocationSummary {
        LocationSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Public projection of a [`Location`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSummary {
    /// Identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
}

/// Climbing discipline of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStyle {
    /// Bouldering problem
    Boulder,
    /// Bolted sport route
    #[default]
    Sport,
    /// Traditionally protected route
    Trad,
    /// Top-rope only
    TopRope,
}

/// A route or boulder problem at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Identifier
    pub id: Uuid,
    /// Route name
    pub name: String,
    /// Location the route belongs to
    pub location: Uuid,
    /// Grade as written in the local system (e.g. "7a", "V5")
    pub grade: String,
    /// Discipline
    #[serde(default)]
    pub style: RouteStyle,
    /// User who added the route
    pub submitted_by: Uuid,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(Route, collections::ROUTES, indexed = ["location"]);
impl_owned!(Route, submitted_by);

impl Route {
    /// New, not yet persisted, route
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        location: Uuid,
        grade: impl Into<String>,
        submitted_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            location,
            grade: grade.into(),
            style: RouteStyle::default(),
            submitted_by,
            created_at: Utc::now(),
        }
    }

    /// Reference-table projection
    #[must_use]
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            id: self.id,
            name: self.name.clone(),
            grade: self.grade.clone(),
            location: self.location,
        }
    }
}

/// Public projection of a [`Route`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Identifier
    pub id: Uuid,
    /// Route name
    pub name: String,
    /// Grade
    pub grade: String,
    /// Location id
    pub location: Uuid,
}

/// A visit to a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimbingSession {
    /// Identifier
    pub id: Uuid,
    /// Climber
    pub user: Uuid,
    /// Where the session took place
    pub location: Uuid,
    /// Session start
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    /// Session end, when finished
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(ClimbingSession, collections::SESSIONS, indexed = ["user"]);
impl_owned!(ClimbingSession, user);

impl ClimbingSession {
    /// Start a session now
    #[must_use]
    pub fn new(user: Uuid, location: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            user,
            location,
            started_at: now,
            ended_at: None,
            notes: None,
            created_at: now,
        }
    }
}

/// Result of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Sent first go without prior information
    Onsight,
    /// Sent first go with beta
    Flash,
    /// Sent after previous attempts
    Redpoint,
    /// Did not send
    Fall,
}

impl AttemptOutcome {
    /// Whether the route was completed
    #[must_use]
    pub const fn is_send(self) -> bool {
        !matches!(self, Self::Fall)
    }
}

/// One go at a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Identifier
    pub id: Uuid,
    /// Climber
    pub user: Uuid,
    /// Route attempted
    pub route: Uuid,
    /// Session the attempt belongs to, if logged within one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Uuid>,
    /// Outcome
    pub outcome: AttemptOutcome,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(Attempt, collections::ATTEMPTS, indexed = ["user", "route"]);
impl_owned!(Attempt, user);

impl Attempt {
    /// New, not yet persisted, attempt
    #[must_use]
    pub fn new(user: Uuid, route: Uuid, outcome: AttemptOutcome) -> Self {
        Self {
            id: Uuid::nil(),
            user,
            route,
            session: None,
            outcome,
            created_at: Utc::now(),
        }
    }
}

/// A route a user wants to climb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    /// Identifier
    pub id: Uuid,
    /// Interested user
    pub user: Uuid,
    /// Route of interest
    pub route: Uuid,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl_entity!(Interest, collections::INTERESTS, indexed = ["user", "route"]);
impl_owned!(Interest, user);

impl Interest {
    /// New, not yet persisted, interest
    #[must_use]
    pub fn new(user: Uuid, route: Uuid) -> Self {
        Self {
            id: Uuid::nil(),
            user,
            route,
            created_at: Utc::now(),
        }
    }
}
