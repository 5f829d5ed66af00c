// ABOUTME: Core data models and entity traits for the Cragbook climbing log
// ABOUTME: Re-exports users, privacy settings, climbing records, gear, feedback and social types
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Data Models
//!
//! Every persisted type implements [`Entity`]: it names its collection, exposes
//! its identifier and serializes to a flat JSON object. Types created by a
//! principal also implement [`Owned`], which names the field holding the owner
//! reference so that scoping code never has to guess.
//!
//! Timestamps are serialized as milliseconds since the epoch so that they are
//! numeric, sortable fields on every storage backend.

mod climbing;
mod entity;
mod feedback;
mod gear;
mod privacy;
mod social;
mod token;
mod user;

pub use climbing::{
    Attempt, AttemptOutcome, ClimbingSession, Interest, Location, LocationSummary, Route,
    RouteStyle, RouteSummary,
};
pub use entity::{Entity, Owned};
pub use feedback::{LocationReview, RouteRating};
pub use gear::{Shoe, ShoeLog, ShoeSummary};
pub use privacy::{Privacy, PrivacySettings, ResourceKind};
pub use social::Follow;
pub use token::SessionToken;
pub use user::{User, UserPublic};
