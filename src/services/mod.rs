// ABOUTME: Domain service layer built on the persistence plugins
// ABOUTME: Visibility filtering, listings, owner scoping, account administration and follows
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Domain service layer
//!
//! Services take the [`Database`](crate::database_plugins::Database) and the
//! acting principal explicitly; none of them keeps state of its own.

/// Account privacy changes and cascading account deletion
pub mod accounts;

/// Paged, privacy-filtered listings across owners
pub mod listings;

/// Owner scoping for queries and mutations
pub mod ownership;

/// Follow graph operations
pub mod social;

/// Ownership/privacy authorization algorithm
pub mod visibility;
