// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Pure data constants for pagination, sessions, collections and service naming
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single
//! flat namespace.

/// Pagination bounds applied before any `find` call
pub mod pagination {
    /// Items returned when the caller does not ask for a page size
    pub const DEFAULT_LIMIT: u32 = 20;
    /// Upper bound on a single page
    pub const MAX_LIMIT: u32 = 100;
    /// Upper bound on the offset a caller may request
    pub const MAX_OFFSET: u32 = 100_000;
}

/// Session credential settings
pub mod session {
    /// Cookie carrying the signed session credential
    pub const AUTH_COOKIE_NAME: &str = "auth_token";
    /// Default credential lifetime
    pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
    /// Cost factor for bcrypt password hashing
    pub const DEFAULT_BCRYPT_COST: u32 = 12;
    /// Header prefix for bearer credentials
    pub const BEARER_PREFIX: &str = "Bearer ";
}

/// Collection names, one per persisted entity type
pub mod collections {
    /// Principals
    pub const USERS: &str = "users";
    /// Session token records
    pub const TOKENS: &str = "tokens";
    /// Climbing locations (crags, gyms)
    pub const LOCATIONS: &str = "locations";
    /// Routes and boulder problems
    pub const ROUTES: &str = "routes";
    /// Climbing sessions
    pub const SESSIONS: &str = "sessions";
    /// Attempts on routes
    pub const ATTEMPTS: &str = "attempts";
    /// Routes a user has marked as a project
    pub const INTERESTS: &str = "interests";
    /// Climbing shoes
    pub const SHOES: &str = "shoes";
    /// Shoe usage records
    pub const SHOE_LOGS: &str = "shoe_logs";
    /// Route ratings
    pub const RATINGS: &str = "ratings";
    /// Location reviews
    pub const REVIEWS: &str = "reviews";
    /// Follow graph edges
    pub const FOLLOWS: &str = "follows";
}

/// Well-known document field names
pub mod fields {
    /// Identifier field present on every document
    pub const ID: &str = "id";
    /// Creation timestamp, used as the listing sort key
    pub const CREATED_AT: &str = "created_at";
    /// Numeric score on ratings and reviews
    pub const RATING: &str = "rating";
}

/// Service identification for logs
pub mod service_names {
    /// Library/service name
    pub const CRAGBOOK_SERVER: &str = "cragbook-server";
}
