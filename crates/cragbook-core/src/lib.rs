// ABOUTME: Core types and constants for the Cragbook climbing log platform
// ABOUTME: Foundation crate with error handling, pagination, entity models, and constants
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Cragbook Core
//!
//! Foundation crate providing shared types and constants for the Cragbook
//! climbing log platform. This crate is designed to change infrequently and
//! carries no storage or transport dependencies.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `AppResult`
//! - **constants**: Application-wide constants organized by domain
//! - **pagination**: Offset/limit pagination with bounded sanitization
//! - **models**: Persisted entities, privacy settings, and public projections

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants and configuration values organized by domain
pub mod constants;

/// Offset/limit pagination for list operations
pub mod pagination;

/// Persisted entity models and their public projections
pub mod models;
