// ABOUTME: Transport-boundary security helpers for the session credential
// ABOUTME: Cookie construction, credential extraction and cross-origin exposure headers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Session Transport Security
//!
//! The signed session credential travels as an `HttpOnly` cookie, with a
//! bearer `Authorization` header accepted as a fallback for non-browser
//! clients. Nothing here touches storage.

/// Session cookie building and credential extraction
pub mod cookies;

pub use cookies::{
    attach_session_cookie, clear_session_cookie, extract_bearer, extract_cookie,
    extract_credential,
};
