// ABOUTME: Re-exports entity models from cragbook-core for unified type identity
// ABOUTME: Users, privacy settings, climbing records, gear, feedback and follows
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub use cragbook_core::models::*;
