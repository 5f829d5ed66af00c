// ABOUTME: Re-exports the unified error types from cragbook-core
// ABOUTME: Keeps one import path for AppError, ErrorCode and AppResult across the server crate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub use cragbook_core::errors::*;
