// ABOUTME: Re-exports constants from cragbook-core under the server crate's namespace
// ABOUTME: Pagination bounds, session settings, collection and field names
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub use cragbook_core::constants::*;
