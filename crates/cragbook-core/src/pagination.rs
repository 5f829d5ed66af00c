// ABOUTME: Offset/limit pagination module for list operations
// ABOUTME: Sanitizes caller-provided paging values into bounded non-negative integers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Listings page with a plain numeric offset and limit, not an opaque cursor.
//! Concurrent inserts can shift page boundaries between two requests; that is
//! accepted behavior.

use serde::{Deserialize, Serialize};

use crate::constants::pagination::{DEFAULT_LIMIT, MAX_LIMIT, MAX_OFFSET};

/// A sanitized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Number of matches to skip
    pub offset: u32,
    /// Maximum number of items to return (always at least 1)
    pub limit: u32,
}

impl Page {
    /// Build a page from raw, possibly hostile, caller input
    ///
    /// Negative offsets become 0, offsets past `MAX_OFFSET` are clamped, a
    /// missing or non-positive limit becomes `DEFAULT_LIMIT` and limits past
    /// `MAX_LIMIT` are clamped.
    #[must_use]
    pub fn sanitize(offset: Option<i64>, limit: Option<i64>) -> Self {
        let offset = offset
            .unwrap_or(0)
            .clamp(0, i64::from(MAX_OFFSET)) as u32;
        let limit = match limit {
            Some(requested) if requested > 0 => requested.min(i64::from(MAX_LIMIT)) as u32,
            _ => DEFAULT_LIMIT,
        };
        Self { offset, limit }
    }

    /// Parse string query parameters, ignoring anything that is not an integer
    #[must_use]
    pub fn from_query(offset: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|value| value.trim().parse::<i64>().ok());
        Self::sanitize(parse(offset), parse(limit))
    }

    /// The page that follows this one
    #[must_use]
    pub fn next(self) -> Self {
        Self::sanitize(
            Some(i64::from(self.offset) + i64::from(self.limit)),
            Some(i64::from(self.limit)),
        )
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_defaults() {
        assert_eq!(Page::sanitize(None, None), Page::default());
        assert_eq!(Page::sanitize(None, Some(0)).limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_sanitize_clamps_hostile_values() {
        let page = Page::sanitize(Some(-40), Some(10_000));
        assert_eq!(page.offset, 0);
        assert_eq!(page.limit, MAX_LIMIT);

        let page = Page::sanitize(Some(i64::MAX), Some(-3));
        assert_eq!(page.offset, MAX_OFFSET);
        assert_eq!(page.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_from_query_ignores_garbage() {
        let page = Page::from_query(Some("abc"), Some(" 15 "));
        assert_eq!(page, Page { offset: 0, limit: 15 });
    }

    #[test]
    fn test_next_page_is_contiguous() {
        let page = Page::sanitize(Some(10), Some(10)).next();
        assert_eq!(page, Page { offset: 20, limit: 10 });
    }
}
