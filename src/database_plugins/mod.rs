// ABOUTME: Storage abstraction layer for Cragbook with a generic per-entity DAO contract
// ABOUTME: Plugin architecture with volatile in-memory and durable SQLite document backends
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Persistence Plugins
//!
//! [`Dao`] is the one contract every backend implements for every entity type.
//! Absence is a value (`None`, an empty `Vec`, `0`, `false`); `Err` is reserved
//! for storage faults, malformed input and misconfiguration.
//!
//! The trait has no default method bodies, so a backend that forgets an
//! operation fails to compile instead of failing at runtime.

use async_trait::async_trait;
use uuid::Uuid;

use crate::constants::pagination::DEFAULT_LIMIT;
use crate::errors::AppResult;
use crate::models::Entity;
use crate::pagination::Page;

/// Backend-neutral document semantics: matching, sorting, projection and updates
pub mod document;
/// `Database` facade selecting and owning the backend
pub mod factory;
/// Query, sort, projection and update expressions
pub mod filter;
/// Volatile in-memory backend
pub mod memory;
/// Durable SQLite document backend
pub mod sqlite;

pub use document::Document;
pub use factory::{Collection, Database, Store};
pub use filter::{FieldValue, Filter, Projection, Sort, SortDirection, Update};

/// Ordering and paging of a `find` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort keys; empty means insertion order
    pub sort: Sort,
    /// Matches to skip
    pub offset: u32,
    /// Maximum items returned; `None` returns every match
    pub limit: Option<u32>,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            sort: Sort::none(),
            offset: 0,
            limit: Some(DEFAULT_LIMIT),
        }
    }
}

impl FindOptions {
    /// Every match, in insertion order
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            sort: Sort::none(),
            offset: 0,
            limit: None,
        }
    }

    /// Options for one listing page
    #[must_use]
    pub const fn page(sort: Sort, page: Page) -> Self {
        Self {
            sort,
            offset: page.offset,
            limit: Some(page.limit),
        }
    }

    /// Replace the sort keys
    #[must_use]
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Replace the offset
    #[must_use]
    pub const fn skip(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Replace the limit
    #[must_use]
    pub const fn take(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Data access contract for one entity type
///
/// Both backends must interpret filters, sorts and updates identically; the
/// shared rules live in [`document`].
#[async_trait]
pub trait Dao<T: Entity>: Send + Sync {
    /// Persist one item, assigning a fresh id when it has none, and return the
    /// stored form
    ///
    /// No natural-key duplicate detection is done here; callers pre-check.
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` if the id is already taken, or a storage error
    async fn create(&self, item: T) -> AppResult<T>;

    /// First match in insertion order
    ///
    /// # Errors
    ///
    /// Returns an error on malformed filters or storage failure
    async fn find_one(&self, filter: &Filter) -> AppResult<Option<T>>;

    /// First match in insertion order, reduced to the projected fields
    ///
    /// # Errors
    ///
    /// Returns an error on malformed filters or storage failure
    async fn find_one_projected(
        &self,
        filter: &Filter,
        projection: &Projection,
    ) -> AppResult<Option<Document>>;

    /// Matches ordered by `options.sort` (ties by id), then paged
    ///
    /// # Errors
    ///
    /// Returns an error on malformed filters or storage failure
    async fn find(&self, filter: &Filter, options: &FindOptions) -> AppResult<Vec<T>>;

    /// Like [`Dao::find`], reduced to the projected fields
    ///
    /// # Errors
    ///
    /// Returns an error on malformed filters or storage failure
    async fn find_projected(
        &self,
        filter: &Filter,
        projection: &Projection,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>>;

    /// Item with the given id
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<T>>;

    /// Remove every match, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns an error on malformed filters or storage failure
    async fn delete(&self, filter: &Filter) -> AppResult<u64>;

    /// Remove the item with the given id; `true` iff exactly one was removed
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure
    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool>;

    /// Update the first match; `true` iff a document was modified
    ///
    /// With `upsert` (the usual choice) a filter that matches nothing inserts a
    /// new document built from its equality constraints plus the update.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for malformed updates, or a storage error
    async fn update_one(&self, filter: &Filter, update: &Update, upsert: bool) -> AppResult<bool>;

    /// Update every match; returns the number of modified documents
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for malformed updates, or a storage error
    async fn update_many(&self, filter: &Filter, update: &Update, upsert: bool) -> AppResult<u64>;

    /// Number of matches
    ///
    /// # Errors
    ///
    /// Returns an error on malformed filters or storage failure
    async fn count(&self, filter: &Filter) -> AppResult<u64>;

    /// Mean of the numeric values of `field` over every match
    ///
    /// # Errors
    ///
    /// Returns an error on malformed filters or storage failure
    async fn average(&self, filter: &Filter, field: &str) -> AppResult<Option<f64>>;

    /// Remove every item of this type
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure
    async fn clear(&self) -> AppResult<()>;
}
