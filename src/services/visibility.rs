// ABOUTME: Ownership/privacy authorization over result sets spanning many owners
// ABOUTME: Filters items by requester and owner privacy, builds owner and reference tables
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Visibility
//!
//! [`authorize`] is applied by every listing that returns items owned by
//! different principals. It performs exactly one batched owner lookup and at
//! most one batched reference lookup, whatever the number of items.
//!
//! An owner's items are kept iff the requester is an administrator, is the
//! owner, or the owner's setting for the resource kind is not `private`.
//! Items whose owner record no longer exists are dropped.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::constants::fields;
use crate::database_plugins::{Collection, Dao, Database, Filter, FindOptions};
use crate::errors::AppResult;
use crate::models::{
    Attempt, ClimbingSession, Entity, Interest, Location, LocationReview, LocationSummary, Owned,
    ResourceKind, Route, RouteRating, RouteSummary, Shoe, ShoeLog, ShoeSummary, User, UserPublic,
};

/// An entity with a public projection for reference tables
pub trait Summarize: Collection {
    /// Projection safe to show to any principal
    type Summary: Serialize + Clone + Send + Sync + 'static;

    /// Build the projection
    fn summarize(&self) -> Self::Summary;
}

impl Summarize for Route {
    type Summary = RouteSummary;

    fn summarize(&self) -> RouteSummary {
        self.summary()
    }
}

impl Summarize for Location {
    type Summary = LocationSummary;

    fn summarize(&self) -> LocationSummary {
        self.summary()
    }
}

impl Summarize for Shoe {
    type Summary = ShoeSummary;

    fn summarize(&self) -> ShoeSummary {
        self.summary()
    }
}

/// An owned entity listed across owners under a per-kind privacy setting
pub trait Listable: Owned + Collection {
    /// Privacy setting that governs this type
    const RESOURCE: ResourceKind;

    /// Numeric field averaged by listings, for rating-like types
    const RATING_FIELD: Option<&'static str> = None;

    /// Secondary entity each item points at
    type Reference: Summarize;

    /// Id of the secondary entity
    fn reference(&self) -> Uuid;
}

/// Summary type of `T`'s secondary entity
pub type ReferenceSummary<T> = <<T as Listable>::Reference as Summarize>::Summary;

macro_rules! impl_listable {
    ($ty:ty, $kind:expr, $reference:ty, $field:ident $(, rating = $rating:expr)?) => {
        impl Listable for $ty {
            const RESOURCE: ResourceKind = $kind;
            $(const RATING_FIELD: Option<&'static str> = Some($rating);)?
            type Reference = $reference;

            fn reference(&self) -> Uuid {
                self.$field
            }
        }
    };
}

impl_listable!(Attempt, ResourceKind::Attempts, Route, route);
impl_listable!(Interest, ResourceKind::Interests, Route, route);
impl_listable!(ClimbingSession, ResourceKind::Sessions, Location, location);
impl_listable!(ShoeLog, ResourceKind::ShoeLogs, Shoe, shoe);
impl_listable!(RouteRating, ResourceKind::Ratings, Route, route, rating = fields::RATING);
impl_listable!(LocationReview, ResourceKind::Reviews, Location, location, rating = fields::RATING);

/// Items the requester may see, with their reference tables
#[derive(Debug, Clone, Serialize)]
pub struct Authorized<T, S> {
    /// Visible items, in input order
    pub items: Vec<T>,
    /// Owners of the visible items
    pub users: HashMap<Uuid, UserPublic>,
    /// Secondary entities referenced by the visible items
    pub references: HashMap<Uuid, S>,
}

impl<T, S> Default for Authorized<T, S> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            users: HashMap::new(),
            references: HashMap::new(),
        }
    }
}

/// Distinct values in first-seen order
fn distinct(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Fetch every item of `T` whose id is in `ids` with a single query
///
/// # Errors
///
/// Returns an error on storage failure
pub async fn find_by_ids<T: Collection>(database: &Database, ids: &[Uuid]) -> AppResult<Vec<T>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    database
        .collection::<T>()
        .find(
            &Filter::is_in(fields::ID, ids.iter().copied()),
            &FindOptions::unbounded(),
        )
        .await
}

/// Filter `items` for `requester` and resolve owner and reference tables
///
/// # Errors
///
/// Returns an error if a batched lookup fails
pub async fn authorize<T: Listable>(
    database: &Database,
    requester: Option<&User>,
    items: Vec<T>,
) -> AppResult<Authorized<T, ReferenceSummary<T>>> {
    if items.is_empty() {
        return Ok(Authorized::default());
    }

    let owner_ids = distinct(items.iter().map(Owned::owner));
    let owners: Vec<User> = find_by_ids(database, &owner_ids).await?;
    let users: HashMap<Uuid, UserPublic> = owners
        .iter()
        .filter(|owner| owner.visible_to(requester, T::RESOURCE))
        .map(|owner| (owner.id, owner.public_view()))
        .collect();

    let total = items.len();
    let items: Vec<T> = items
        .into_iter()
        .filter(|item| users.contains_key(&item.owner()))
        .collect();

    let reference_ids = distinct(items.iter().map(Listable::reference));
    let references = find_by_ids::<T::Reference>(database, &reference_ids)
        .await?
        .iter()
        .map(|reference| (reference.id(), reference.summarize()))
        .collect();

    debug!(
        resource = %T::RESOURCE,
        matched = total,
        visible = items.len(),
        owners = users.len(),
        "authorized listing"
    );
    Ok(Authorized {
        items,
        users,
        references,
    })
}
