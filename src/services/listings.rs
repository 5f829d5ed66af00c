// ABOUTME: Paged, privacy-filtered listings of activity records across owners
// ABOUTME: Attempts, interests, sessions, shoe logs, route ratings and location reviews
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Every listing is sorted by `created_at` ascending and paged by plain
//! offset/limit. Rating-like listings also report the mean score over every
//! match of the filter, computed before privacy filtering and independent of
//! the page.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::visibility::{authorize, Listable, ReferenceSummary};
use crate::constants::fields;
use crate::database_plugins::{Dao, Database, Filter, FindOptions, Sort};
use crate::errors::AppResult;
use crate::models::{
    Attempt, ClimbingSession, Interest, LocationReview, LocationSummary, RouteRating,
    RouteSummary, ShoeLog, ShoeSummary, User, UserPublic,
};
use crate::pagination::Page;

/// One page of a listing with its reference tables
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T, R> {
    /// Visible items of this page
    pub items: Vec<T>,
    /// Public projections of the owners of `items`
    pub users: HashMap<Uuid, UserPublic>,
    /// Public projections of the entities `items` point at
    pub references: HashMap<Uuid, R>,
    /// Mean score over all matches (rating-like listings only)
    pub average: Option<f64>,
    /// Page that was served
    pub page: Page,
}

impl<T, R> Listing<T, R> {
    fn empty(page: Page, average: Option<f64>) -> Self {
        Self {
            items: Vec::new(),
            users: HashMap::new(),
            references: HashMap::new(),
            average,
            page,
        }
    }
}

/// Listing of `T` as returned by [`list`]
pub type ListingOf<T> = Listing<T, ReferenceSummary<T>>;

/// List one page of `T` matching `filter`, as seen by `requester`
///
/// # Errors
///
/// Returns an error on malformed filters or storage failure
pub async fn list<T: Listable>(
    database: &Database,
    requester: Option<&User>,
    filter: &Filter,
    page: Page,
) -> AppResult<ListingOf<T>> {
    let page = Page::sanitize(Some(i64::from(page.offset)), Some(i64::from(page.limit)));
    let store = database.collection::<T>();

    let matches = store
        .find(
            filter,
            &FindOptions::page(Sort::ascending(fields::CREATED_AT), page),
        )
        .await?;

    let average = match T::RATING_FIELD {
        Some(field) => store.average(filter, field).await?,
        None => None,
    };

    if matches.is_empty() {
        return Ok(Listing::empty(page, average));
    }

    let authorized = authorize(database, requester, matches).await?;
    Ok(Listing {
        items: authorized.items,
        users: authorized.users,
        references: authorized.references,
        average,
        page,
    })
}

/// Attempts matching `filter`
///
/// # Errors
///
/// See [`list`]
pub async fn list_attempts(
    database: &Database,
    requester: Option<&User>,
    filter: &Filter,
    page: Page,
) -> AppResult<Listing<Attempt, RouteSummary>> {
    list(database, requester, filter, page).await
}

/// Routes marked as projects, matching `filter`
///
/// # Errors
///
/// See [`list`]
pub async fn list_interests(
    database: &Database,
    requester: Option<&User>,
    filter: &Filter,
    page: Page,
) -> AppResult<Listing<Interest, RouteSummary>> {
    list(database, requester, filter, page).await
}

/// Climbing sessions matching `filter`
///
/// # Errors
///
/// See [`list`]
pub async fn list_sessions(
    database: &Database,
    requester: Option<&User>,
    filter: &Filter,
    page: Page,
) -> AppResult<Listing<ClimbingSession, LocationSummary>> {
    list(database, requester, filter, page).await
}

/// Shoe usage records matching `filter`
///
/// # Errors
///
/// See [`list`]
pub async fn list_shoe_logs(
    database: &Database,
    requester: Option<&User>,
    filter: &Filter,
    page: Page,
) -> AppResult<Listing<ShoeLog, ShoeSummary>> {
    list(database, requester, filter, page).await
}

/// Ratings of one route, with the route's mean rating
///
/// # Errors
///
/// See [`list`]
pub async fn list_route_ratings(
    database: &Database,
    requester: Option<&User>,
    route: Uuid,
    page: Page,
) -> AppResult<Listing<RouteRating, RouteSummary>> {
    list(database, requester, &Filter::eq("route", route), page).await
}

/// Reviews of one location, with the location's mean rating
///
/// # Errors
///
/// See [`list`]
pub async fn list_location_reviews(
    database: &Database,
    requester: Option<&User>,
    location: Uuid,
    page: Page,
) -> AppResult<Listing<LocationReview, LocationSummary>> {
    list(database, requester, &Filter::eq("location", location), page).await
}
