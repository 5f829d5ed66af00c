// ABOUTME: Follow graph operations over the follows collection
// ABOUTME: Follow, unfollow and paged follower/following lookups with public projections
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use super::visibility::find_by_ids;
use crate::constants::fields;
use crate::database_plugins::{Dao, Database, Filter, FindOptions, Sort};
use crate::errors::{AppError, AppResult};
use crate::models::{Follow, User, UserPublic};
use crate::pagination::Page;

const FOLLOWER: &str = "follower";
const FOLLOWEE: &str = "followee";

fn edge(follower: Uuid, followee: Uuid) -> Filter {
    Filter::eq(FOLLOWER, follower).and(Filter::eq(FOLLOWEE, followee))
}

/// Make `follower` follow `followee`
///
/// # Errors
///
/// Returns `InvalidInput` for a self-follow, `ResourceNotFound` if the
/// followee does not exist, `ResourceAlreadyExists` if the edge exists, or a
/// storage error
pub async fn follow(database: &Database, follower: &User, followee: Uuid) -> AppResult<Follow> {
    if follower.id == followee {
        return Err(AppError::invalid_input("Users cannot follow themselves"));
    }
    if database.users().find_by_id(followee).await?.is_none() {
        return Err(AppError::not_found(format!("User {followee}")));
    }
    let follows = database.follows();
    if follows.count(&edge(follower.id, followee)).await? > 0 {
        return Err(AppError::already_exists("Follow"));
    }
    let created = follows.create(Follow::new(follower.id, followee)).await?;
    info!(follower = %follower.id, followee = %followee, "follow created");
    Ok(created)
}

/// Remove the `follower -> followee` edge; `true` iff it existed
///
/// # Errors
///
/// Returns an error on storage failure
pub async fn unfollow(database: &Database, follower: &User, followee: Uuid) -> AppResult<bool> {
    Ok(database.follows().delete(&edge(follower.id, followee)).await? > 0)
}

/// Resolve the `pick` end of each edge to public projections, keeping edge order
async fn resolve(
    database: &Database,
    edges: &[Follow],
    pick: fn(&Follow) -> Uuid,
) -> AppResult<Vec<UserPublic>> {
    let ids: Vec<Uuid> = edges.iter().map(pick).collect();
    let users: HashMap<Uuid, UserPublic> = find_by_ids::<User>(database, &ids)
        .await?
        .iter()
        .map(|user| (user.id, user.public_view()))
        .collect();
    Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
}

async fn page_edges(database: &Database, filter: Filter, page: Page) -> AppResult<Vec<Follow>> {
    database
        .follows()
        .find(
            &filter,
            &FindOptions::page(Sort::ascending(fields::CREATED_AT), page),
        )
        .await
}

/// Principals following `user_id`, oldest edge first
///
/// # Errors
///
/// Returns an error on storage failure
pub async fn followers(database: &Database, user_id: Uuid, page: Page) -> AppResult<Vec<UserPublic>> {
    let edges = page_edges(database, Filter::eq(FOLLOWEE, user_id), page).await?;
    resolve(database, &edges, |edge| edge.follower).await
}

/// Principals `user_id` follows, oldest edge first
///
/// # Errors
///
/// Returns an error on storage failure
pub async fn following(database: &Database, user_id: Uuid, page: Page) -> AppResult<Vec<UserPublic>> {
    let edges = page_edges(database, Filter::eq(FOLLOWER, user_id), page).await?;
    resolve(database, &edges, |edge| edge.followee).await
}
