// ABOUTME: Owner scoping for queries and mutations on owned records
// ABOUTME: Forces non-admin principals onto their own owner id via each type's owner field
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use tracing::info;
use uuid::Uuid;

use crate::database_plugins::filter::UpdateOp;
use crate::database_plugins::{Collection, Dao, Database, Filter, Update};
use crate::errors::{AppError, AppResult};
use crate::models::{Owned, User};

/// Restrict `filter` to the records `requester` may act on
///
/// Administrators may name any owner (or none, meaning every owner);
/// everyone else is pinned to their own id whatever they asked for.
#[must_use]
pub fn scoped_filter<T: Owned>(
    requester: &User,
    requested_owner: Option<Uuid>,
    filter: Filter,
) -> Filter {
    let owner = if requester.is_admin {
        requested_owner
    } else {
        Some(requester.id)
    };
    match owner {
        Some(owner) => filter.and(Filter::eq(T::OWNER_FIELD, owner)),
        None => filter,
    }
}

fn touches_owner<T: Owned>(update: &Update) -> bool {
    update.ops().iter().any(|op| {
        let path = match op {
            UpdateOp::Set(path, _) | UpdateOp::Inc(path, _) | UpdateOp::Unset(path) => path,
        };
        path.split('.').next() == Some(T::OWNER_FIELD)
    })
}

/// Apply `update` to record `id` if `requester` owns it (or is an admin)
///
/// Returns whether the record was modified; never upserts.
///
/// # Errors
///
/// Returns `InvalidInput` if the update rewrites the owner field, or a
/// storage error
pub async fn update_owned<T: Owned + Collection>(
    database: &Database,
    requester: &User,
    id: Uuid,
    update: &Update,
) -> AppResult<bool> {
    if touches_owner::<T>(update) {
        return Err(AppError::invalid_input(format!(
            "The '{}' field of {} cannot be changed",
            T::OWNER_FIELD,
            T::COLLECTION
        )));
    }
    let filter = scoped_filter::<T>(requester, None, Filter::by_id(id));
    database
        .collection::<T>()
        .update_one(&filter, update, false)
        .await
}

/// Delete record `id` if `requester` owns it (or is an admin)
///
/// # Errors
///
/// Returns an error on storage failure
pub async fn delete_owned<T: Owned + Collection>(
    database: &Database,
    requester: &User,
    id: Uuid,
) -> AppResult<bool> {
    let filter = scoped_filter::<T>(requester, None, Filter::by_id(id));
    let removed = database.collection::<T>().delete(&filter).await? > 0;
    if removed {
        info!(
            collection = T::COLLECTION,
            record.id = %id,
            user.id = %requester.id,
            "owned record deleted"
        );
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attempt, Location};

    fn principal(is_admin: bool) -> User {
        let mut user = User::new("u", "u@example.com", "hash");
        user.id = Uuid::new_v4();
        user.is_admin = is_admin;
        user
    }

    #[test]
    fn test_non_admin_is_pinned_to_self() {
        let user = principal(false);
        let other = Uuid::new_v4();
        let filter = scoped_filter::<Attempt>(&user, Some(other), Filter::All);
        assert_eq!(filter, Filter::eq("user", user.id));
    }

    #[test]
    fn test_admin_may_target_any_owner() {
        let admin = principal(true);
        let other = Uuid::new_v4();
        assert_eq!(
            scoped_filter::<Location>(&admin, Some(other), Filter::All),
            Filter::eq("submitted_by", other)
        );
        assert_eq!(
            scoped_filter::<Location>(&admin, None, Filter::All),
            Filter::All
        );
    }

    #[test]
    fn test_owner_field_updates_detected() {
        assert!(touches_owner::<Attempt>(&Update::new().set("user", Uuid::new_v4())));
        assert!(!touches_owner::<Attempt>(&Update::new().set("outcome", "flash")));
    }
}
