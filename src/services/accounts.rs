// ABOUTME: Account administration: per-resource privacy changes and account deletion
// ABOUTME: Deletion cascades over every dependent collection sequentially, without a transaction
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Accounts
//!
//! [`delete_account`] removes a principal's records collection by collection
//! and only then the principal itself. There is no transaction around the
//! steps: a failure partway leaves the collections not yet processed intact,
//! and the returned error names the step that failed. Re-running the deletion
//! finishes the job.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database_plugins::{Collection, Dao, Database, Filter, Update};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::{
    Attempt, ClimbingSession, Follow, Interest, Location, LocationReview, Owned, Privacy,
    ResourceKind, Route, RouteRating, SessionToken, Shoe, ShoeLog, User,
};

/// Change one privacy setting of `user_id`
///
/// Returns whether the stored setting changed.
///
/// # Errors
///
/// Returns `ResourceNotFound` if the user does not exist, or a storage error
pub async fn set_privacy(
    database: &Database,
    user_id: Uuid,
    kind: ResourceKind,
    privacy: Privacy,
) -> AppResult<bool> {
    let users = database.users();
    if users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::not_found(format!("User {user_id}")));
    }
    let changed = users
        .update_one(
            &Filter::by_id(user_id),
            &Update::new().set(kind.document_path(), privacy),
            false,
        )
        .await?;
    if changed {
        info!(user.id = %user_id, resource = %kind, privacy = %privacy, "privacy updated");
    }
    Ok(changed)
}

/// Records removed by [`delete_account`], per collection in deletion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    /// `(collection, removed)` for every dependent collection
    pub removed: Vec<(&'static str, u64)>,
    /// Whether the user record itself existed and was removed
    pub user_deleted: bool,
}

impl DeletionReport {
    /// Dependent records removed across all collections
    #[must_use]
    pub fn total(&self) -> u64 {
        self.removed.iter().map(|(_, count)| count).sum()
    }

    /// Records removed from one collection
    #[must_use]
    pub fn removed_from(&self, collection: &str) -> u64 {
        self.removed
            .iter()
            .find(|(name, _)| *name == collection)
            .map_or(0, |(_, count)| *count)
    }

    async fn purge<T: Owned + Collection>(
        &mut self,
        database: &Database,
        user_id: Uuid,
    ) -> AppResult<()> {
        self.purge_where::<T>(database, Filter::eq(T::OWNER_FIELD, user_id))
            .await
    }

    async fn purge_where<T: Collection>(
        &mut self,
        database: &Database,
        filter: Filter,
    ) -> AppResult<()> {
        let removed = database
            .collection::<T>()
            .delete(&filter)
            .await
            .map_err(|e| {
                warn!(
                    collection = T::COLLECTION,
                    completed = self.removed.len(),
                    "account deletion stopped partway: {e}"
                );
                AppError::new(
                    e.code,
                    format!("Account deletion failed at '{}': {}", T::COLLECTION, e.message),
                )
            })?;
        AppLogger::log_database_operation("delete_account", T::COLLECTION, removed);
        match self.removed.iter_mut().find(|(name, _)| *name == T::COLLECTION) {
            Some((_, count)) => *count += removed,
            None => self.removed.push((T::COLLECTION, removed)),
        }
        Ok(())
    }
}

/// Delete a principal and everything that references it
///
/// Sessions are revoked first so that the account stops working as soon as
/// deletion starts.
///
/// # Errors
///
/// Returns the first storage error; earlier steps are not rolled back
pub async fn delete_account(database: &Database, user_id: Uuid) -> AppResult<DeletionReport> {
    let mut report = DeletionReport::default();

    report.purge::<SessionToken>(database, user_id).await?;
    report.purge::<Attempt>(database, user_id).await?;
    report.purge::<Interest>(database, user_id).await?;
    report.purge::<ClimbingSession>(database, user_id).await?;
    report.purge::<ShoeLog>(database, user_id).await?;
    report.purge::<Shoe>(database, user_id).await?;
    report.purge::<RouteRating>(database, user_id).await?;
    report.purge::<LocationReview>(database, user_id).await?;
    report.purge::<Follow>(database, user_id).await?;
    report
        .purge_where::<Follow>(database, Filter::eq("followee", user_id))
        .await?;
    report.purge::<Route>(database, user_id).await?;
    report.purge::<Location>(database, user_id).await?;

    report.user_deleted = database.collection::<User>().delete_by_id(user_id).await?;
    AppLogger::log_security_event(
        "account_deleted",
        &format!("{} dependent record(s) removed", report.total()),
        Some(&user_id.to_string()),
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let report = DeletionReport {
            removed: vec![("tokens", 2), ("attempts", 5), ("follows", 1)],
            user_deleted: true,
        };
        assert_eq!(report.total(), 8);
        assert_eq!(report.removed_from("attempts"), 5);
        assert_eq!(report.removed_from("shoes"), 0);
    }
}
