// ABOUTME: Volatile in-process DAO backend holding documents in insertion order
// ABOUTME: Intended for tests and ephemeral deployments; nothing survives a restart
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::document::{self, Document};
use super::filter::{validate_field, Filter, Projection, Update};
use super::{Dao, FindOptions};
use crate::errors::{AppError, AppResult};
use crate::models::Entity;

/// In-memory collection of `T`
///
/// Documents live in a `Vec` so that the unsorted order is insertion order.
/// Every operation holds the lock for its whole duration, which makes each
/// call atomic with respect to the others.
pub struct MemoryDao<T> {
    store: Arc<RwLock<Vec<Document>>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for MemoryDao<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Default for MemoryDao<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryDao<T> {
    /// Empty collection
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Vec::new())),
            _entity: PhantomData,
        }
    }

    /// Matching documents, sorted and paged
    async fn select(&self, filter: &Filter, options: &FindOptions) -> AppResult<Vec<Document>> {
        filter.validate()?;
        options.sort.validate()?;
        let store = self.store.read().await;
        let mut matched: Vec<&Document> = store
            .iter()
            .filter(|doc| document::matches(doc, filter))
            .collect();
        if !options.sort.is_empty() {
            matched.sort_by(|a, b| document::compare(a, b, &options.sort));
        }
        let limit = options.limit.map_or(usize::MAX, |limit| limit as usize);
        let page: Vec<Document> = matched
            .into_iter()
            .skip(options.offset as usize)
            .take(limit)
            .cloned()
            .collect();
        debug!(
            collection = T::COLLECTION,
            rows = page.len(),
            "memory select"
        );
        Ok(page)
    }

    fn decode_all(documents: Vec<Document>) -> AppResult<Vec<T>> {
        documents.into_iter().map(document::from_document).collect()
    }

    /// Apply `update` to up to `limit` matches; returns modified count
    async fn modify(
        &self,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        limit: usize,
    ) -> AppResult<u64> {
        filter.validate()?;
        update.validate()?;
        let mut store = self.store.write().await;

        let mut matched = 0_usize;
        let mut modified = 0_u64;
        for slot in store.iter_mut() {
            if matched == limit {
                break;
            }
            if !document::matches(slot, filter) {
                continue;
            }
            matched += 1;
            if let Some(revised) = document::revise::<T>(slot, update)? {
                *slot = revised;
                modified += 1;
            }
        }

        if matched == 0 && upsert {
            store.push(document::upsert_document::<T>(filter, update)?);
            modified = 1;
        }
        debug!(
            collection = T::COLLECTION,
            matched, modified, "memory update"
        );
        Ok(modified)
    }
}

#[async_trait]
impl<T: Entity> Dao<T> for MemoryDao<T> {
    async fn create(&self, mut item: T) -> AppResult<T> {
        if item.id().is_nil() {
            item.assign_id(Uuid::new_v4());
        }
        let id = item.id();
        let stored = document::to_document(&item)?;

        let mut store = self.store.write().await;
        if store.iter().any(|doc| document::document_id(doc) == Some(id)) {
            return Err(AppError::already_exists(format!(
                "{} item {id}",
                T::COLLECTION
            )));
        }
        store.push(stored.clone());
        drop(store);

        debug!(collection = T::COLLECTION, %id, "memory create");
        document::from_document(stored)
    }

    async fn find_one(&self, filter: &Filter) -> AppResult<Option<T>> {
        let mut found = self.select(filter, &FindOptions::unbounded().take(1)).await?;
        found.pop().map(document::from_document).transpose()
    }

    async fn find_one_projected(
        &self,
        filter: &Filter,
        projection: &Projection,
    ) -> AppResult<Option<Document>> {
        projection.validate()?;
        let mut found = self.select(filter, &FindOptions::unbounded().take(1)).await?;
        Ok(found.pop().map(|doc| document::project(&doc, projection)))
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> AppResult<Vec<T>> {
        Self::decode_all(self.select(filter, options).await?)
    }

    async fn find_projected(
        &self,
        filter: &Filter,
        projection: &Projection,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        projection.validate()?;
        Ok(self
            .select(filter, options)
            .await?
            .iter()
            .map(|doc| document::project(doc, projection))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<T>> {
        self.find_one(&Filter::by_id(id)).await
    }

    async fn delete(&self, filter: &Filter) -> AppResult<u64> {
        filter.validate()?;
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|doc| !document::matches(doc, filter));
        let removed = (before - store.len()) as u64;
        drop(store);
        debug!(collection = T::COLLECTION, removed, "memory delete");
        Ok(removed)
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.delete(&Filter::by_id(id)).await? == 1)
    }

    async fn update_one(&self, filter: &Filter, update: &Update, upsert: bool) -> AppResult<bool> {
        Ok(self.modify(filter, update, upsert, 1).await? > 0)
    }

    async fn update_many(&self, filter: &Filter, update: &Update, upsert: bool) -> AppResult<u64> {
        self.modify(filter, update, upsert, usize::MAX).await
    }

    async fn count(&self, filter: &Filter) -> AppResult<u64> {
        filter.validate()?;
        let store = self.store.read().await;
        Ok(store
            .iter()
            .filter(|doc| document::matches(doc, filter))
            .count() as u64)
    }

    async fn average(&self, filter: &Filter, field: &str) -> AppResult<Option<f64>> {
        filter.validate()?;
        validate_field(field)?;
        let store = self.store.read().await;
        Ok(document::average(
            store.iter().filter(|doc| document::matches(doc, filter)),
            field,
        ))
    }

    async fn clear(&self) -> AppResult<()> {
        self.store.write().await.clear();
        debug!(collection = T::COLLECTION, "memory clear");
        Ok(())
    }
}
