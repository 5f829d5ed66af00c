// ABOUTME: Entity and ownership traits implemented by every persisted model
// ABOUTME: Declares collection names, identifiers, indexed fields and owner-reference fields
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// A persisted item stored in exactly one collection
///
/// The identifier is `Uuid::nil()` until the item is created through a DAO,
/// which assigns a fresh one; afterwards it never changes.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table) name for this entity type
    const COLLECTION: &'static str;

    /// Fields the durable backend indexes for lookups
    const INDEXED_FIELDS: &'static [&'static str] = &[];

    /// Current identifier (nil when not yet created)
    fn id(&self) -> Uuid;

    /// Set the identifier; only DAOs call this, at creation
    fn assign_id(&mut self, id: Uuid);
}

/// An entity created by, and attributed to, a single principal
pub trait Owned: Entity {
    /// Document field holding the owner's user id
    const OWNER_FIELD: &'static str;

    /// The owner's user id
    fn owner(&self) -> Uuid;
}

/// Implement [`Entity`] for a struct with a `pub id: Uuid` field
macro_rules! impl_entity {
    ($ty:ty, $collection:expr $(, indexed = [$($indexed:expr),* $(,)?])?) => {
        impl $crate::models::Entity for $ty {
            const COLLECTION: &'static str = $collection;
            const INDEXED_FIELDS: &'static [&'static str] = &[$($($indexed),*)?];

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn assign_id(&mut self, id: ::uuid::Uuid) {
                self.id = id;
            }
        }
    };
}

/// Implement [`Owned`] for a struct whose owner field is a `Uuid`
macro_rules! impl_owned {
    ($ty:ty, $field:ident) => {
        impl $crate::models::Owned for $ty {
            const OWNER_FIELD: &'static str = stringify!($field);

            fn owner(&self) -> ::uuid::Uuid {
                self.$field
            }
        }
    };
}

pub(crate) use impl_entity;
pub(crate) use impl_owned;
