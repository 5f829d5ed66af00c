// ABOUTME: Database facade aggregating one DAO per collection over the selected backend
// ABOUTME: Owns the connection lifecycle and delegates DAO calls to the volatile or durable store
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Database factory
//!
//! The backend kind is chosen once when the [`Database`] is constructed and
//! never changes afterwards. Each collection is a [`Store`], an enum that
//! delegates every [`Dao`] call to the concrete backend.

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::document::Document;
use super::filter::{Filter, Projection, Update};
use super::memory::MemoryDao;
use super::sqlite::{self, PoolCell, SqliteDao};
use super::{Dao, FindOptions};
use crate::config::database::{render_url, BackendKind, DatabaseConfig};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Attempt, ClimbingSession, Entity, Follow, Interest, Location, LocationReview, Route,
    RouteRating, SessionToken, Shoe, ShoeLog, User,
};

/// One collection on whichever backend the database uses
#[derive(Clone)]
pub enum Store<T> {
    /// Volatile in-memory collection
    Memory(MemoryDao<T>),
    /// Durable SQLite document collection
    Document(SqliteDao<T>),
}

impl<T: Entity> Store<T> {
    fn new(backend: BackendKind, pool: &PoolCell) -> Self {
        match backend {
            BackendKind::Volatile => Self::Memory(MemoryDao::new()),
            BackendKind::Durable => Self::Document(SqliteDao::new(PoolCell::clone(pool))),
        }
    }
}

#[async_trait]
impl<T: Entity> Dao<T> for Store<T> {
    async fn create(&self, item: T) -> AppResult<T> {
        match self {
            Self::Memory(dao) => dao.create(item).await,
            Self::Document(dao) => dao.create(item).await,
        }
    }

    async fn find_one(&self, filter: &Filter) -> AppResult<Option<T>> {
        match self {
            Self::Memory(dao) => dao.find_one(filter).await,
            Self::Document(dao) => dao.find_one(filter).await,
        }
    }

    async fn find_one_projected(
        &self,
        filter: &Filter,
        projection: &Projection,
    ) -> AppResult<Option<Document>> {
        match self {
            Self::Memory(dao) => dao.find_one_projected(filter, projection).await,
            Self::Document(dao) => dao.find_one_projected(filter, projection).await,
        }
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> AppResult<Vec<T>> {
        match self {
            Self::Memory(dao) => dao.find(filter, options).await,
            Self::Document(dao) => dao.find(filter, options).await,
        }
    }

    async fn find_projected(
        &self,
        filter: &Filter,
        projection: &Projection,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        match self {
            Self::Memory(dao) => dao.find_projected(filter, projection, options).await,
            Self::Document(dao) => dao.find_projected(filter, projection, options).await,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<T>> {
        match self {
            Self::Memory(dao) => dao.find_by_id(id).await,
            Self::Document(dao) => dao.find_by_id(id).await,
        }
    }

    async fn delete(&self, filter: &Filter) -> AppResult<u64> {
        match self {
            Self::Memory(dao) => dao.delete(filter).await,
            Self::Document(dao) => dao.delete(filter).await,
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<bool> {
        match self {
            Self::Memory(dao) => dao.delete_by_id(id).await,
            Self::Document(dao) => dao.delete_by_id(id).await,
        }
    }

    async fn update_one(&self, filter: &Filter, update: &Update, upsert: bool) -> AppResult<bool> {
        match self {
            Self::Memory(dao) => dao.update_one(filter, update, upsert).await,
            Self::Document(dao) => dao.update_one(filter, update, upsert).await,
        }
    }

    async fn update_many(&self, filter: &Filter, update: &Update, upsert: bool) -> AppResult<u64> {
        match self {
            Self::Memory(dao) => dao.update_many(filter, update, upsert).await,
            Self::Document(dao) => dao.update_many(filter, update, upsert).await,
        }
    }

    async fn count(&self, filter: &Filter) -> AppResult<u64> {
        match self {
            Self::Memory(dao) => dao.count(filter).await,
            Self::Document(dao) => dao.count(filter).await,
        }
    }

    async fn average(&self, filter: &Filter, field: &str) -> AppResult<Option<f64>> {
        match self {
            Self::Memory(dao) => dao.average(filter, field).await,
            Self::Document(dao) => dao.average(filter, field).await,
        }
    }

    async fn clear(&self) -> AppResult<()> {
        match self {
            Self::Memory(dao) => dao.clear().await,
            Self::Document(dao) => dao.clear().await,
        }
    }
}

/// Process-wide data access facade: one [`Store`] per collection
///
/// Built once at startup (see `ServerResources`) and passed explicitly to
/// every consumer.
#[derive(Clone)]
pub struct Database {
    backend: BackendKind,
    max_connections: u32,
    pool: PoolCell,
    users: Store<User>,
    tokens: Store<SessionToken>,
    locations: Store<Location>,
    routes: Store<Route>,
    sessions: Store<ClimbingSession>,
    attempts: Store<Attempt>,
    interests: Store<Interest>,
    shoes: Store<Shoe>,
    shoe_logs: Store<ShoeLog>,
    ratings: Store<RouteRating>,
    reviews: Store<LocationReview>,
    follows: Store<Follow>,
}

/// Collection name and indexed fields of every entity type
const SCHEMA: [(&str, &[&str]); 12] = [
    (User::COLLECTION, User::INDEXED_FIELDS),
    (SessionToken::COLLECTION, SessionToken::INDEXED_FIELDS),
    (Location::COLLECTION, Location::INDEXED_FIELDS),
    (Route::COLLECTION, Route::INDEXED_FIELDS),
    (ClimbingSession::COLLECTION, ClimbingSession::INDEXED_FIELDS),
    (Attempt::COLLECTION, Attempt::INDEXED_FIELDS),
    (Interest::COLLECTION, Interest::INDEXED_FIELDS),
    (Shoe::COLLECTION, Shoe::INDEXED_FIELDS),
    (ShoeLog::COLLECTION, ShoeLog::INDEXED_FIELDS),
    (RouteRating::COLLECTION, RouteRating::INDEXED_FIELDS),
    (LocationReview::COLLECTION, LocationReview::INDEXED_FIELDS),
    (Follow::COLLECTION, Follow::INDEXED_FIELDS),
];

impl Database {
    /// Build the facade for `backend`; durable stores stay unusable until [`Database::connect`]
    #[must_use]
    pub fn new(backend: BackendKind) -> Self {
        let pool = PoolCell::default();
        Self {
            backend,
            max_connections: crate::config::database::DEFAULT_MAX_CONNECTIONS,
            users: Store::new(backend, &pool),
            tokens: Store::new(backend, &pool),
            locations: Store::new(backend, &pool),
            routes: Store::new(backend, &pool),
            sessions: Store::new(backend, &pool),
            attempts: Store::new(backend, &pool),
            interests: Store::new(backend, &pool),
            shoes: Store::new(backend, &pool),
            shoe_logs: Store::new(backend, &pool),
            ratings: Store::new(backend, &pool),
            reviews: Store::new(backend, &pool),
            follows: Store::new(backend, &pool),
            pool,
        }
    }

    /// In-memory database, ready immediately
    #[must_use]
    pub fn volatile() -> Self {
        Self::new(BackendKind::Volatile)
    }

    /// Durable database, to be connected
    #[must_use]
    pub fn durable() -> Self {
        Self::new(BackendKind::Durable)
    }

    /// Set the pool size used by the durable backend
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Selected backend
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Get a descriptive string for the current database backend
    #[must_use]
    pub const fn backend_info(&self) -> &'static str {
        match self.backend {
            BackendKind::Volatile => "In-memory (volatile)",
            BackendKind::Durable => "SQLite document store (durable)",
        }
    }

    /// Establish the backend connection; calling it again is a no-op
    ///
    /// For the durable backend `{user}` and `{password}` in the URL template
    /// are replaced with the percent-encoded credentials, then every
    /// collection table and index is created if missing.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the durable backend gets no URL, or a
    /// database error if the connection or migration fails
    pub async fn connect(
        &self,
        url: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> AppResult<()> {
        match self.backend {
            BackendKind::Volatile => {
                debug!("volatile database needs no connection");
                Ok(())
            }
            BackendKind::Durable => {
                if let Some(pool) = self.pool.get() {
                    if pool.is_closed() {
                        return Err(AppError::config(
                            "Database was closed; build a new Database to reconnect",
                        ));
                    }
                    return Ok(());
                }
                let template = url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
                    AppError::config("A database URL is required for the durable backend")
                })?;
                let resolved = render_url(template, user, password)?;
                self.pool
                    .get_or_try_init(|| async {
                        let pool = sqlite::open_pool(&resolved, self.max_connections).await?;
                        for (collection, indexed) in SCHEMA {
                            sqlite::migrate_collection(&pool, collection, indexed).await?;
                        }
                        Ok::<_, AppError>(pool)
                    })
                    .await?;
                info!(backend = %self.backend, "database connected");
                Ok(())
            }
        }
    }

    /// Connect using loaded configuration
    ///
    /// # Errors
    ///
    /// See [`Database::connect`]
    pub async fn connect_with_config(&self, config: &DatabaseConfig) -> AppResult<()> {
        self.connect(
            config.url.as_deref(),
            config.user.as_deref(),
            config.password.as_deref(),
        )
        .await
    }

    /// Whether the backend is ready (always true for the volatile backend)
    #[must_use]
    pub fn is_connected(&self) -> bool {
        match self.backend {
            BackendKind::Volatile => true,
            BackendKind::Durable => self.pool.get().is_some_and(|pool| !pool.is_closed()),
        }
    }

    /// Close the durable pool; later calls on this instance fail, including
    /// [`Database::connect`]
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            info!("database connection closed");
        }
    }

    /// Typed access to the store holding `T`
    #[must_use]
    pub fn collection<T: Collection>(&self) -> &Store<T> {
        T::store(self)
    }

    /// Principals
    #[must_use]
    pub const fn users(&self) -> &Store<User> {
        &self.users
    }

    /// Session token records
    #[must_use]
    pub const fn tokens(&self) -> &Store<SessionToken> {
        &self.tokens
    }

    /// Climbing locations
    #[must_use]
    pub const fn locations(&self) -> &Store<Location> {
        &self.locations
    }

    /// Routes
    #[must_use]
    pub const fn routes(&self) -> &Store<Route> {
        &self.routes
    }

    /// Climbing sessions
    #[must_use]
    pub const fn sessions(&self) -> &Store<ClimbingSession> {
        &self.sessions
    }

    /// Attempts
    #[must_use]
    pub const fn attempts(&self) -> &Store<Attempt> {
        &self.attempts
    }

    /// Interests
    #[must_use]
    pub const fn interests(&self) -> &Store<Interest> {
        &self.interests
    }

    /// Shoes
    #[must_use]
    pub const fn shoes(&self) -> &Store<Shoe> {
        &self.shoes
    }

    /// Shoe logs
    #[must_use]
    pub const fn shoe_logs(&self) -> &Store<ShoeLog> {
        &self.shoe_logs
    }

    /// Route ratings
    #[must_use]
    pub const fn ratings(&self) -> &Store<RouteRating> {
        &self.ratings
    }

    /// Location reviews
    #[must_use]
    pub const fn reviews(&self) -> &Store<LocationReview> {
        &self.reviews
    }

    /// Follow edges
    #[must_use]
    pub const fn follows(&self) -> &Store<Follow> {
        &self.follows
    }

    /// Empty every collection (tests and resets only)
    ///
    /// # Errors
    ///
    /// Returns an error if any collection cannot be cleared
    pub async fn clear_all(&self) -> AppResult<()> {
        self.users.clear().await?;
        self.tokens.clear().await?;
        self.locations.clear().await?;
        self.routes.clear().await?;
        self.sessions.clear().await?;
        self.attempts.clear().await?;
        self.interests.clear().await?;
        self.shoes.clear().await?;
        self.shoe_logs.clear().await?;
        self.ratings.clear().await?;
        self.reviews.clear().await?;
        self.follows.clear().await
    }
}

/// Entity types that have a store on [`Database`]
pub trait Collection: Entity {
    /// The store holding this type
    fn store(database: &Database) -> &Store<Self>;
}

macro_rules! impl_collection {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Collection for $ty {
                fn store(database: &Database) -> &Store<Self> {
                    &database.$field
                }
            }
        )*
    };
}

impl_collection! {
    User => users,
    SessionToken => tokens,
    Location => locations,
    Route => routes,
    ClimbingSession => sessions,
    Attempt => attempts,
    Interest => interests,
    Shoe => shoes,
    ShoeLog => shoe_logs,
    RouteRating => ratings,
    LocationReview => reviews,
    Follow => follows,
}
