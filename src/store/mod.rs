//! Persistence ports for users and tasks.
//!
//! Handlers only see the [`UserStore`] and [`TaskStore`] traits through a [`Store`]
//! handle. [`postgres::PgStore`] is the production implementation and
//! [`memory::MemoryStore`] backs development runs and the test suite; both must agree
//! on filtering, ordering, uniqueness and ownership.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Task, TaskPatch, TaskQuery, TaskStats, User};

pub type StoreResult<T> = Result<T, AppError>;

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Fails with `AppError::DuplicateEmail` if the email is taken.
    async fn insert(&self, user: User) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Replaces the stored record with `user`. Returns `None` if the user no longer
    /// exists, `AppError::DuplicateEmail` if the new email belongs to someone else.
    async fn update(&self, user: User) -> StoreResult<Option<User>>;

    /// Removes the user together with every task it owns, as one atomic step. Returns
    /// the number of tasks removed, or `None` if the user did not exist.
    ///
    /// Task inserts for the user that race with this call either complete before it
    /// (and are removed) or fail with `AppError::NotFound`.
    async fn delete_with_tasks(&self, id: Uuid) -> StoreResult<Option<u64>>;
}

/// Task store. Every method takes the owner's id and never touches other users' tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self, owner: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    async fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>>;

    /// Fails with `AppError::NotFound` if the owner does not exist.
    async fn insert(&self, task: Task) -> StoreResult<Task>;

    /// Applies `patch` to the task if it exists and belongs to `owner`.
    async fn update(&self, owner: Uuid, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>>;

    /// Returns whether a task was removed.
    async fn delete(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;

    async fn stats(&self, owner: Uuid) -> StoreResult<TaskStats>;
}

/// The store handle injected into handlers.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
}

impl Store {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self {
            users: store.clone(),
            tasks: store,
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            users: store.clone(),
            tasks: store,
        }
    }
}
