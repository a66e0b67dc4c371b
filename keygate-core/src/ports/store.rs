use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{session::Session, user::User};

/// Storage-layer fault: the store is unreachable, a statement failed, a
/// commit was rejected. Business conflicts never travel through this type;
/// they are soft-fail outcomes on the repository methods.
#[derive(Debug, Error)]
#[error("storage failure: {message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self {
            message: cause.to_string(),
        }
    }
}

/// Outcome of an insert that may hit a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Conflict,
}

/// Outcome of a conditional update that may hit a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    Conflict,
}

#[async_trait]
pub trait UserRepository: Send {
    /// Inserts the user; reports `Conflict` instead of failing when the
    /// name is already taken.
    async fn try_create(&mut self, user: &User) -> Result<CreateOutcome, StoreError>;

    /// Fetches the user row under an exclusive row lock, so a concurrent
    /// credential change serializes behind this read. Absence is a normal
    /// `None`, not an error.
    async fn try_get_by_name(&mut self, name: &str) -> Result<Option<User>, StoreError>;

    /// Writes `name` and `password_hash` for the user's id; reports
    /// `Conflict` when the new name collides with another user.
    async fn try_update(&mut self, user: &User) -> Result<UpdateOutcome, StoreError>;

    /// Returns whether a row was actually removed.
    async fn try_delete(&mut self, user_id: Uuid) -> Result<bool, StoreError>;

    async fn exists(&mut self, user_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SessionRepository: Send {
    async fn create(&mut self, session: &Session) -> Result<(), StoreError>;

    /// Fetches the session under an exclusive row lock; concurrent refresh
    /// attempts with the same token serialize here.
    async fn try_get_by_refresh_token(
        &mut self,
        refresh_token: Uuid,
    ) -> Result<Option<Session>, StoreError>;

    async fn delete(&mut self, refresh_token: Uuid) -> Result<(), StoreError>;
}

/// One transaction scope. The value is owned by exactly one logical
/// operation and must be closed exactly once, by `commit` or `rollback`,
/// on every exit path. Dropping it without either must roll the underlying
/// transaction back (cancellation safety).
#[async_trait]
pub trait UnitOfWork: UserRepository + SessionRepository + Send {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

impl dyn UnitOfWork + '_ {
    pub fn users(&mut self) -> &mut dyn UserRepository {
        self
    }

    pub fn sessions(&mut self) -> &mut dyn SessionRepository {
        self
    }
}

#[async_trait]
pub trait UnitOfWorkStarter: Send + Sync {
    /// Opens a transaction; fails when the store is unreachable.
    async fn start(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}
