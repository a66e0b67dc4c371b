use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use keygate_core::{
    CreateOutcome, Session, SessionRepository, StoreError, UnitOfWork, UnitOfWorkStarter,
    UpdateOutcome, User, UserRepository,
};

/// Opens one PostgreSQL transaction per unit of work.
pub struct PostgresUnitOfWorkStarter {
    pool: PgPool,
}

impl PostgresUnitOfWorkStarter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkStarter for PostgresUnitOfWorkStarter {
    async fn start(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await.map_err(StoreError::new)?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

/// Transaction-scoped repositories. Dropping the value without an explicit
/// commit rolls the transaction back, which also covers a cancelled
/// request future.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    name: String,
    password_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::new(row.id, row.created_at, row.name, row.password_hash)
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    refresh_token: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session::new(row.refresh_token, row.user_id, row.expires_at)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation))
}

#[async_trait]
impl UserRepository for PostgresUnitOfWork {
    #[tracing::instrument(name = "Insert user row", skip_all)]
    async fn try_create(&mut self, user: &User) -> Result<CreateOutcome, StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (id, created_at, name, password_hash) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(user.created_at)
        .bind(&user.name)
        .bind(&user.password_hash)
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(StoreError::new(err)),
        }
    }

    async fn try_get_by_name(&mut self, name: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, created_at, name, password_hash FROM users WHERE name = $1 FOR UPDATE",
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::new)?;

        Ok(row.map(User::from))
    }

    #[tracing::instrument(name = "Update user row", skip_all)]
    async fn try_update(&mut self, user: &User) -> Result<UpdateOutcome, StoreError> {
        let result = sqlx::query("UPDATE users SET name = $2, password_hash = $3 WHERE id = $1")
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.password_hash)
            .execute(&mut *self.tx)
            .await;

        match result {
            Ok(_) => Ok(UpdateOutcome::Updated),
            Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::Conflict),
            Err(err) => Err(StoreError::new(err)),
        }
    }

    #[tracing::instrument(name = "Delete user row", skip_all)]
    async fn try_delete(&mut self, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::new)?;

        Ok(result.rows_affected() != 0)
    }

    async fn exists(&mut self, user_id: Uuid) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(StoreError::new)
    }
}

#[async_trait]
impl SessionRepository for PostgresUnitOfWork {
    #[tracing::instrument(name = "Insert session row", skip_all)]
    async fn create(&mut self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (refresh_token, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(session.refresh_token)
        .bind(session.user_id)
        .bind(session.expires_at)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::new)?;

        Ok(())
    }

    async fn try_get_by_refresh_token(
        &mut self,
        refresh_token: Uuid,
    ) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT refresh_token, user_id, expires_at FROM sessions \
             WHERE refresh_token = $1 FOR UPDATE",
        )
        .bind(refresh_token)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::new)?;

        Ok(row.map(Session::from))
    }

    #[tracing::instrument(name = "Delete session row", skip_all)]
    async fn delete(&mut self, refresh_token: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE refresh_token = $1")
            .bind(refresh_token)
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::new)?;

        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(StoreError::new)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(StoreError::new)
    }
}
