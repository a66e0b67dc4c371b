use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use keygate_core::{
    CreateOutcome, Session, SessionRepository, StoreError, UnitOfWork, UnitOfWorkStarter,
    UpdateOutcome, User, UserRepository,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
}

/// In-process store with real transaction semantics.
///
/// A unit of work holds the store lock for its whole scope — concurrent
/// units of work serialize, the coarse equivalent of the SQL store's row
/// locks — and edits a scratch copy that replaces the shared state only on
/// commit. Rollback and drop discard the scratch copy.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWorkStarter for MemoryStore {
    async fn start(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let shared = self.state.clone().lock_owned().await;
        let working = shared.clone();
        Ok(Box::new(MemoryUnitOfWork { shared, working }))
    }
}

pub struct MemoryUnitOfWork {
    shared: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UserRepository for MemoryUnitOfWork {
    async fn try_create(&mut self, user: &User) -> Result<CreateOutcome, StoreError> {
        let taken = self.working.users.contains_key(&user.id)
            || self.working.users.values().any(|u| u.name == user.name);
        if taken {
            return Ok(CreateOutcome::Conflict);
        }

        self.working.users.insert(user.id, user.clone());
        Ok(CreateOutcome::Created)
    }

    async fn try_get_by_name(&mut self, name: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.name == name)
            .cloned())
    }

    async fn try_update(&mut self, user: &User) -> Result<UpdateOutcome, StoreError> {
        let taken = self
            .working
            .users
            .values()
            .any(|u| u.id != user.id && u.name == user.name);
        if taken {
            return Ok(UpdateOutcome::Conflict);
        }

        // A vanished row updates zero rows, which is not a conflict.
        if let Some(stored) = self.working.users.get_mut(&user.id) {
            *stored = user.clone();
        }
        Ok(UpdateOutcome::Updated)
    }

    async fn try_delete(&mut self, user_id: Uuid) -> Result<bool, StoreError> {
        let removed = self.working.users.remove(&user_id).is_some();
        if removed {
            self.working.sessions.retain(|_, s| s.user_id != user_id);
        }
        Ok(removed)
    }

    async fn exists(&mut self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.working.users.contains_key(&user_id))
    }
}

#[async_trait]
impl SessionRepository for MemoryUnitOfWork {
    async fn create(&mut self, session: &Session) -> Result<(), StoreError> {
        if self.working.sessions.contains_key(&session.refresh_token) {
            return Err(StoreError::new("duplicate refresh token"));
        }

        self.working
            .sessions
            .insert(session.refresh_token, session.clone());
        Ok(())
    }

    async fn try_get_by_refresh_token(
        &mut self,
        refresh_token: Uuid,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self.working.sessions.get(&refresh_token).cloned())
    }

    async fn delete(&mut self, refresh_token: Uuid) -> Result<(), StoreError> {
        self.working.sessions.remove(&refresh_token);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork {
            mut shared,
            working,
        } = *self;
        *shared = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
