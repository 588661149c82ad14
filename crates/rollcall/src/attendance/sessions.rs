use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveTime;

use super::domain::{Session, SessionId};
use super::repository::{AttendanceRepository, RepositoryError, SessionRepository};

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:04}"))
}

/// Error raised by session administration.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session name must not be empty")]
    EmptyName,
    #[error("session not found")]
    NotFound,
    #[error("the active session cannot be deleted")]
    ActiveSessionProtected,
    #[error("session is referenced by attendance records")]
    SessionInUse,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for SessionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Holds the single globally active attendance session and its late-arrival
/// threshold.
pub struct SessionRegistry<S> {
    store: Arc<S>,
}

impl<S> SessionRegistry<S>
where
    S: SessionRepository + AttendanceRepository,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates an inactive session; activation is a separate, explicit step.
    pub fn create(
        &self,
        name: &str,
        late_threshold: NaiveTime,
    ) -> Result<Session, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }

        let session = Session {
            id: next_session_id(),
            name: name.to_string(),
            late_threshold,
            active: false,
        };
        Ok(self.store.insert_session(session)?)
    }

    pub fn list(&self) -> Result<Vec<Session>, SessionError> {
        Ok(self.store.list_sessions()?)
    }

    pub fn active(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.store.active_session()?)
    }

    /// Makes `id` the single active session. The store performs the
    /// deactivate-all-and-activate-one swap as one atomic operation, so the
    /// at-most-one-active invariant holds under concurrent activations.
    pub fn activate(&self, id: &SessionId) -> Result<Session, SessionError> {
        Ok(self.store.activate_session(id)?)
    }

    /// Deletes a session unless it is active or already referenced by
    /// attendance records.
    pub fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        let session = self
            .store
            .fetch_session(id)?
            .ok_or(SessionError::NotFound)?;
        if session.active {
            return Err(SessionError::ActiveSessionProtected);
        }
        if self.store.session_referenced(id)? {
            return Err(SessionError::SessionInUse);
        }
        Ok(self.store.remove_session(id)?)
    }
}
