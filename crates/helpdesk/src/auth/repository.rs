use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{seed_users, Session, SessionId, SessionState, UserRecord};

/// Credential storage so the auth service can move to a persistent backend.
pub trait UserRepository: Send + Sync {
    fn insert(&self, record: UserRecord) -> Result<(), StoreError>;
    fn find(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
}

/// Outcome of an expiry check made by the store in a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRefresh {
    /// Still live; `last_active` now equals the check time.
    Active(Session),
    /// Removed from the store. Carries the final logged-out snapshot.
    Expired(Session),
    Missing,
}

/// Session storage keyed by the id handed to the client.
pub trait SessionStore: Send + Sync {
    fn save(&self, session: Session) -> Result<(), StoreError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;
    fn remove(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Expiry check and activity refresh as one operation. A session removed
    /// concurrently stays removed.
    fn refresh(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<SessionRefresh, StoreError>;

    /// Drop sessions idle for longer than `timeout`; returns how many went.
    fn prune(&self, now: DateTime<Utc>, timeout: Duration) -> Result<usize, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[derive(Clone)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<String, UserRecord>>>,
}

impl InMemoryUserRepository {
    pub fn empty() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Repository preloaded with the default admin, checker and loan accounts.
    pub fn seeded() -> Self {
        let users = seed_users()
            .into_iter()
            .map(|record| (record.username.clone(), record))
            .collect();
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::seeded()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut guard = lock(&self.users)?;
        if guard.contains_key(&record.username) {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.username.clone(), record);
        Ok(())
    }

    fn find(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let guard = lock(&self.users)?;
        Ok(guard.get(username).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
    pub fn len(&self) -> usize {
        lock(&self.sessions).map(|guard| guard.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn save(&self, session: Session) -> Result<(), StoreError> {
        let mut guard = lock(&self.sessions)?;
        guard.insert(session.id, session);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let guard = lock(&self.sessions)?;
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let mut guard = lock(&self.sessions)?;
        Ok(guard.remove(id))
    }

    fn refresh(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<SessionRefresh, StoreError> {
        let mut guard = lock(&self.sessions)?;
        let expired = match guard.get(id) {
            Some(session) if session.is_logged_in() => session.is_expired(now, timeout),
            _ => return Ok(SessionRefresh::Missing),
        };

        if expired {
            return Ok(match guard.remove(id) {
                Some(mut session) => {
                    session.state = SessionState::LoggedOut;
                    SessionRefresh::Expired(session)
                }
                None => SessionRefresh::Missing,
            });
        }

        Ok(match guard.get_mut(id) {
            Some(session) => {
                session.last_active = now;
                SessionRefresh::Active(session.clone())
            }
            None => SessionRefresh::Missing,
        })
    }

    fn prune(&self, now: DateTime<Utc>, timeout: Duration) -> Result<usize, StoreError> {
        let mut guard = lock(&self.sessions)?;
        let before = guard.len();
        guard.retain(|_, session| session.is_logged_in() && !session.is_expired(now, timeout));
        Ok(before - guard.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::domain::Role;

    #[test]
    fn poisoned_lock_reports_unavailable() {
        let store = InMemorySessionStore::default();
        let sessions = store.sessions.clone();
        let _ = std::thread::spawn(move || {
            let _guard = sessions.lock();
            panic!("writer crashed while holding the lock");
        })
        .join();

        let err = store
            .fetch(&SessionId::generate())
            .expect_err("poisoned store is unavailable");
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn refresh_moves_last_active_forward() {
        let store = InMemorySessionStore::default();
        let start = Utc::now();
        let session = Session {
            id: SessionId::generate(),
            username: "doc_checker".to_string(),
            role: Role::DocumentChecker,
            state: SessionState::LoggedIn,
            last_active: start,
        };
        store.save(session.clone()).expect("save");

        let later = start + Duration::minutes(5);
        match store.refresh(&session.id, later, Duration::minutes(15)) {
            Ok(SessionRefresh::Active(refreshed)) => assert_eq!(refreshed.last_active, later),
            other => panic!("expected active session, got {other:?}"),
        }
        assert!(matches!(
            store.refresh(&SessionId::generate(), later, Duration::minutes(15)),
            Ok(SessionRefresh::Missing)
        ));
    }
}
