use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use super::domain::{Role, Session, SessionId, SessionState, UserRecord};
use super::repository::{SessionRefresh, SessionStore, StoreError, UserRepository};

/// Login, signup and inactivity expiry over pluggable stores.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    timeout: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Role for an exact username/password match.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<Role>, AuthError> {
        let role = self
            .users
            .find(username)?
            .filter(|record| record.password == password)
            .map(|record| record.role);
        Ok(role)
    }

    pub fn signup(&self, username: &str, password: &str, role: Role) -> Result<(), AuthError> {
        match self.users.insert(UserRecord::new(username, password, role)) {
            Ok(()) => {
                info!(username, %role, "account created");
                Ok(())
            }
            Err(StoreError::Conflict) => Err(AuthError::UsernameTaken),
            Err(other) => Err(other.into()),
        }
    }

    /// LoggedOut -> LoggedIn.
    pub fn open_session(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let role = self
            .login(username, password)?
            .ok_or(AuthError::InvalidCredentials)?;

        let pruned = self.sessions.prune(now, self.timeout)?;
        if pruned > 0 {
            debug!(pruned, "idle sessions pruned");
        }

        let session = Session {
            id: SessionId::generate(),
            username: username.to_string(),
            role,
            state: SessionState::LoggedIn,
            last_active: now,
        };
        self.sessions.save(session.clone())?;
        info!(username, %role, "login successful");
        Ok(session)
    }

    /// Expiry check run on every page render. Refreshes `last_active`, or
    /// logs the session out and drops it when the gap exceeds the timeout.
    pub fn touch(&self, id: &SessionId, now: DateTime<Utc>) -> Result<Session, AuthError> {
        match self.sessions.refresh(id, now, self.timeout)? {
            SessionRefresh::Active(session) => Ok(session),
            SessionRefresh::Expired(session) => {
                info!(username = %session.username, "session expired due to inactivity");
                Err(AuthError::SessionExpired)
            }
            SessionRefresh::Missing => Err(AuthError::NotLoggedIn),
        }
    }

    /// LoggedIn -> LoggedOut.
    pub fn logout(&self, id: &SessionId) -> Result<(), AuthError> {
        match self.sessions.remove(id)? {
            Some(session) => {
                info!(username = %session.username, "logged out");
                Ok(())
            }
            None => Err(AuthError::NotLoggedIn),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("Username already exists. Please choose a different username.")]
    UsernameTaken,
    #[error("Please log in to continue.")]
    NotLoggedIn,
    #[error("Session expired due to inactivity.")]
    SessionExpired,
    #[error(transparent)]
    Store(#[from] StoreError),
}
