//! Credentials and sessions for the helpdesk dashboard.

pub mod domain;
pub mod repository;
mod service;

#[cfg(test)]
mod tests;

pub use domain::{Role, Session, SessionId, SessionState, UserRecord};
pub use repository::{
    InMemorySessionStore, InMemoryUserRepository, SessionRefresh, SessionStore, StoreError,
    UserRepository,
};
pub use service::{AuthError, AuthService};
