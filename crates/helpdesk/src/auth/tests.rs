use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

use super::repository::{SessionStore, StoreError, UserRepository};
use super::*;

fn at(minute: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).single().expect("valid") + Duration::minutes(minute)
}

fn build_service() -> (AuthService, InMemorySessionStore) {
    let sessions = InMemorySessionStore::default();
    let service = AuthService::new(
        Arc::new(InMemoryUserRepository::seeded()),
        Arc::new(sessions.clone()),
        Duration::minutes(15),
    );
    (service, sessions)
}

struct UnavailableUsers;

impl UserRepository for UnavailableUsers {
    fn insert(&self, _record: UserRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn find(&self, _username: &str) -> Result<Option<UserRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

#[test]
fn seeded_accounts_log_in_with_their_roles() {
    let (service, _) = build_service();
    assert_eq!(service.login("admin", "admin123").expect("lookup"), Some(Role::Admin));
    assert_eq!(
        service.login("doc_checker", "doc456").expect("lookup"),
        Some(Role::DocumentChecker)
    );
    assert_eq!(
        service.login("loan_agent", "loan789").expect("lookup"),
        Some(Role::LoanAgent)
    );
}

#[test]
fn wrong_password_or_unknown_user_returns_none() {
    let (service, _) = build_service();
    assert_eq!(service.login("admin", "wrong").expect("lookup"), None);
    assert_eq!(service.login("nobody", "admin123").expect("lookup"), None);
}

#[test]
fn signup_adds_account_once() {
    let (service, _) = build_service();
    service
        .signup("new_agent", "pw", Role::LoanAgent)
        .expect("first signup succeeds");
    assert_eq!(service.login("new_agent", "pw").expect("lookup"), Some(Role::LoanAgent));

    let err = service
        .signup("new_agent", "other", Role::Admin)
        .expect_err("duplicate rejected");
    assert!(matches!(err, AuthError::UsernameTaken));
    assert_eq!(service.login("new_agent", "pw").expect("lookup"), Some(Role::LoanAgent));
}

#[test]
fn seeded_usernames_cannot_be_reused() {
    let (service, _) = build_service();
    let err = service
        .signup("admin", "x", Role::Admin)
        .expect_err("seeded user exists");
    assert_eq!(
        err.to_string(),
        "Username already exists. Please choose a different username."
    );
}

#[test]
fn session_survives_activity_within_timeout() {
    let (service, _) = build_service();
    let session = service
        .open_session("doc_checker", "doc456", at(0))
        .expect("login");

    let refreshed = service.touch(&session.id, at(14)).expect("still active");
    assert_eq!(refreshed.last_active, at(14));
    let refreshed = service.touch(&session.id, at(29)).expect("gap measured from last touch");
    assert_eq!(refreshed.role, Role::DocumentChecker);
}

#[test]
fn exactly_fifteen_minutes_is_not_expired() {
    let (service, _) = build_service();
    let session = service.open_session("admin", "admin123", at(0)).expect("login");
    assert!(service.touch(&session.id, at(15)).is_ok());
}

#[test]
fn inactivity_forces_logout() {
    let (service, sessions) = build_service();
    let session = service.open_session("admin", "admin123", at(0)).expect("login");

    let err = service.touch(&session.id, at(16)).expect_err("expired");
    assert!(matches!(err, AuthError::SessionExpired));

    assert!(sessions.fetch(&session.id).expect("fetch").is_none());
    assert!(sessions.is_empty());

    let err = service.touch(&session.id, at(17)).expect_err("stays logged out");
    assert!(matches!(err, AuthError::NotLoggedIn));
}

#[test]
fn expired_sessions_do_not_accumulate() {
    let (service, sessions) = build_service();
    for round in 0..1000 {
        let session = service.open_session("admin", "admin123", at(0)).expect("login");
        let err = service.touch(&session.id, at(16)).expect_err("expired");
        assert!(matches!(err, AuthError::SessionExpired), "round {round}");
    }
    assert!(sessions.is_empty());
}

#[test]
fn abandoned_sessions_are_pruned_on_next_login() {
    let (service, sessions) = build_service();
    for _ in 0..5 {
        service.open_session("doc_checker", "doc456", at(0)).expect("login");
    }
    let live = service.open_session("loan_agent", "loan789", at(10)).expect("login");
    assert_eq!(sessions.len(), 6);

    service.open_session("admin", "admin123", at(20)).expect("login");
    assert_eq!(sessions.len(), 2);
    assert!(service.touch(&live.id, at(21)).is_ok());
}

#[test]
fn concurrent_activity_cannot_revive_a_logged_out_session() {
    let (service, sessions) = build_service();
    let session = service.open_session("admin", "admin123", at(0)).expect("login");

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let id = session.id;
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let _ = service.touch(&id, at(1));
                }
            })
        })
        .collect();
    service.logout(&session.id).expect("logout");
    for worker in workers {
        worker.join().expect("worker finishes");
    }

    assert!(sessions.fetch(&session.id).expect("fetch").is_none());
    assert!(matches!(
        service.touch(&session.id, at(2)),
        Err(AuthError::NotLoggedIn)
    ));
}

#[test]
fn invalid_credentials_do_not_open_sessions() {
    let (service, sessions) = build_service();
    let err = service
        .open_session("admin", "nope", at(0))
        .expect_err("bad password");
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(sessions.is_empty());
}

#[test]
fn logout_removes_session() {
    let (service, sessions) = build_service();
    let session = service.open_session("loan_agent", "loan789", at(0)).expect("login");
    assert_eq!(sessions.len(), 1);

    service.logout(&session.id).expect("logout");
    assert!(sessions.is_empty());
    assert!(matches!(
        service.logout(&session.id),
        Err(AuthError::NotLoggedIn)
    ));
}

#[test]
fn store_failures_propagate() {
    let service = AuthService::new(
        Arc::new(UnavailableUsers),
        Arc::new(InMemorySessionStore::default()),
        Duration::minutes(15),
    );
    let err = service.login("admin", "admin123").expect_err("store offline");
    assert!(matches!(err, AuthError::Store(StoreError::Unavailable(_))));
}
