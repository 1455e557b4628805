use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Helpdesk roles; each unlocks a different set of dashboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[serde(rename = "Document Checker")]
    DocumentChecker,
    #[serde(rename = "Loan Agent")]
    LoanAgent,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::DocumentChecker => "Document Checker",
            Role::LoanAgent => "Loan Agent",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Admin" => Some(Role::Admin),
            "Document Checker" => Some(Role::DocumentChecker),
            "Loan Agent" => Some(Role::LoanAgent),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored credentials. Passwords are kept in plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
        }
    }
}

/// Accounts present on every fresh start.
pub fn seed_users() -> Vec<UserRecord> {
    vec![
        UserRecord::new("admin", "admin123", Role::Admin),
        UserRecord::new("doc_checker", "doc456", Role::DocumentChecker),
        UserRecord::new("loan_agent", "loan789", Role::LoanAgent),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub username: String,
    pub role: Role,
    pub state: SessionState,
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    /// Idle for strictly longer than `timeout`.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_active > timeout
    }
}
