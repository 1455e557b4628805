use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use super::DashboardState;
use crate::auth::{AuthError, Role, Session, SessionId};

pub const SESSION_HEADER: &str = "x-session-id";

/// Session id carried by the request, if it parses.
pub(crate) fn session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(SessionId::parse)
}

/// A live session. Extraction runs the inactivity check and refreshes activity.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl FromRequestParts<DashboardState> for CurrentSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DashboardState,
    ) -> Result<Self, Self::Rejection> {
        let id = session_id(&parts.headers)
            .ok_or_else(|| auth_rejection(&AuthError::NotLoggedIn))?;
        state
            .auth
            .touch(&id, Utc::now())
            .map(CurrentSession)
            .map_err(|err| auth_rejection(&err))
    }
}

impl CurrentSession {
    /// 403 with the page's access-denied message unless the role matches.
    pub(crate) fn require(&self, role: Role) -> Result<(), Response> {
        if self.0.role == role {
            return Ok(());
        }
        let message = match role {
            Role::DocumentChecker => "Access denied! Only Document Checkers can access this page.",
            Role::LoanAgent => "Access denied! Only Loan Agents can handle loan queries.",
            Role::Admin => "Access denied! Only Admins can access analytics.",
        };
        warn!(username = %self.0.username, role = %self.0.role, required = %role, "access denied");
        Err((StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response())
    }
}

pub(crate) fn auth_rejection(err: &AuthError) -> Response {
    let status = match err {
        AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNAUTHORIZED,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
