use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::auth::{AuthService, InMemorySessionStore, InMemoryUserRepository};
use crate::config::DEFAULT_MAX_UPLOAD_MB;
use crate::dashboard::{dashboard_router, DashboardState, HelpdeskComponents, SESSION_HEADER};
use crate::knowledge::{ExtractiveGenerator, FaqEntry, KnowledgeTool};
use crate::ocr::{ExtractionError, TextExtractor};
use crate::workflows::admissions::{DocumentValidator, ShortlistingAgent};
use crate::workflows::loans::LoanDecider;

pub(super) const RESULT_SHEET: &str =
    "Name: Asha Rao\nRegistration No: 22-117\nRoll No: 5521\nResult: PASS 480 A\nOverall Grade A";

const BOUNDARY: &str = "helpdesk-upload-boundary";

pub(super) struct FixedText(pub(super) &'static str);

#[async_trait]
impl TextExtractor for FixedText {
    async fn extract_text(&self, _path: &Path) -> Result<String, ExtractionError> {
        Ok(self.0.to_string())
    }
}

fn admissions_faq() -> Vec<FaqEntry> {
    vec![
        FaqEntry::new(
            "When do admissions open?",
            "Admissions open on the first of June.",
        ),
        FaqEntry::new(
            "What documents are required?",
            "Your result sheet and an identity proof.",
        ),
    ]
}

fn loan_faq() -> Vec<FaqEntry> {
    vec![FaqEntry::new(
        "What is the loan interest rate?",
        "Loans carry 4% simple interest.",
    )]
}

pub(super) fn build_state_with(text: &'static str, timeout: Duration) -> DashboardState {
    build_state_with_limit(text, timeout, DEFAULT_MAX_UPLOAD_MB * 1024 * 1024)
}

pub(super) fn build_state_with_limit(
    text: &'static str,
    timeout: Duration,
    upload_limit_bytes: usize,
) -> DashboardState {
    let auth = AuthService::new(
        Arc::new(InMemoryUserRepository::seeded()),
        Arc::new(InMemorySessionStore::default()),
        timeout,
    );
    DashboardState::new(HelpdeskComponents {
        auth,
        validator: DocumentValidator::new(Arc::new(FixedText(text))),
        shortlister: ShortlistingAgent::default(),
        decider: Arc::new(LoanDecider::new(500_000.0, 300_000.0)),
        admissions_faq: KnowledgeTool::from_entries(
            admissions_faq(),
            Arc::new(ExtractiveGenerator),
        ),
        loan_faq: KnowledgeTool::from_entries(loan_faq(), Arc::new(ExtractiveGenerator)),
        upload_limit_bytes,
    })
}

pub(super) fn build_router() -> Router {
    dashboard_router(build_state_with(RESULT_SHEET, Duration::minutes(15)))
}

pub(super) async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes")
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    session: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub(super) fn get_request(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session);
    }
    builder.body(Body::empty()).unwrap()
}

pub(super) fn upload_request(
    uri: &str,
    session: &str,
    file_name: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(SESSION_HEADER, session)
        .body(Body::from(body))
        .unwrap()
}

/// Log in and return the session id.
pub(super) async fn login(router: &Router, username: &str, password: &str) -> String {
    let response = send(
        router,
        json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    payload["session_id"]
        .as_str()
        .expect("session id returned")
        .to_string()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
