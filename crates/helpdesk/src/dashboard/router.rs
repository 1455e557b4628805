use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use super::session::{auth_rejection, session_id, CurrentSession};
use super::uploads::{UploadedFile, RESULT_SHEET_EXTENSIONS, VERIFICATION_EXTENSIONS};
use super::DashboardState;
use crate::auth::{AuthError, Role};
use crate::tools::{ToolError, LOAN_DIRECTIVE};
use crate::workflows::admissions::review_result_sheet;
use crate::workflows::loans::{FinalizedLoan, LoanApplication, LoanError, ReservationToken};

/// Router builder exposing the helpdesk pages as JSON endpoints.
pub fn dashboard_router(state: DashboardState) -> Router {
    let uploads = Router::new()
        .route("/api/v1/documents/verify", post(verify_document_handler))
        .route("/api/v1/documents/shortlist", post(shortlist_handler))
        .layer(DefaultBodyLimit::max(state.upload_limit_bytes));

    Router::new()
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/signup", post(signup_handler))
        .route("/api/v1/auth/logout", post(logout_handler))
        .route("/api/v1/dashboard", get(home_handler))
        .merge(uploads)
        .route("/api/v1/loans/faq", post(loan_faq_handler))
        .route("/api/v1/loans/eligibility", post(loan_eligibility_handler))
        .route("/api/v1/loans/reservations", post(reserve_loan_handler))
        .route(
            "/api/v1/loans/reservations/:token/commit",
            post(commit_loan_handler),
        )
        .route("/api/v1/admin/analytics", get(analytics_handler))
        .route("/api/v1/faq", post(counsellor_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignupRequest {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) role: Role,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionRequest {
    #[serde(default)]
    pub(crate) question: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EligibilityRequest {
    pub(crate) shortlisted: bool,
    pub(crate) annual_income: f64,
    pub(crate) requested_loan: f64,
}

impl EligibilityRequest {
    fn application(&self) -> LoanApplication {
        LoanApplication::new(self.shortlisted, self.annual_income, self.requested_loan)
    }
}

pub(crate) async fn login_handler(
    State(state): State<DashboardState>,
    Json(request): Json<LoginRequest>,
) -> Response {
    match state
        .auth
        .open_session(&request.username, &request.password, Utc::now())
    {
        Ok(session) => {
            let payload = json!({
                "session_id": session.id,
                "username": session.username,
                "role": session.role,
                "message": format!("Login successful! Role: {}", session.role),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => auth_rejection(&err),
    }
}

pub(crate) async fn signup_handler(
    State(state): State<DashboardState>,
    Json(request): Json<SignupRequest>,
) -> Response {
    match state
        .auth
        .signup(&request.username, &request.password, request.role)
    {
        Ok(()) => {
            let payload = json!({
                "message": "Account created successfully! Please login.",
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(AuthError::UsernameTaken) => {
            let payload = json!({ "error": AuthError::UsernameTaken.to_string() });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Err(other) => auth_rejection(&other),
    }
}

pub(crate) async fn logout_handler(
    State(state): State<DashboardState>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = session_id(&headers) else {
        return auth_rejection(&AuthError::NotLoggedIn);
    };
    match state.auth.logout(&id) {
        Ok(()) => {
            let payload = json!({ "message": "You have been logged out." });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => auth_rejection(&err),
    }
}

/// Pages a role may open from the navigation menu.
pub(crate) fn pages_for(role: Role) -> Vec<&'static str> {
    let mut pages = vec!["home"];
    match role {
        Role::DocumentChecker => pages.extend(["document_verification", "document_shortlisting"]),
        Role::LoanAgent => pages.push("loan_queries"),
        Role::Admin => pages.push("admin_analytics"),
    }
    pages.extend(["faq", "logout"]);
    pages
}

pub(crate) async fn home_handler(CurrentSession(session): CurrentSession) -> Response {
    let payload = json!({
        "title": format!("Welcome, {}!", session.role),
        "message": "This is the main dashboard for managing student admissions.",
        "username": session.username,
        "role": session.role,
        "pages": pages_for(session.role),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn verify_document_handler(
    State(state): State<DashboardState>,
    session: CurrentSession,
    mut multipart: Multipart,
) -> Response {
    if let Err(denied) = session.require(Role::DocumentChecker) {
        return denied;
    }
    let upload = match UploadedFile::from_multipart(&mut multipart).await {
        Ok(upload) => upload,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = upload.ensure_extension(&VERIFICATION_EXTENSIONS) {
        return err.into_response();
    }

    state.metrics.record_application();
    info!(file = %upload.file_name, size = upload.bytes.len(), "document received for verification");

    let payload = json!({
        "file_name": upload.file_name,
        "content_type": upload.content_type(),
        "size_bytes": upload.bytes.len(),
        "status": "verified",
        "message": "Document verified successfully!",
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn shortlist_handler(
    State(state): State<DashboardState>,
    session: CurrentSession,
    mut multipart: Multipart,
) -> Response {
    if let Err(denied) = session.require(Role::DocumentChecker) {
        return denied;
    }
    let upload = match UploadedFile::from_multipart(&mut multipart).await {
        Ok(upload) => upload,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = upload.ensure_extension(&RESULT_SHEET_EXTENSIONS) {
        return err.into_response();
    }
    let staged = match upload.stage().await {
        Ok(staged) => staged,
        Err(err) => return err.into_response(),
    };

    state.metrics.record_application();
    let review = review_result_sheet(&state.validator, staged.path()).await;
    drop(staged);
    state
        .metrics
        .record_document(review.validation.is_verified());

    match state.admissions.run(&review.shortlist_prompt()).await {
        Ok(run) => {
            let payload = json!({
                "extracted_text": review.extracted_text,
                "validation": review.validation,
                "parsed": review.parsed,
                "decision": run.output,
                "steps": run.steps,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => tool_failure(err),
    }
}

pub(crate) async fn loan_faq_handler(
    State(state): State<DashboardState>,
    session: CurrentSession,
    Json(request): Json<QuestionRequest>,
) -> Response {
    if let Err(denied) = session.require(Role::LoanAgent) {
        return denied;
    }
    let question = request.question.trim();
    if question.is_empty() {
        return missing_question();
    }

    match state.loans.run(question).await {
        Ok(run) => {
            let payload = json!({ "answer": run.output, "steps": run.steps });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => tool_failure(err),
    }
}

pub(crate) async fn loan_eligibility_handler(
    State(state): State<DashboardState>,
    session: CurrentSession,
    Json(request): Json<EligibilityRequest>,
) -> Response {
    if let Err(denied) = session.require(Role::LoanAgent) {
        return denied;
    }
    let payload = match serde_json::to_string(&request.application()) {
        Ok(payload) => payload,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
        }
    };

    match state.loans.run(&format!("{LOAN_DIRECTIVE} {payload}")).await {
        Ok(run) => {
            let payload = json!({ "decision": run.output, "steps": run.steps });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => tool_failure(err),
    }
}

pub(crate) async fn reserve_loan_handler(
    State(state): State<DashboardState>,
    session: CurrentSession,
    Json(request): Json<EligibilityRequest>,
) -> Response {
    if let Err(denied) = session.require(Role::LoanAgent) {
        return denied;
    }

    match state.decider.reserve(&request.application(), Utc::now()) {
        Ok(reservation) => (StatusCode::CREATED, Json(reservation)).into_response(),
        Err(LoanError::Rejected(reason)) => {
            let payload = json!({ "error": format!("Loan Rejected: {reason}") });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(other) => loan_failure(other),
    }
}

pub(crate) async fn commit_loan_handler(
    State(state): State<DashboardState>,
    session: CurrentSession,
    Path(token): Path<String>,
) -> Response {
    if let Err(denied) = session.require(Role::LoanAgent) {
        return denied;
    }
    let Ok(token) = Uuid::parse_str(token.trim()).map(ReservationToken) else {
        let payload = json!({ "error": "reservation token must be a UUID" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    };

    match state.decider.commit(token, Utc::now()) {
        Ok(commitment) => {
            state.metrics.record_loan_commit();
            let message = FinalizedLoan {
                remaining_budget: commitment.remaining_budget,
            }
            .to_string();
            let payload = json!({
                "token": commitment.token,
                "amount": commitment.amount,
                "remaining_budget": commitment.remaining_budget,
                "message": message,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => loan_failure(err),
    }
}

pub(crate) async fn analytics_handler(
    State(state): State<DashboardState>,
    session: CurrentSession,
) -> Response {
    if let Err(denied) = session.require(Role::Admin) {
        return denied;
    }
    let payload = json!({
        "counters": state.metrics.snapshot(),
        "loan_budget": state.decider.budget(),
        "loan_budget_available": state.decider.available(Utc::now()),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn counsellor_handler(
    State(state): State<DashboardState>,
    _session: CurrentSession,
    Json(request): Json<QuestionRequest>,
) -> Response {
    let question = request.question.trim();
    if question.is_empty() {
        return missing_question();
    }

    match state.counsellor.run(question).await {
        Ok(run) => (StatusCode::OK, Json(run)).into_response(),
        Err(err) => tool_failure(err),
    }
}

fn missing_question() -> Response {
    let payload = json!({ "error": "Please enter a question." });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn tool_failure(err: ToolError) -> Response {
    error!(error = %err, kind = err.kind().label(), "agent run failed");
    let status = match err {
        ToolError::Knowledge(_) => StatusCode::BAD_GATEWAY,
        ToolError::UnknownTool(_) | ToolError::EmptyRegistry => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": err.to_string(),
        "kind": err.kind(),
    });
    (status, Json(payload)).into_response()
}

fn loan_failure(err: LoanError) -> Response {
    let status = match err {
        LoanError::UnknownReservation(_) => StatusCode::NOT_FOUND,
        LoanError::ReservationExpired(_) => StatusCode::GONE,
        LoanError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LoanError::InvalidInput(_) => StatusCode::BAD_REQUEST,
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
