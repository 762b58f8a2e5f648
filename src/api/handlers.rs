//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ErrorResponse, InputRequest, SessionResponse, SuccessResponse};
use super::AppState;
use crate::runtime::SubmitError;
use crate::state_machine::{ErrorKind, SessionError, Step};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/session/start", post(start_session))
        .route("/api/session/:id", get(get_session).delete(abandon_session))
        // Guest input
        .route("/api/session/:id/input", post(submit_input))
        // SSE streaming
        .route("/api/session/:id/stream", get(stream_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn start_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let reply = state.sessions.create().await;
    Json(reply.into())
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let reply = state.sessions.snapshot(&id).await?;
    Ok(Json(reply.into()))
}

async fn abandon_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.abandon(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Guest Input
// ============================================================

async fn submit_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<InputRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let target = req
        .field
        .parse::<Step>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let reply = state.sessions.submit(&id, req.input, target).await?;
    Ok(Json(reply.into()))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (current, broadcast_rx) = state.sessions.subscribe(&id).await?;
    Ok(sse_stream(current, broadcast_rx))
}

async fn get_version() -> &'static str {
    concat!("reservation-desk ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Session(SubmitError),
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        AppError::Session(err)
    }
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        AppError::Session(SubmitError {
            error,
            current: None,
        })
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::EmptyInput | ErrorKind::InvalidConfirmationChoice => StatusCode::BAD_REQUEST,
        ErrorKind::SessionNotFound => StatusCode::NOT_FOUND,
        ErrorKind::StepMismatch | ErrorKind::SessionCompleted => StatusCode::CONFLICT,
        ErrorKind::CollaboratorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg, "bad_request"))
            }
            AppError::Session(SubmitError { error, current }) => {
                let kind = error.kind();
                let (agent_response, session) = match current {
                    Some(reply) => (Some(reply.message.into_string()), Some(reply.snapshot)),
                    None => (None, None),
                };
                let body = ErrorResponse {
                    error: error.to_string(),
                    kind: kind.as_str(),
                    retryable: error.is_retryable(),
                    agent_response,
                    session,
                };
                (status_for(kind), body)
            }
        };

        (status, Json(body)).into_response()
    }
}
