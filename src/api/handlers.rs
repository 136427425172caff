//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::sse_stream;
use super::types::{ChatRequest, ChatResponse, ErrorResponse};
use super::AppState;
use crate::turn::{SessionSnapshot, TransitionError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat page
        .route("/", get(serve_page))
        .route("/assets/*path", get(serve_static))
        // Session state
        .route("/api/session", get(get_session))
        .route("/api/stream", get(stream_session))
        // User actions
        .route("/api/chat", post(send_chat))
        .route("/api/clear", post(clear_chat))
        .route("/api/error/dismiss", post(dismiss_error))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Page
// ============================================================

async fn serve_page() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - chat page not found</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Session
// ============================================================

async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.controller.snapshot().await)
}

async fn stream_session(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before taking the snapshot so no render falls in between
    let render_rx = state.controller.subscribe();
    let init = state.controller.snapshot().await;
    sse_stream(init, render_rx)
}

// ============================================================
// User Actions
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let Some(pending) = state.controller.begin(req.text).await? else {
        return Ok(Json(ChatResponse { queued: false }));
    };

    // The reply reaches the page through the render stream
    tokio::spawn(pending.run());

    Ok(Json(ChatResponse { queued: true }))
}

async fn clear_chat(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.controller.clear().await?))
}

async fn dismiss_error(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.controller.dismiss_error().await?))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("jarvis-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    Conflict(String),
    Internal(String),
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::TurnInFlight => AppError::Conflict(e.to_string()),
            TransitionError::InvalidTransition(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
