//! Axum route handlers.
//!
//! - `POST /confirm`: `{ "message": "...", "action": "..." }` →
//!   `{ "approved": bool, "timestamp": i64, "source": "daemon" }`
//! - `GET  /status`: [`GateStatus`](confirm_engine::GateStatus) as JSON

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use confirm_engine::ConfirmationGate;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Source tag reported back on every `/confirm` reply.
pub const DAEMON_SOURCE: &str = "daemon";

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<ConfirmationGate>,
}

impl AppState {
    pub fn new(gate: Arc<ConfirmationGate>) -> Self {
        Self { gate }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmBody {
    pub message: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmReply {
    pub approved: bool,
    pub timestamp: i64,
    pub source: String,
}

/// Build the router with all routes.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/confirm", post(confirm_handler))
        .route("/status", get(status_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /confirm
///
/// The body is parsed by hand so that clients are not required to send a
/// JSON content type.
async fn confirm_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let body: ConfirmBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "rejecting malformed /confirm body");
            return error_reply(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let approved = state.gate.should_auto_confirm(&body.message, &body.action);

    Json(ConfirmReply {
        approved,
        timestamp: chrono::Utc::now().timestamp_millis(),
        source: DAEMON_SOURCE.to_string(),
    })
    .into_response()
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gate.status())
}

async fn not_found_handler() -> Response {
    error_reply(StatusCode::NOT_FOUND, "Not found")
}

fn error_reply(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
