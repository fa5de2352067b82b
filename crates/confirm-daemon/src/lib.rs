//! HTTP daemon for the auto-confirm gate.
//!
//! A thin passthrough: `POST /confirm` calls
//! [`ConfirmationGate::should_auto_confirm`](confirm_engine::ConfirmationGate::should_auto_confirm)
//! and `GET /status` returns
//! [`ConfirmationGate::status`](confirm_engine::ConfirmationGate::status).
//! No decision logic lives here.

pub mod routes;
pub mod server;

pub use routes::{app_router, AppState, ConfirmBody, ConfirmReply, DAEMON_SOURCE};
pub use server::{Server, ServerConfig, DEFAULT_PORT};
