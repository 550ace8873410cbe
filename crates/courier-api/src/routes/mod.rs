//! Route definitions
//!
//! Control and webhook routes are mounted under /api/v1; health probes sit at
//! the root.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{feedback, health, session, webhook};
use crate::state::AppState;

/// Create the main router with all routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .nest("/api/v1", api_v1_routes())
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(session_routes())
        .merge(feedback_routes())
        .route("/webhooks/messaging", post(webhook::receive_event))
}

fn session_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/stores/:store_id/session",
            post(session::start_session)
                .get(session::get_session)
                .delete(session::disconnect_session),
        )
        .route(
            "/stores/:store_id/session/test-message",
            post(session::send_test_message),
        )
}

fn feedback_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/stores/:store_id/feedback/settings",
            get(feedback::get_settings).put(feedback::update_settings),
        )
        .route("/stores/:store_id/feedback/stats", get(feedback::get_stats))
        .route("/stores/:store_id/feedback/tasks", post(feedback::enqueue_task))
}
