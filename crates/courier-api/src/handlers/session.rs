//! Session handlers
//!
//! Dashboard endpoints for pairing, inspecting and dropping a store's
//! messaging session.

use axum::{extract::State, Json};
use courier_service::dto::{
    ApiResponse, SendTestMessageRequest, SessionStatusResponse, TestMessageResponse,
};
use courier_service::SessionService;

use crate::extractors::{ApiKey, StorePath, ValidatedJson};
use crate::response::{ApiResult, NoContent};
use crate::state::AppState;

fn service(state: &AppState) -> SessionService<'_> {
    SessionService::new(state.sessions(), state.service_context().session_repo())
}

/// Start pairing, returning the QR code when one is ready
///
/// POST /stores/{store_id}/session
pub async fn start_session(
    State(state): State<AppState>,
    _auth: ApiKey,
    StorePath(store_id): StorePath,
) -> ApiResult<Json<ApiResponse<SessionStatusResponse>>> {
    let response = service(&state).start(store_id).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// GET /stores/{store_id}/session
pub async fn get_session(
    State(state): State<AppState>,
    _auth: ApiKey,
    StorePath(store_id): StorePath,
) -> ApiResult<Json<ApiResponse<SessionStatusResponse>>> {
    let response = service(&state).status(store_id).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// Log out and forget credentials
///
/// DELETE /stores/{store_id}/session
pub async fn disconnect_session(
    State(state): State<AppState>,
    _auth: ApiKey,
    StorePath(store_id): StorePath,
) -> ApiResult<NoContent> {
    service(&state).disconnect(store_id).await?;
    Ok(NoContent)
}

/// POST /stores/{store_id}/session/test-message
pub async fn send_test_message(
    State(state): State<AppState>,
    _auth: ApiKey,
    StorePath(store_id): StorePath,
    ValidatedJson(request): ValidatedJson<SendTestMessageRequest>,
) -> ApiResult<Json<ApiResponse<TestMessageResponse>>> {
    let response = service(&state).send_test_message(store_id, request).await?;
    Ok(Json(ApiResponse::new(response)))
}
