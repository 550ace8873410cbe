//! Feedback handlers
//!
//! Settings management, task statistics and the order-pipeline enqueue hook.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use courier_service::dto::{
    ApiResponse, EnqueueFeedbackRequest, EnqueueResponse, FeedbackSettingsResponse,
    FeedbackStatsResponse, UpdateFeedbackSettingsRequest,
};
use courier_service::FeedbackService;

use crate::extractors::{ApiKey, StorePath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// GET /stores/{store_id}/feedback/settings
pub async fn get_settings(
    State(state): State<AppState>,
    _auth: ApiKey,
    StorePath(store_id): StorePath,
) -> ApiResult<Json<ApiResponse<FeedbackSettingsResponse>>> {
    let service = FeedbackService::new(state.service_context());
    let settings = service.get_settings(store_id).await?;
    Ok(Json(ApiResponse::new(settings.into())))
}

/// PUT /stores/{store_id}/feedback/settings
pub async fn update_settings(
    State(state): State<AppState>,
    _auth: ApiKey,
    StorePath(store_id): StorePath,
    ValidatedJson(request): ValidatedJson<UpdateFeedbackSettingsRequest>,
) -> ApiResult<Json<ApiResponse<FeedbackSettingsResponse>>> {
    let service = FeedbackService::new(state.service_context());
    let settings = service.update_settings(store_id, request).await?;
    Ok(Json(ApiResponse::new(settings.into())))
}

/// GET /stores/{store_id}/feedback/stats
pub async fn get_stats(
    State(state): State<AppState>,
    _auth: ApiKey,
    StorePath(store_id): StorePath,
) -> ApiResult<Json<ApiResponse<FeedbackStatsResponse>>> {
    let service = FeedbackService::new(state.service_context());
    let stats = service.stats(store_id).await?;
    Ok(Json(ApiResponse::new(FeedbackStatsResponse::new(store_id, stats))))
}

/// Schedule a feedback poll for a new order
///
/// POST /stores/{store_id}/feedback/tasks
///
/// Answers 201 when a task was created and 200 when the order already had one.
pub async fn enqueue_task(
    State(state): State<AppState>,
    _auth: ApiKey,
    StorePath(store_id): StorePath,
    ValidatedJson(request): ValidatedJson<EnqueueFeedbackRequest>,
) -> ApiResult<Response> {
    let service = FeedbackService::new(state.service_context());
    let created = service.enqueue(store_id, request).await?;
    let body = Json(ApiResponse::new(EnqueueResponse::from(created)));

    Ok(if body.0.data.created {
        Created(body).into_response()
    } else {
        body.into_response()
    })
}
