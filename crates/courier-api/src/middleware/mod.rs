//! Middleware stack for the API server

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use courier_common::CorsConfig;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level, Span};

use crate::extractors::WEBHOOK_SECRET_HEADER;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Above the session QR wait, which holds `POST /session` open
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wrap the router with request ids, tracing, a timeout and CORS
pub fn apply_middleware(
    router: Router<AppState>,
    cors: &CorsConfig,
    is_production: bool,
) -> Router<AppState> {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(request_span)
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(TimeoutLayer::with_status_code(
                StatusCode::SERVICE_UNAVAILABLE,
                REQUEST_TIMEOUT,
            ))
            .layer(cors_layer(cors, is_production)),
    )
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        store_id = store_segment(request.uri().path()).unwrap_or("-"),
        request_id = %request_id,
    )
}

/// The `{store_id}` segment of `/api/v1/stores/{store_id}/...`
fn store_segment(path: &str) -> Option<&str> {
    let mut segments = path.split('/').skip_while(|s| *s != "stores");
    segments.next()?;
    segments.next().filter(|s| !s.is_empty())
}

fn cors_layer(config: &CorsConfig, is_production: bool) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(WEBHOOK_SECRET_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    match (origins.is_empty(), is_production) {
        (false, _) => {
            info!(count = origins.len(), "CORS restricted to configured origins");
            layer.allow_origin(AllowOrigin::list(origins))
        }
        (true, true) => {
            warn!("No CORS origins configured; dashboard browsers will be refused");
            layer.allow_origin(AllowOrigin::list(Vec::<HeaderValue>::new()))
        }
        (true, false) => layer.allow_origin(Any),
    }
}
