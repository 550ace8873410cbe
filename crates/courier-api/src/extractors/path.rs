//! Path parameter extractors

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use courier_core::StoreId;
use serde::Deserialize;

use crate::response::ApiError;

/// `:store_id` path segment parsed into a [`StoreId`]
#[derive(Debug, Clone, Copy)]
pub struct StorePath(pub StoreId);

#[derive(Debug, Deserialize)]
struct RawStorePath {
    store_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for StorePath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<RawStorePath>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;

        let store_id = raw
            .store_id
            .parse()
            .map_err(|_| ApiError::invalid_path("Invalid store_id format"))?;

        Ok(StorePath(store_id))
    }
}
