//! Error handling utilities for repositories

use courier_core::entities::FeedbackTask;
use courier_core::error::DomainError;
use sqlx::Error as SqlxError;

use crate::models::FeedbackTaskModel;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Map a batch of task rows, failing on the first row the domain rejects
pub fn into_tasks(rows: Vec<FeedbackTaskModel>) -> Result<Vec<FeedbackTask>, DomainError> {
    rows.into_iter().map(FeedbackTask::try_from).collect()
}
