//! Feedback task entity <-> model mapper

use courier_core::entities::{FeedbackTask, TaskStats, TaskStatus};
use courier_core::error::DomainError;
use courier_core::value_objects::{PhoneNumber, StoreId};

use crate::models::{FeedbackTaskModel, StatusCountModel};

impl TryFrom<FeedbackTaskModel> for FeedbackTask {
    type Error = DomainError;

    fn try_from(model: FeedbackTaskModel) -> Result<Self, Self::Error> {
        let status = TaskStatus::parse(&model.status).ok_or_else(|| {
            DomainError::DatabaseError(format!(
                "feedback task {} has unknown status '{}'",
                model.id, model.status
            ))
        })?;
        let customer_phone = PhoneNumber::parse(&model.customer_phone)
            .map_err(|e| DomainError::InvalidPhone(format!("task {}: {e}", model.id)))?;

        Ok(FeedbackTask {
            id: model.id,
            store_id: StoreId::new(model.store_id),
            order_id: model.order_id,
            customer_phone,
            status,
            scheduled_at: model.scheduled_at,
            claimed_at: model.claimed_at,
            poll_message_id: model.poll_message_id,
            poll_sent_at: model.poll_sent_at,
            review_links: model.review_links.0,
            review_links_sent: model.review_links_sent,
            last_error: model.last_error,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Fold per-status count rows into stats; unknown statuses are skipped
pub fn collect_stats(rows: Vec<StatusCountModel>) -> TaskStats {
    let mut stats = TaskStats::default();
    for row in rows {
        if let Some(status) = TaskStatus::parse(&row.status) {
            stats.record(status, row.count);
        }
        stats.review_links_sent += row.review_links_sent;
    }
    stats
}
