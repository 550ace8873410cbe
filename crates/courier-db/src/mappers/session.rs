//! Messaging session entity <-> model mapper

use courier_core::entities::{SessionStatus, TenantSession};
use courier_core::value_objects::StoreId;

use crate::models::SessionModel;

impl From<SessionModel> for TenantSession {
    fn from(model: SessionModel) -> Self {
        TenantSession {
            store_id: StoreId::new(model.store_id),
            status: SessionStatus::parse(&model.status),
            credentials: model.credentials.filter(|c| !c.is_null()),
            is_connected: model.is_connected,
            last_seen_at: model.last_seen_at,
            updated_at: model.updated_at,
        }
    }
}
