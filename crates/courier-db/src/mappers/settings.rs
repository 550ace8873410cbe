//! Feedback settings entity <-> model mapper

use courier_core::entities::FeedbackSettings;
use courier_core::value_objects::StoreId;

use crate::models::FeedbackSettingsModel;

impl From<FeedbackSettingsModel> for FeedbackSettings {
    fn from(model: FeedbackSettingsModel) -> Self {
        FeedbackSettings {
            store_id: StoreId::new(model.store_id),
            enabled: model.enabled,
            delay_minutes: model.delay_minutes,
            poll_question: model.poll_question,
            good_option: model.good_option,
            bad_option: model.bad_option,
            good_response: model.good_response,
            bad_response: model.bad_response,
            review_message: model.review_message,
            expire_hours: model.expire_hours,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
