//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and, where they carry user input, `Validate`.

use courier_core::{FeedbackSettings, InboundEvent, PhoneNumber, StoreId};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::services::{ServiceError, ServiceResult};

// ============================================================================
// Feedback Requests
// ============================================================================

/// Order pipeline request to schedule a feedback poll
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EnqueueFeedbackRequest {
    #[validate(length(min = 1, max = 128, message = "Order id must be 1-128 characters"))]
    pub order_id: String,

    #[validate(length(min = 5, max = 32, message = "Phone must be 5-32 characters"))]
    pub customer_phone: String,

    /// Marketplace review URLs sent after a positive answer
    #[serde(default)]
    #[validate(
        length(max = 10, message = "At most 10 review links"),
        custom(function = "validate_review_links")
    )]
    pub review_links: Vec<String>,
}

fn validate_review_links(links: &[String]) -> Result<(), ValidationError> {
    let valid = links
        .iter()
        .all(|l| l.len() <= 2048 && (l.starts_with("https://") || l.starts_with("http://")));
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("review_links");
        err.message = Some("Review links must be http(s) URLs".into());
        Err(err)
    }
}

/// Partial update of a store's feedback settings
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateFeedbackSettingsRequest {
    pub enabled: Option<bool>,

    #[validate(range(min = 0, max = 10080, message = "Delay must be 0-10080 minutes"))]
    pub delay_minutes: Option<i32>,

    #[validate(length(min = 1, max = 255, message = "Question must be 1-255 characters"))]
    pub poll_question: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Option must be 1-100 characters"))]
    pub good_option: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Option must be 1-100 characters"))]
    pub bad_option: Option<String>,

    #[validate(length(min = 1, max = 4096, message = "Response must be 1-4096 characters"))]
    pub good_response: Option<String>,

    #[validate(length(min = 1, max = 4096, message = "Response must be 1-4096 characters"))]
    pub bad_response: Option<String>,

    #[validate(length(max = 4096, message = "Review message must be at most 4096 characters"))]
    pub review_message: Option<String>,

    #[validate(range(min = 1, max = 720, message = "Expiry must be 1-720 hours"))]
    pub expire_hours: Option<i32>,
}

impl UpdateFeedbackSettingsRequest {
    /// Overlay the provided fields onto existing settings
    pub fn apply_to(self, settings: &mut FeedbackSettings) {
        if let Some(enabled) = self.enabled {
            settings.enabled = enabled;
        }
        if let Some(delay) = self.delay_minutes {
            settings.delay_minutes = delay;
        }
        if let Some(question) = self.poll_question {
            settings.poll_question = question;
        }
        if let Some(option) = self.good_option {
            settings.good_option = option;
        }
        if let Some(option) = self.bad_option {
            settings.bad_option = option;
        }
        if let Some(response) = self.good_response {
            settings.good_response = response;
        }
        if let Some(response) = self.bad_response {
            settings.bad_response = response;
        }
        if let Some(message) = self.review_message {
            settings.review_message = message;
        }
        if let Some(hours) = self.expire_hours {
            settings.expire_hours = hours;
        }
    }
}

// ============================================================================
// Session Requests
// ============================================================================

/// Dashboard "send test message" request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendTestMessageRequest {
    #[validate(length(min = 5, max = 32, message = "Phone must be 5-32 characters"))]
    pub phone: String,

    #[validate(length(min = 1, max = 4096, message = "Text must be 1-4096 characters"))]
    pub text: String,
}

// ============================================================================
// Provider Webhook
// ============================================================================

/// Poll answer reported by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct PollVotePayload {
    pub poll_message_id: String,
    #[serde(default)]
    pub selected_options: Vec<String>,
}

/// Inbound provider event: either a poll vote or a free-text message
#[derive(Debug, Clone, Deserialize)]
pub struct InboundWebhookPayload {
    pub store_id: StoreId,
    pub phone: String,
    #[serde(default)]
    pub poll_vote: Option<PollVotePayload>,
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundWebhookPayload {
    /// Convert to a domain event; a poll vote takes precedence over text
    pub fn into_event(self) -> ServiceResult<InboundEvent> {
        let phone = PhoneNumber::parse(&self.phone)
            .map_err(|e| ServiceError::validation(format!("phone: {e}")))?;

        match (self.poll_vote, self.text) {
            (Some(vote), _) => Ok(InboundEvent::poll_vote(
                self.store_id,
                phone,
                vote.poll_message_id,
                vote.selected_options,
            )),
            (None, Some(text)) => Ok(InboundEvent::text(self.store_id, phone, text)),
            (None, None) => Err(ServiceError::validation(
                "event carries neither poll_vote nor text",
            )),
        }
    }
}
