//! Feedback settings entity - per-store configuration of the feedback poll

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::TaskStatus;
use crate::error::DomainError;
use crate::value_objects::StoreId;

/// Classification of a customer's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Positive,
    Negative,
}

impl Verdict {
    /// Task status reached by this verdict
    pub fn status(self) -> TaskStatus {
        match self {
            Self::Positive => TaskStatus::Positive,
            Self::Negative => TaskStatus::Negative,
        }
    }
}

/// Feedback settings entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackSettings {
    pub store_id: StoreId,
    pub enabled: bool,
    pub delay_minutes: i32,
    pub poll_question: String,
    pub good_option: String,
    pub bad_option: String,
    pub good_response: String,
    pub bad_response: String,
    pub review_message: String,
    pub expire_hours: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedbackSettings {
    pub const DEFAULT_DELAY_MINUTES: i32 = 10;
    pub const DEFAULT_EXPIRE_HOURS: i32 = 24;
    pub const MAX_DELAY_MINUTES: i32 = 10_080;
    pub const MAX_EXPIRE_HOURS: i32 = 720;
    pub const MAX_QUESTION_LEN: usize = 255;
    pub const MAX_OPTION_LEN: usize = 100;

    /// Settings used when a store has never configured feedback
    pub fn defaults(store_id: StoreId) -> Self {
        let now = Utc::now();
        Self {
            store_id,
            enabled: false,
            delay_minutes: Self::DEFAULT_DELAY_MINUTES,
            poll_question: "Пожалуйста, оцените ваш заказ".to_string(),
            good_option: "Отлично".to_string(),
            bad_option: "Плохо".to_string(),
            good_response: "Спасибо за высокую оценку! Нам очень приятно.".to_string(),
            bad_response: "Нам очень жаль. Мы свяжемся с вами, чтобы всё исправить.".to_string(),
            review_message: "Будем благодарны, если вы оставите отзыв о товаре:".to_string(),
            expire_hours: Self::DEFAULT_EXPIRE_HOURS,
            created_at: now,
            updated_at: now,
        }
    }

    /// Poll answer labels, good first
    pub fn poll_options(&self) -> [String; 2] {
        [self.good_option.clone(), self.bad_option.clone()]
    }

    /// Classify a poll selection or free-text reply against the configured labels.
    ///
    /// Labels match case-insensitively after trimming; the option numbers
    /// `1` and `2` are accepted for text replies.
    pub fn classify(&self, answer: &str) -> Option<Verdict> {
        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }

        if answer == "1" || labels_match(answer, &self.good_option) {
            Some(Verdict::Positive)
        } else if answer == "2" || labels_match(answer, &self.bad_option) {
            Some(Verdict::Negative)
        } else {
            None
        }
    }

    /// Canned reply for a verdict
    pub fn response_for(&self, verdict: Verdict) -> &str {
        match verdict {
            Verdict::Positive => &self.good_response,
            Verdict::Negative => &self.bad_response,
        }
    }

    /// Review request text followed by one link per line
    pub fn review_request(&self, links: &[String]) -> String {
        let mut text = self.review_message.trim().to_string();
        for link in links {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(link);
        }
        text
    }

    /// Check business rules before persisting
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0..=Self::MAX_DELAY_MINUTES).contains(&self.delay_minutes) {
            return Err(DomainError::ValidationError(format!(
                "delay_minutes must be between 0 and {}",
                Self::MAX_DELAY_MINUTES
            )));
        }
        if !(1..=Self::MAX_EXPIRE_HOURS).contains(&self.expire_hours) {
            return Err(DomainError::ValidationError(format!(
                "expire_hours must be between 1 and {}",
                Self::MAX_EXPIRE_HOURS
            )));
        }
        if self.poll_question.trim().is_empty()
            || self.poll_question.chars().count() > Self::MAX_QUESTION_LEN
        {
            return Err(DomainError::ValidationError(format!(
                "poll_question must be 1-{} characters",
                Self::MAX_QUESTION_LEN
            )));
        }
        for option in [&self.good_option, &self.bad_option] {
            if option.trim().is_empty() || option.chars().count() > Self::MAX_OPTION_LEN {
                return Err(DomainError::ValidationError(format!(
                    "poll options must be 1-{} characters",
                    Self::MAX_OPTION_LEN
                )));
            }
        }
        if labels_match(&self.good_option, &self.bad_option) {
            return Err(DomainError::ValidationError(
                "good_option and bad_option must differ".to_string(),
            ));
        }
        Ok(())
    }
}

fn labels_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
