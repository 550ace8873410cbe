//! Service context - dependency container for services
//!
//! Holds the repositories and the outbound message sender shared by the
//! feedback use cases, the scheduler and the reply classifier.

use std::sync::Arc;

use courier_core::traits::{FeedbackSettingsRepository, FeedbackTaskRepository, SessionRepository};

use super::error::{ServiceError, ServiceResult};
use super::sender::MessageSender;

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    settings_repo: Arc<dyn FeedbackSettingsRepository>,
    task_repo: Arc<dyn FeedbackTaskRepository>,
    session_repo: Arc<dyn SessionRepository>,
    sender: Arc<dyn MessageSender>,
}

impl ServiceContext {
    pub fn new(
        settings_repo: Arc<dyn FeedbackSettingsRepository>,
        task_repo: Arc<dyn FeedbackTaskRepository>,
        session_repo: Arc<dyn SessionRepository>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            settings_repo,
            task_repo,
            session_repo,
            sender,
        }
    }

    pub fn settings_repo(&self) -> &dyn FeedbackSettingsRepository {
        self.settings_repo.as_ref()
    }

    pub fn task_repo(&self) -> &dyn FeedbackTaskRepository {
        self.task_repo.as_ref()
    }

    pub fn session_repo(&self) -> &dyn SessionRepository {
        self.session_repo.as_ref()
    }

    pub fn sender(&self) -> &dyn MessageSender {
        self.sender.as_ref()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext").finish_non_exhaustive()
    }
}

/// Builder for creating ServiceContext
#[derive(Default)]
pub struct ServiceContextBuilder {
    settings_repo: Option<Arc<dyn FeedbackSettingsRepository>>,
    task_repo: Option<Arc<dyn FeedbackTaskRepository>>,
    session_repo: Option<Arc<dyn SessionRepository>>,
    sender: Option<Arc<dyn MessageSender>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings_repo(mut self, repo: Arc<dyn FeedbackSettingsRepository>) -> Self {
        self.settings_repo = Some(repo);
        self
    }

    pub fn task_repo(mut self, repo: Arc<dyn FeedbackTaskRepository>) -> Self {
        self.task_repo = Some(repo);
        self
    }

    pub fn session_repo(mut self, repo: Arc<dyn SessionRepository>) -> Self {
        self.session_repo = Some(repo);
        self
    }

    pub fn sender(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns an error if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.settings_repo
                .ok_or_else(|| ServiceError::internal("settings_repo is required"))?,
            self.task_repo
                .ok_or_else(|| ServiceError::internal("task_repo is required"))?,
            self.session_repo
                .ok_or_else(|| ServiceError::internal("session_repo is required"))?,
            self.sender
                .ok_or_else(|| ServiceError::internal("sender is required"))?,
        ))
    }
}
