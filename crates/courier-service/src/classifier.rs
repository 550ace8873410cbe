//! Reply classifier
//!
//! Turns a customer's poll vote or text reply into a verdict on the open
//! feedback task, answers with the store's canned response and, for positive
//! verdicts, asks for a review.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courier_core::{FeedbackSettings, FeedbackTask, InboundEvent, TaskStatus, Verdict};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::services::sender::{reply_key, review_key};
use crate::services::ServiceContext;

/// Why an inbound event changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// No task is waiting for an answer from this customer
    NoOpenPoll,
    /// The answer matches neither option
    Unrecognized,
    /// Another delivery of the same reply won the transition
    AlreadyHandled,
    /// Reading the task or the store's settings failed
    LookupFailed,
    /// The webhook body could not be turned into an event
    InvalidPayload,
}

/// Result of handling one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplyOutcome {
    Ignored { reason: IgnoreReason },
    Classified { task_id: i64, verdict: Verdict },
}

impl ReplyOutcome {
    pub fn ignored(reason: IgnoreReason) -> Self {
        Self::Ignored { reason }
    }
}

/// Reply classifier
#[derive(Debug, Clone)]
pub struct ReplyClassifier {
    ctx: ServiceContext,
}

impl ReplyClassifier {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Handle a customer reply. Never fails; problems are logged and the
    /// event is reported as ignored.
    #[instrument(skip(self, event), fields(store_id = %event.store_id))]
    pub async fn on_inbound_event(&self, event: &InboundEvent, now: DateTime<Utc>) -> ReplyOutcome {
        let task = match self
            .ctx
            .task_repo()
            .find_open_poll(event.store_id, &event.phone, event.poll_message_id())
            .await
        {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!("No open feedback poll for reply");
                return ReplyOutcome::ignored(IgnoreReason::NoOpenPoll);
            }
            Err(e) => {
                warn!(error = %e, "Failed to look up open feedback poll");
                return ReplyOutcome::ignored(IgnoreReason::LookupFailed);
            }
        };

        let settings = match self.ctx.settings_repo().find(event.store_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => FeedbackSettings::defaults(event.store_id),
            Err(e) => {
                warn!(task_id = task.id, error = %e, "Failed to load feedback settings");
                return ReplyOutcome::ignored(IgnoreReason::LookupFailed);
            }
        };

        let Some(verdict) = event.answers().into_iter().find_map(|a| settings.classify(a)) else {
            debug!(task_id = task.id, "Reply does not match a poll option");
            return ReplyOutcome::ignored(IgnoreReason::Unrecognized);
        };

        match self
            .ctx
            .task_repo()
            .transition(task.id, TaskStatus::PollSent, verdict.status(), now)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(task_id = task.id, "Reply already handled");
                return ReplyOutcome::ignored(IgnoreReason::AlreadyHandled);
            }
            Err(e) => {
                warn!(task_id = task.id, error = %e, "Failed to record verdict");
                return ReplyOutcome::ignored(IgnoreReason::LookupFailed);
            }
        }

        info!(task_id = task.id, ?verdict, "Feedback reply classified");
        self.respond(&task, &settings, verdict, now).await;

        ReplyOutcome::Classified {
            task_id: task.id,
            verdict,
        }
    }

    /// Send the canned reply and, when positive, the review request
    async fn respond(
        &self,
        task: &FeedbackTask,
        settings: &FeedbackSettings,
        verdict: Verdict,
        now: DateTime<Utc>,
    ) {
        let sender = self.ctx.sender();

        if let Err(e) = sender
            .send_text(
                task.store_id,
                &task.customer_phone,
                settings.response_for(verdict),
                &reply_key(task.id),
            )
            .await
        {
            warn!(task_id = task.id, error = %e, "Failed to send feedback response");
        }

        if verdict != Verdict::Positive {
            return;
        }

        let review_request = settings.review_request(&task.review_links);
        if review_request.is_empty() {
            debug!(task_id = task.id, "No review message or links configured");
            return;
        }

        // Claim the flag first so a concurrent duplicate cannot send twice
        match self.ctx.task_repo().mark_review_links_sent(task.id, now).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                warn!(task_id = task.id, error = %e, "Failed to flag review request");
                return;
            }
        }

        match sender
            .send_text(
                task.store_id,
                &task.customer_phone,
                &review_request,
                &review_key(task.id),
            )
            .await
        {
            Ok(_) => info!(task_id = task.id, links = task.review_links.len(), "Review request sent"),
            Err(e) => warn!(task_id = task.id, error = %e, "Failed to send review request"),
        }
    }

    /// Consume pushed inbound events until the channel closes
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<InboundEvent>) {
        info!("Reply classifier listening for inbound events");
        while let Some(event) = events.recv().await {
            let outcome = self.on_inbound_event(&event, Utc::now()).await;
            debug!(?outcome, "Inbound event handled");
        }
        info!("Inbound event channel closed");
    }
}
