//! Feedback scheduler
//!
//! Moves feedback tasks through `pending -> sending -> poll_sent` and expires
//! polls nobody answered. Claims are atomic in the repository, so overlapping
//! ticks (or a second worker) never send the same poll twice.

mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use courier_common::SchedulerConfig;
use courier_core::{FeedbackSettings, FeedbackTask, TaskStatus};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::services::sender::poll_key;
use crate::services::{ServiceContext, ServiceResult};

/// Counters of one dispatch tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub claimed: usize,
    pub sent: usize,
    pub expired: usize,
    pub failed: usize,
    /// Polls delivered whose state change could not be stored
    pub unrecorded: usize,
}

/// What happened to a single claimed task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatched {
    Sent,
    Expired,
    Failed,
    /// Left to claim recovery: handed back, or a transition did not apply
    Released,
    /// Delivered, but the `poll_sent` transition was not stored
    Unrecorded,
}

/// Feedback scheduler
pub struct FeedbackScheduler {
    ctx: ServiceContext,
    config: SchedulerConfig,
    running: AtomicBool,
}

impl FeedbackScheduler {
    pub fn new(ctx: ServiceContext, config: SchedulerConfig) -> Self {
        Self {
            ctx,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim due tasks and send their polls one after another
    #[instrument(skip(self))]
    pub async fn dispatch_due(&self, now: DateTime<Utc>) -> ServiceResult<DispatchReport> {
        let tasks = self
            .ctx
            .task_repo()
            .claim_due(now, self.config.batch_size)
            .await?;

        let mut report = DispatchReport {
            claimed: tasks.len(),
            ..DispatchReport::default()
        };
        if tasks.is_empty() {
            return Ok(report);
        }

        debug!(claimed = tasks.len(), "Claimed due feedback tasks");
        let mut attempted_send = false;

        for task in &tasks {
            match self.dispatch_one(task, now, &mut attempted_send).await {
                Dispatched::Sent => report.sent += 1,
                Dispatched::Expired => report.expired += 1,
                Dispatched::Failed => report.failed += 1,
                Dispatched::Unrecorded => report.unrecorded += 1,
                Dispatched::Released => {}
            }
        }

        info!(
            claimed = report.claimed,
            sent = report.sent,
            expired = report.expired,
            failed = report.failed,
            unrecorded = report.unrecorded,
            "Dispatch tick finished"
        );
        Ok(report)
    }

    async fn dispatch_one(
        &self,
        task: &FeedbackTask,
        now: DateTime<Utc>,
        attempted_send: &mut bool,
    ) -> Dispatched {
        let tasks = self.ctx.task_repo();

        let settings = match self.ctx.settings_repo().find(task.store_id).await {
            Ok(Some(settings)) if settings.enabled => settings,
            Ok(_) => {
                debug!(task_id = task.id, store_id = %task.store_id, "Feedback disabled; expiring task");
                return match tasks
                    .transition(task.id, TaskStatus::Sending, TaskStatus::Expired, now)
                    .await
                {
                    Ok(true) => Dispatched::Expired,
                    Ok(false) => {
                        warn!(task_id = task.id, "Task left sending before it could expire");
                        Dispatched::Released
                    }
                    Err(e) => {
                        warn!(task_id = task.id, error = %e, "Failed to expire task; left for claim recovery");
                        Dispatched::Released
                    }
                };
            }
            Err(e) => {
                warn!(task_id = task.id, error = %e, "Failed to load feedback settings; releasing claim");
                if let Err(e) = tasks
                    .transition(task.id, TaskStatus::Sending, TaskStatus::Pending, now)
                    .await
                {
                    warn!(task_id = task.id, error = %e, "Failed to release claim; left for claim recovery");
                }
                return Dispatched::Released;
            }
        };

        if *attempted_send {
            tokio::time::sleep(self.send_delay()).await;
        }
        *attempted_send = true;

        self.send_poll(task, &settings, now).await
    }

    async fn send_poll(
        &self,
        task: &FeedbackTask,
        settings: &FeedbackSettings,
        now: DateTime<Utc>,
    ) -> Dispatched {
        let tasks = self.ctx.task_repo();
        let options = settings.poll_options();

        let sent = self
            .ctx
            .sender()
            .send_poll(
                task.store_id,
                &task.customer_phone,
                &settings.poll_question,
                &options,
                &poll_key(task.id),
            )
            .await;

        match sent {
            Ok(message_id) => match tasks.mark_poll_sent(task.id, &message_id, now).await {
                Ok(true) => {
                    info!(task_id = task.id, store_id = %task.store_id, %message_id, "Feedback poll sent");
                    Dispatched::Sent
                }
                Ok(false) => {
                    warn!(task_id = task.id, %message_id, "Task left sending before poll was recorded");
                    Dispatched::Unrecorded
                }
                Err(e) => {
                    // The claim goes stale and is resent under the same idempotency key
                    warn!(task_id = task.id, %message_id, error = %e, "Failed to record sent poll");
                    Dispatched::Unrecorded
                }
            },
            Err(e) => {
                warn!(task_id = task.id, store_id = %task.store_id, error = %e, "Feedback poll send failed");
                if let Err(e) = tasks.mark_failed(task.id, &e.to_string(), now).await {
                    warn!(task_id = task.id, error = %e, "Failed to mark task failed");
                }
                Dispatched::Failed
            }
        }
    }

    fn send_delay(&self) -> Duration {
        jitter(self.config.send_delay_min_ms, self.config.send_delay_max_ms)
    }

    /// Expire polls that stayed unanswered past their store's window
    #[instrument(skip(self))]
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> ServiceResult<u64> {
        let expired = self
            .ctx
            .task_repo()
            .expire_stale_polls(now, FeedbackSettings::DEFAULT_EXPIRE_HOURS)
            .await?;
        if expired > 0 {
            info!(expired, "Expired unanswered feedback polls");
        }
        Ok(expired)
    }

    /// Hand `sending` claims left behind by a crash back to `pending`
    #[instrument(skip(self))]
    pub async fn recover_stale_claims(&self, now: DateTime<Utc>) -> ServiceResult<u64> {
        let cutoff = now - chrono::Duration::minutes(self.config.stale_claim_minutes);
        let released = self
            .ctx
            .task_repo()
            .release_stale_claims(cutoff, now)
            .await?;
        if released > 0 {
            warn!(released, "Released stale feedback task claims");
        }
        Ok(released)
    }
}

/// Random pause in `[min_ms, max_ms]` between two consecutive sends
fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    let max_ms = max_ms.max(min_ms);
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

impl std::fmt::Debug for FeedbackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackScheduler")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
