//! In-memory repositories
//!
//! One mutex guards all state, so every operation is atomic the way the
//! conditional SQL updates are.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    DomainError, FeedbackSettings, FeedbackSettingsRepository, FeedbackTask,
    FeedbackTaskRepository, NewFeedbackTask, PhoneNumber, RepoResult, SessionRepository,
    SessionStatus, StoreId, TaskStats, TaskStatus, TenantSession,
};
use parking_lot::Mutex;

#[derive(Default)]
struct Inner {
    next_id: i64,
    settings: HashMap<StoreId, FeedbackSettings>,
    tasks: BTreeMap<i64, FeedbackTask>,
    sessions: HashMap<StoreId, TenantSession>,
}

/// Repository operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    SettingsFind,
    ClaimDue,
    MarkPollSent,
    Transition,
    FindOpenPoll,
}

/// Settings, task and session store held in memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    faults: Mutex<HashSet<Fault>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a task
    pub fn task(&self, id: i64) -> Option<FeedbackTask> {
        self.inner.lock().tasks.get(&id).cloned()
    }

    pub fn tasks(&self) -> Vec<FeedbackTask> {
        self.inner.lock().tasks.values().cloned().collect()
    }

    /// Store settings directly, bypassing validation
    pub fn put_settings(&self, settings: FeedbackSettings) {
        self.inner.lock().settings.insert(settings.store_id, settings);
    }

    pub fn session(&self, store_id: StoreId) -> Option<TenantSession> {
        self.inner.lock().sessions.get(&store_id).cloned()
    }

    /// Make `fault` fail with a database error until [`heal`](Self::heal)
    pub fn fail(&self, fault: Fault) {
        self.faults.lock().insert(fault);
    }

    pub fn heal(&self, fault: Fault) {
        self.faults.lock().remove(&fault);
    }

    fn check(&self, fault: Fault) -> RepoResult<()> {
        if self.faults.lock().contains(&fault) {
            return Err(DomainError::DatabaseError(format!("injected {fault:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedbackSettingsRepository for MemoryStore {
    async fn find(&self, store_id: StoreId) -> RepoResult<Option<FeedbackSettings>> {
        self.check(Fault::SettingsFind)?;
        Ok(self.inner.lock().settings.get(&store_id).cloned())
    }

    async fn get_or_create(&self, store_id: StoreId) -> RepoResult<FeedbackSettings> {
        Ok(self
            .inner
            .lock()
            .settings
            .entry(store_id)
            .or_insert_with(|| FeedbackSettings::defaults(store_id))
            .clone())
    }

    async fn upsert(&self, settings: &FeedbackSettings) -> RepoResult<FeedbackSettings> {
        let mut saved = settings.clone();
        saved.updated_at = Utc::now();
        self.inner
            .lock()
            .settings
            .insert(saved.store_id, saved.clone());
        Ok(saved)
    }
}

#[async_trait]
impl FeedbackTaskRepository for MemoryStore {
    async fn enqueue(
        &self,
        task: &NewFeedbackTask,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<FeedbackTask>> {
        let mut inner = self.inner.lock();
        let duplicate = inner.tasks.values().any(|t| {
            t.store_id == task.store_id
                && t.order_id == task.order_id
                && t.customer_phone == task.customer_phone
        });
        if duplicate {
            return Ok(None);
        }

        inner.next_id += 1;
        let created = FeedbackTask {
            id: inner.next_id,
            store_id: task.store_id,
            order_id: task.order_id.clone(),
            customer_phone: task.customer_phone.clone(),
            status: TaskStatus::Pending,
            scheduled_at: task.scheduled_at,
            claimed_at: None,
            poll_message_id: None,
            poll_sent_at: None,
            review_links: task.review_links.clone(),
            review_links_sent: false,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        inner.tasks.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<FeedbackTask>> {
        Ok(self.task(id))
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: u32) -> RepoResult<Vec<FeedbackTask>> {
        self.check(Fault::ClaimDue)?;
        let mut inner = self.inner.lock();
        let mut due: Vec<_> = inner
            .tasks
            .values()
            .filter(|t| t.is_due(now))
            .map(|t| (t.scheduled_at, t.id))
            .collect();
        due.sort();
        due.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(due.len());
        for (_, id) in due {
            if let Some(task) = inner.tasks.get_mut(&id) {
                task.status = TaskStatus::Sending;
                task.claimed_at = Some(now);
                task.updated_at = now;
                claimed.push(task.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_poll_sent(
        &self,
        id: i64,
        poll_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        self.check(Fault::MarkPollSent)?;
        Ok(self.update_if(id, TaskStatus::Sending, |task| {
            task.status = TaskStatus::PollSent;
            task.poll_message_id = Some(poll_message_id.to_string());
            task.poll_sent_at = Some(sent_at);
            task.updated_at = sent_at;
        }))
    }

    async fn mark_failed(&self, id: i64, error: &str, now: DateTime<Utc>) -> RepoResult<bool> {
        Ok(self.update_if(id, TaskStatus::Sending, |task| {
            task.status = TaskStatus::Failed;
            task.last_error = Some(error.to_string());
            task.updated_at = now;
        }))
    }

    async fn transition(
        &self,
        id: i64,
        from: TaskStatus,
        to: TaskStatus,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        self.check(Fault::Transition)?;
        if !from.can_transition_to(to) {
            return Err(DomainError::InvalidTransition { from, to });
        }
        Ok(self.update_if(id, from, |task| {
            task.status = to;
            task.updated_at = now;
        }))
    }

    async fn mark_review_links_sent(&self, id: i64, now: DateTime<Utc>) -> RepoResult<bool> {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(&id) {
            Some(task) if task.status == TaskStatus::Positive && !task.review_links_sent => {
                task.review_links_sent = true;
                task.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_stale_polls(
        &self,
        now: DateTime<Utc>,
        default_expire_hours: i32,
    ) -> RepoResult<u64> {
        let mut inner = self.inner.lock();
        let Inner {
            settings, tasks, ..
        } = &mut *inner;

        let mut expired = 0;
        for task in tasks.values_mut() {
            let hours = settings
                .get(&task.store_id)
                .map_or(default_expire_hours, |s| s.expire_hours);
            if task.is_poll_stale(now, hours) {
                task.status = TaskStatus::Expired;
                task.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn release_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let mut inner = self.inner.lock();
        let mut released = 0;
        for task in inner.tasks.values_mut() {
            if task.status == TaskStatus::Sending
                && task.claimed_at.is_some_and(|at| at < claimed_before)
            {
                task.status = TaskStatus::Pending;
                task.claimed_at = None;
                task.updated_at = now;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn find_open_poll(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        poll_message_id: Option<&str>,
    ) -> RepoResult<Option<FeedbackTask>> {
        self.check(Fault::FindOpenPoll)?;
        Ok(self
            .inner
            .lock()
            .tasks
            .values()
            .filter(|t| {
                t.status == TaskStatus::PollSent
                    && t.store_id == store_id
                    && &t.customer_phone == phone
                    && poll_message_id.map_or(true, |id| t.poll_message_id.as_deref() == Some(id))
            })
            .max_by_key(|t| (t.poll_sent_at, t.id))
            .cloned())
    }

    async fn stats(&self, store_id: StoreId) -> RepoResult<TaskStats> {
        let inner = self.inner.lock();
        let mut stats = TaskStats::default();
        for task in inner.tasks.values().filter(|t| t.store_id == store_id) {
            stats.record(task.status, 1);
            if task.review_links_sent {
                stats.review_links_sent += 1;
            }
        }
        Ok(stats)
    }
}

impl MemoryStore {
    /// Apply `change` when the task is in `expected`; mirrors `UPDATE … WHERE status = $expected`
    fn update_if(&self, id: i64, expected: TaskStatus, change: impl FnOnce(&mut FeedbackTask)) -> bool {
        let mut inner = self.inner.lock();
        match inner.tasks.get_mut(&id) {
            Some(task) if task.status == expected => {
                change(task);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn find(&self, store_id: StoreId) -> RepoResult<Option<TenantSession>> {
        Ok(self.session(store_id))
    }

    async fn list_resumable(&self) -> RepoResult<Vec<TenantSession>> {
        let inner = self.inner.lock();
        let mut resumable: Vec<_> = inner
            .sessions
            .values()
            .filter(|s| s.is_resumable())
            .cloned()
            .collect();
        resumable.sort_by_key(|s| s.store_id);
        Ok(resumable)
    }

    async fn save_status(
        &self,
        store_id: StoreId,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .entry(store_id)
            .or_insert_with(|| empty_session(store_id, now));
        session.status = status;
        session.is_connected = status.is_connected();
        if status.is_connected() {
            session.last_seen_at = Some(now);
        }
        session.updated_at = now;
        Ok(())
    }

    async fn save_credentials(
        &self,
        store_id: StoreId,
        credentials: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .entry(store_id)
            .or_insert_with(|| empty_session(store_id, now));
        session.credentials = Some(credentials.clone());
        session.updated_at = now;
        Ok(())
    }

    async fn clear(&self, store_id: StoreId, now: DateTime<Utc>) -> RepoResult<()> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .entry(store_id)
            .or_insert_with(|| empty_session(store_id, now));
        session.status = SessionStatus::Disconnected;
        session.is_connected = false;
        session.credentials = None;
        session.updated_at = now;
        Ok(())
    }
}

fn empty_session(store_id: StoreId, now: DateTime<Utc>) -> TenantSession {
    TenantSession {
        store_id,
        status: SessionStatus::Disconnected,
        credentials: None,
        is_connected: false,
        last_seen_at: None,
        updated_at: now,
    }
}

