//! Background loops driving the scheduler

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use super::FeedbackScheduler;

impl FeedbackScheduler {
    /// Spawn the dispatch and expiry loops; the expiry loop also recovers
    /// stale claims
    ///
    /// Both loops stop after their current tick once `shutdown` flips to
    /// `true` (or its sender is dropped).
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        if self.running.swap(true, Ordering::AcqRel) {
            info!("Feedback scheduler already running");
            return Vec::new();
        }

        info!(
            dispatch_every = ?self.config.dispatch_interval(),
            expire_every = ?self.config.expiry_interval(),
            batch_size = self.config.batch_size,
            "Starting feedback scheduler"
        );

        let dispatch = tokio::spawn(self.clone().dispatch_loop(shutdown.clone()));
        let expiry = tokio::spawn(self.expiry_loop(shutdown));
        vec![dispatch, expiry]
    }

    async fn dispatch_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let start = Instant::now() + self.config.startup_delay();
        let mut ticker = interval_at(start, self.config.dispatch_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.dispatch_due(Utc::now()).await {
                        error!(error = %e, "Dispatch tick failed");
                    }
                }
                _ = stopped(&mut shutdown) => break,
            }
        }

        self.running.store(false, Ordering::Release);
        info!("Dispatch loop stopped");
    }

    async fn expiry_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.expiry_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    if let Err(e) = self.expire_stale(now).await {
                        error!(error = %e, "Expiry tick failed");
                    }
                    if let Err(e) = self.recover_stale_claims(now).await {
                        error!(error = %e, "Claim recovery failed");
                    }
                }
                _ = stopped(&mut shutdown) => break,
            }
        }

        info!("Expiry loop stopped");
    }
}

/// Resolves once shutdown is requested
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
