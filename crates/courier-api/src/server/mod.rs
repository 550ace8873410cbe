//! Server setup and initialization
//!
//! Wires the database, the messaging bridge, the session manager and the
//! background workers together and serves the HTTP API until shutdown.

mod shutdown;

use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use courier_common::{AppConfig, AppError, AppResult};
use courier_core::{
    FeedbackSettingsRepository, FeedbackTaskRepository, InboundEvent, SessionRepository,
};
use courier_db::{
    create_pool, run_migrations, PgFeedbackSettingsRepository, PgFeedbackTaskRepository, PgPool,
    PgSessionRepository,
};
use courier_service::{FeedbackScheduler, ReplyClassifier, ServiceContextBuilder};
use courier_session::{HttpBridgeTransport, MessagingTransport, SessionManager};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;

pub use shutdown::shutdown_signal;

/// Buffered inbound events pushed by live sessions
const INBOUND_BUFFER: usize = 256;

/// Repository implementations the application runs on
#[derive(Clone)]
pub struct Repositories {
    pub settings: Arc<dyn FeedbackSettingsRepository>,
    pub tasks: Arc<dyn FeedbackTaskRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Repositories {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            settings: Arc::new(PgFeedbackSettingsRepository::new(pool.clone())),
            tasks: Arc::new(PgFeedbackTaskRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
        }
    }
}

/// Fully wired application, background workers not yet started
pub struct Application {
    pub state: AppState,
    pub scheduler: Arc<FeedbackScheduler>,
    classifier: Arc<ReplyClassifier>,
    sessions: Arc<SessionManager>,
    inbound: Option<mpsc::Receiver<InboundEvent>>,
}

impl Application {
    /// Axum router for this application
    pub fn router(&self) -> Router {
        create_app(self.state.clone())
    }

    /// Resume persisted sessions, recover stale claims and spawn the workers
    ///
    /// The returned handles end once `shutdown` fires, except the inbound
    /// consumer which lives as long as the session manager.
    pub async fn start_background(
        &mut self,
        shutdown: watch::Receiver<bool>,
    ) -> AppResult<BackgroundTasks> {
        let config = self.state.config();

        if config.session.resume_on_startup {
            match self.sessions.resume_persisted().await {
                Ok(count) => info!(count, "Persisted sessions resumed"),
                Err(e) => warn!(error = %e, "Failed to resume persisted sessions"),
            }
        }

        let released = self
            .scheduler
            .recover_stale_claims(Utc::now())
            .await
            .map_err(AppError::from)?;
        info!(released, "Stale task claims recovered");

        let workers = if config.scheduler.enabled {
            self.scheduler.clone().start(shutdown)
        } else {
            info!("Feedback scheduler disabled");
            Vec::new()
        };

        let inbound = self
            .inbound
            .take()
            .map(|rx| tokio::spawn(self.classifier.clone().run(rx)));

        Ok(BackgroundTasks { workers, inbound })
    }
}

/// Handles of the spawned background work
pub struct BackgroundTasks {
    workers: Vec<JoinHandle<()>>,
    inbound: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Wait for the scheduler loops and stop the inbound consumer
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Background worker ended abnormally");
            }
        }
        if let Some(inbound) = self.inbound {
            inbound.abort();
        }
    }
}

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let router = create_router();
    let router = apply_middleware(
        router,
        &state.config().cors,
        state.config().app.env.is_production(),
    );
    router.with_state(state)
}

/// Wire the application from explicit repositories and transport
pub fn assemble(
    config: AppConfig,
    pool: PgPool,
    repos: Repositories,
    transport: Arc<dyn MessagingTransport>,
) -> AppResult<Application> {
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

    let sessions = Arc::new(SessionManager::new(
        transport,
        repos.sessions.clone(),
        inbound_tx,
        config.session.clone(),
    ));

    let service_context = ServiceContextBuilder::new()
        .settings_repo(repos.settings)
        .task_repo(repos.tasks)
        .session_repo(repos.sessions)
        .sender(sessions.clone())
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let scheduler = Arc::new(FeedbackScheduler::new(
        service_context.clone(),
        config.scheduler.clone(),
    ));
    let classifier = Arc::new(ReplyClassifier::new(service_context.clone()));

    let state = AppState::new(
        service_context,
        sessions.clone(),
        classifier.clone(),
        pool,
        config,
    );

    Ok(Application {
        state,
        scheduler,
        classifier,
        sessions,
        inbound: Some(inbound_rx),
    })
}

/// Connect to PostgreSQL and the messaging bridge, then wire the application
///
/// Fails when the database is unreachable or migrations do not apply.
pub async fn build(config: AppConfig) -> AppResult<Application> {
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    run_migrations(&pool, &config.database.migrations_dir)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let transport = HttpBridgeTransport::new(&config.bridge)
        .map_err(|e| AppError::Config(format!("messaging bridge client: {e}")))?;
    info!(url = %config.bridge.url, "Messaging bridge client ready");

    let repos = Repositories::postgres(&pool);
    assemble(config, pool, repos, Arc::new(transport))
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> AppResult<()> {
    let addr = config.api.address();
    let mut app = build(config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = app.start_background(shutdown_rx).await?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    // Already set by the signal handler unless the server stopped on its own
    let _ = shutdown_tx.send(true);
    background.join().await;
    app.sessions.shutdown();

    info!("Server stopped");
    Ok(())
}
