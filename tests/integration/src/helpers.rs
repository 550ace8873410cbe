//! Test helpers for integration tests
//!
//! [`Harness`] wires the services over in-memory repositories and a recording
//! sender. [`TestServer`] runs the full HTTP application over the same
//! repositories and a fake messaging bridge.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use courier_api::{assemble, Application, Repositories};
use courier_common::SchedulerConfig;
use courier_service::{
    FeedbackScheduler, FeedbackService, ReplyClassifier, ServiceContext, ServiceContextBuilder,
};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bridge::FakeBridge;
use crate::fixtures::{scheduler_config, test_config, TEST_API_KEY, TEST_WEBHOOK_SECRET};
use crate::memory::MemoryStore;
use crate::sender::RecordingSender;

/// Services over in-memory state
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub sender: Arc<RecordingSender>,
    pub ctx: ServiceContext,
    pub scheduler: Arc<FeedbackScheduler>,
    pub classifier: ReplyClassifier,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_scheduler_config(scheduler_config())
    }

    pub fn with_scheduler_config(config: SchedulerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let sender = Arc::new(RecordingSender::new());
        let ctx = service_context(&store, sender.clone());

        Self {
            scheduler: Arc::new(FeedbackScheduler::new(ctx.clone(), config)),
            classifier: ReplyClassifier::new(ctx.clone()),
            store,
            sender,
            ctx,
        }
    }

    /// Second scheduler sharing this harness's state, as another worker would
    pub fn another_scheduler(&self) -> FeedbackScheduler {
        FeedbackScheduler::new(self.ctx.clone(), self.scheduler.config().clone())
    }

    pub fn feedback(&self) -> FeedbackService<'_> {
        FeedbackService::new(&self.ctx)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

fn service_context(store: &Arc<MemoryStore>, sender: Arc<RecordingSender>) -> ServiceContext {
    ServiceContextBuilder::new()
        .settings_repo(store.clone())
        .task_repo(store.clone())
        .session_repo(store.clone())
        .sender(sender)
        .build()
        .expect("all dependencies provided")
}

/// HTTP server over in-memory repositories and a [`FakeBridge`]
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub bridge: Arc<FakeBridge>,
    pub app: Application,
    _shutdown: watch::Sender<bool>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server on an ephemeral port
    pub async fn start() -> Result<Self> {
        let config = test_config()?;
        let store = Arc::new(MemoryStore::new());
        let bridge = Arc::new(FakeBridge::new());

        // Never connects: readiness reports the database as down
        let pool = courier_db::pool_options(&config.database)
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database.url)?;

        let repos = Repositories {
            settings: store.clone(),
            tasks: store.clone(),
            sessions: store.clone(),
        };
        let mut app = assemble(config, pool, repos, bridge.clone())?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        app.start_background(shutdown_rx).await?;

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let router = app.router();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            store,
            bridge,
            app,
            _shutdown: shutdown_tx,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// GET without credentials
    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    pub async fn get_auth(&self, path: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(TEST_API_KEY)
            .send()
            .await?)
    }

    pub async fn post_auth<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(TEST_API_KEY)
            .json(body)
            .send()
            .await?)
    }

    pub async fn put_auth<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(self
            .client
            .put(self.url(path))
            .bearer_auth(TEST_API_KEY)
            .json(body)
            .send()
            .await?)
    }

    pub async fn delete_auth(&self, path: &str) -> Result<Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(TEST_API_KEY)
            .send()
            .await?)
    }

    /// POST a provider event with the webhook secret
    pub async fn post_webhook<T: Serialize>(&self, body: &T) -> Result<Response> {
        Ok(self
            .client
            .post(self.url("/api/v1/webhooks/messaging"))
            .header(courier_api::extractors::WEBHOOK_SECRET_HEADER, TEST_WEBHOOK_SECRET)
            .json(body)
            .send()
            .await?)
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status only
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}
