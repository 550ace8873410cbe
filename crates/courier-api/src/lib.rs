//! # courier-api
//!
//! HTTP access layer built with Axum: session control, feedback settings and
//! enqueue endpoints, and the provider webhook.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{assemble, build, create_app, run, Application, BackgroundTasks, Repositories};
pub use state::AppState;
