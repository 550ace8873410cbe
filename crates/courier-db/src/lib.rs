//! # courier-db
//!
//! Database layer implementing repository traits with PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! This crate provides PostgreSQL implementations for the repository traits
//! defined in `courier-core`. It handles:
//!
//! - Connection pool management and runtime migrations
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - Repository implementations, including the `FOR UPDATE SKIP LOCKED` task claim
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_common::AppConfig;
//! use courier_db::{create_pool, run_migrations, PgFeedbackTaskRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let pool = create_pool(&config.database).await?;
//!     run_migrations(&pool, "./migrations").await?;
//!     let tasks = PgFeedbackTaskRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, pool_options, run_migrations, PgPool};
pub use repositories::{PgFeedbackSettingsRepository, PgFeedbackTaskRepository, PgSessionRepository};
