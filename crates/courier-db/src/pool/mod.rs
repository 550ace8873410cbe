//! Database connection pool management

mod postgres;

pub use postgres::{create_pool, pool_options, run_migrations};

pub use sqlx::postgres::PgPool;
