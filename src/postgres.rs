//! Shared `PostgreSQL` connection pool helpers.
//!
//! Each context's adapters define their own pool alias over [`PgPool`] and
//! offload synchronous Diesel work with [`tokio::task::spawn_blocking`].

use crate::config::DatabaseConfig;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};

/// `PostgreSQL` connection pool type.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Builds a connection pool from database configuration.
///
/// # Errors
///
/// Returns [`PoolError`] when the pool cannot establish its initial
/// connections.
pub fn build_pool(config: &DatabaseConfig) -> Result<PgPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(config.url.as_str());
    Pool::builder()
        .max_size(config.pool_size.max(1))
        .build(manager)
}
