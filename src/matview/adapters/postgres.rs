//! `PostgreSQL` view store.

use crate::matview::{
    domain::ViewName,
    ports::{RefreshMode, ViewStore, ViewStoreError, ViewStoreResult},
};
use crate::postgres::PgPool;
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

/// Renders the refresh statement for `view`.
#[must_use]
pub fn refresh_statement(view: &ViewName, mode: RefreshMode) -> String {
    match mode {
        RefreshMode::Concurrent => format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {view}"),
        RefreshMode::Blocking => format!("REFRESH MATERIALIZED VIEW {view}"),
    }
}

/// Renders the row-count probe for `view`.
#[must_use]
pub fn count_statement(view: &ViewName) -> String {
    format!("SELECT COUNT(*) AS row_count FROM {view}")
}

#[derive(QueryableByName)]
struct RowCount {
    #[diesel(sql_type = BigInt)]
    row_count: i64,
}

/// View store issuing refresh statements over a Diesel pool.
#[derive(Debug, Clone)]
pub struct PostgresViewStore {
    pool: PgPool,
}

impl PostgresViewStore {
    /// Creates a store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ViewStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ViewStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ViewStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ViewStoreError::persistence)?
    }
}

#[async_trait]
impl ViewStore for PostgresViewStore {
    async fn count_rows(&self, view: &ViewName) -> ViewStoreResult<u64> {
        let sql = count_statement(view);
        self.run_blocking(move |connection| {
            let counted = diesel::sql_query(sql)
                .get_result::<RowCount>(connection)
                .map_err(ViewStoreError::persistence)?;
            Ok(u64::try_from(counted.row_count).unwrap_or_default())
        })
        .await
    }

    async fn refresh(&self, view: &ViewName, mode: RefreshMode) -> ViewStoreResult<()> {
        let sql = refresh_statement(view, mode);
        self.run_blocking(move |connection| {
            connection
                .batch_execute(&sql)
                .map_err(ViewStoreError::persistence)
        })
        .await
    }
}
