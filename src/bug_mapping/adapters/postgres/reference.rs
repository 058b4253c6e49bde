//! `PostgreSQL` loader for known tests and jobs.

use super::{
    models::{JobRow, TestRow},
    repository::TicketPgPool,
    schema::{jobs, tests},
};
use crate::bug_mapping::{
    domain::{JobCache, JobId, JobRef, TestCache, TestId, TestRef},
    ports::{ReferenceDataError, ReferenceDataSource},
};
use async_trait::async_trait;
use diesel::prelude::*;

/// Loads reference data from the `tests` and `jobs` tables.
#[derive(Debug, Clone)]
pub struct PostgresReferenceData {
    pool: TicketPgPool,
}

impl PostgresReferenceData {
    /// Creates a loader from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TicketPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceDataSource for PostgresReferenceData {
    async fn load_test_cache(&self) -> Result<TestCache, ReferenceDataError> {
        let pool = self.pool.clone();
        let rows = tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ReferenceDataError::persistence)?;
            tests::table
                .select(TestRow::as_select())
                .load::<TestRow>(&mut connection)
                .map_err(ReferenceDataError::persistence)
        })
        .await
        .map_err(ReferenceDataError::persistence)??;
        Ok(rows
            .into_iter()
            .map(|row| TestRef::new(TestId::new(row.id), row.name))
            .collect())
    }

    async fn load_job_cache(&self) -> Result<JobCache, ReferenceDataError> {
        let pool = self.pool.clone();
        let rows = tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ReferenceDataError::persistence)?;
            jobs::table
                .select(JobRow::as_select())
                .load::<JobRow>(&mut connection)
                .map_err(ReferenceDataError::persistence)
        })
        .await
        .map_err(ReferenceDataError::persistence)??;
        Ok(rows
            .into_iter()
            .map(|row| JobRef::new(JobId::new(row.id), row.name))
            .collect())
    }
}
