//! `PostgreSQL` lookup of job runs.

use crate::job_artifacts::{
    domain::JobRunId,
    ports::{JobRunRecord, JobRunRepository, JobRunRepositoryError},
};
use crate::postgres::PgPool;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text};

/// Selects a job run joined with its job definition name.
pub const FIND_JOB_RUN_SQL: &str = concat!(
    "SELECT r.id, j.name AS job_name, r.url ",
    "FROM job_runs r JOIN jobs j ON j.id = r.job_id ",
    "WHERE r.id = $1",
);

#[derive(QueryableByName)]
struct JobRunRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Text)]
    job_name: String,
    #[diesel(sql_type = Nullable<Text>)]
    url: Option<String>,
}

/// `PostgreSQL`-backed job run repository.
#[derive(Debug, Clone)]
pub struct PostgresJobRunRepository {
    pool: PgPool,
}

impl PostgresJobRunRepository {
    /// Creates a repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRunRepository for PostgresJobRunRepository {
    async fn find_job_run(
        &self,
        id: JobRunId,
    ) -> Result<Option<JobRunRecord>, JobRunRepositoryError> {
        let pool = self.pool.clone();
        let row = tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(JobRunRepositoryError::persistence)?;
            diesel::sql_query(FIND_JOB_RUN_SQL)
                .bind::<BigInt, _>(id.value())
                .get_result::<JobRunRow>(&mut connection)
                .optional()
                .map_err(JobRunRepositoryError::persistence)
        })
        .await
        .map_err(JobRunRepositoryError::persistence)??;

        Ok(row.map(|found| JobRunRecord {
            id: JobRunId::new(found.id),
            job_name: found.job_name,
            url: found.url.filter(|url| !url.is_empty()),
        }))
    }
}
