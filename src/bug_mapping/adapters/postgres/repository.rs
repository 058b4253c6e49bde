//! `PostgreSQL` repository implementation for ticket storage.

use super::{
    models::{JobRow, NewTicketJobRow, NewTicketRow, NewTicketTestRow, StoredTicketRow, TestRow},
    schema::{jobs, ticket_jobs, ticket_tests, tickets, tests},
};
use crate::bug_mapping::{
    domain::{JobId, JobRef, TestId, TestRef, Ticket, TicketDetails, TicketId, TicketKey},
    ports::{TicketRepository, TicketRepositoryError, TicketRepositoryResult},
};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::{Array, BigInt};

/// `PostgreSQL` connection pool type used by ticket adapters.
pub type TicketPgPool = crate::postgres::PgPool;

/// Staging table holding the authoritative ticket IDs for one resync.
const CREATE_RESYNC_STAGING_SQL: &str =
    "CREATE TEMPORARY TABLE ticket_resync_ids (id BIGINT PRIMARY KEY) ON COMMIT DROP";

/// Fills the staging table from a bound `BIGINT[]`.
const FILL_RESYNC_STAGING_SQL: &str =
    "INSERT INTO ticket_resync_ids (id) SELECT DISTINCT unnest($1::BIGINT[])";

/// Deletes tickets absent from the staging table.
const DELETE_UNSTAGED_TICKETS_SQL: &str = concat!(
    "DELETE FROM tickets t ",
    "WHERE NOT EXISTS (SELECT 1 FROM ticket_resync_ids s WHERE s.id = t.id)",
);

/// `PostgreSQL`-backed ticket repository.
#[derive(Debug, Clone)]
pub struct PostgresTicketRepository {
    pool: TicketPgPool,
}

impl PostgresTicketRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TicketPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TicketRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TicketRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TicketRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TicketRepositoryError::persistence)?
    }
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn upsert(&self, ticket: &Ticket) -> TicketRepositoryResult<()> {
        let new_row = to_new_row(ticket);
        self.run_blocking(move |connection| {
            diesel::insert_into(tickets::table)
                .values(&new_row)
                .on_conflict(tickets::id)
                .do_update()
                .set(&new_row)
                .execute(connection)
                .map_err(TicketRepositoryError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn replace_tests(
        &self,
        ticket_id: TicketId,
        tests: &[TestRef],
    ) -> TicketRepositoryResult<()> {
        let rows: Vec<NewTicketTestRow> = tests
            .iter()
            .map(|test| NewTicketTestRow {
                ticket_id: ticket_id.value(),
                test_id: test.id().value(),
            })
            .collect();

        self.run_blocking(move |connection| {
            let found = connection
                .transaction::<bool, DieselError, _>(|conn| {
                    if !ticket_exists(conn, ticket_id)? {
                        return Ok(false);
                    }
                    diesel::delete(
                        ticket_tests::table.filter(ticket_tests::ticket_id.eq(ticket_id.value())),
                    )
                    .execute(conn)?;
                    if !rows.is_empty() {
                        diesel::insert_into(ticket_tests::table)
                            .values(&rows)
                            .on_conflict_do_nothing()
                            .execute(conn)?;
                    }
                    Ok(true)
                })
                .map_err(TicketRepositoryError::persistence)?;
            if found {
                Ok(())
            } else {
                Err(TicketRepositoryError::NotFound(ticket_id))
            }
        })
        .await
    }

    async fn replace_jobs(
        &self,
        ticket_id: TicketId,
        jobs: &[JobRef],
    ) -> TicketRepositoryResult<()> {
        let rows: Vec<NewTicketJobRow> = jobs
            .iter()
            .map(|job| NewTicketJobRow {
                ticket_id: ticket_id.value(),
                job_id: job.id().value(),
            })
            .collect();

        self.run_blocking(move |connection| {
            let found = connection
                .transaction::<bool, DieselError, _>(|conn| {
                    if !ticket_exists(conn, ticket_id)? {
                        return Ok(false);
                    }
                    diesel::delete(
                        ticket_jobs::table.filter(ticket_jobs::ticket_id.eq(ticket_id.value())),
                    )
                    .execute(conn)?;
                    if !rows.is_empty() {
                        diesel::insert_into(ticket_jobs::table)
                            .values(&rows)
                            .on_conflict_do_nothing()
                            .execute(conn)?;
                    }
                    Ok(true)
                })
                .map_err(TicketRepositoryError::persistence)?;
            if found {
                Ok(())
            } else {
                Err(TicketRepositoryError::NotFound(ticket_id))
            }
        })
        .await
    }

    async fn delete_except(&self, keep: &[TicketId]) -> TicketRepositoryResult<u64> {
        let ids: Vec<i64> = keep.iter().map(|id| id.value()).collect();
        self.run_blocking(move |connection| {
            // Staging plus anti-join runs in one transaction so readers never
            // observe a partially applied resync.
            let deleted = connection
                .transaction::<usize, DieselError, _>(|conn| {
                    conn.batch_execute(CREATE_RESYNC_STAGING_SQL)?;
                    diesel::sql_query(FILL_RESYNC_STAGING_SQL)
                        .bind::<Array<BigInt>, _>(ids)
                        .execute(conn)?;
                    diesel::sql_query(DELETE_UNSTAGED_TICKETS_SQL).execute(conn)
                })
                .map_err(TicketRepositoryError::persistence)?;
            Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
        })
        .await
    }

    async fn find_by_id(&self, id: TicketId) -> TicketRepositoryResult<Option<Ticket>> {
        self.run_blocking(move |connection| {
            let row = tickets::table
                .find(id.value())
                .select(StoredTicketRow::as_select())
                .first::<StoredTicketRow>(connection)
                .optional()
                .map_err(TicketRepositoryError::persistence)?;
            row.map(|found| load_ticket(connection, found)).transpose()
        })
        .await
    }

    async fn find_by_url(&self, url: &str) -> TicketRepositoryResult<Option<Ticket>> {
        let lookup_url = url.to_owned();
        self.run_blocking(move |connection| {
            let row = tickets::table
                .filter(tickets::url.eq(&lookup_url))
                .order(tickets::id)
                .select(StoredTicketRow::as_select())
                .first::<StoredTicketRow>(connection)
                .optional()
                .map_err(TicketRepositoryError::persistence)?;
            row.map(|found| load_ticket(connection, found)).transpose()
        })
        .await
    }
}

fn ticket_exists(connection: &mut PgConnection, id: TicketId) -> Result<bool, DieselError> {
    diesel::select(diesel::dsl::exists(tickets::table.find(id.value()))).get_result(connection)
}

fn to_new_row(ticket: &Ticket) -> NewTicketRow {
    let details = ticket.details();
    NewTicketRow {
        id: ticket.id().value(),
        key: ticket.key().as_str().to_owned(),
        status: details.status.clone(),
        summary: details.summary.clone(),
        last_change_time: details.last_changed_at,
        affects_versions: details.affects_versions.clone(),
        fix_versions: details.fix_versions.clone(),
        target_versions: details.target_versions.clone(),
        components: details.components.clone(),
        labels: details.labels.clone(),
        url: ticket.url().to_owned(),
    }
}

fn load_ticket(
    connection: &mut PgConnection,
    row: StoredTicketRow,
) -> TicketRepositoryResult<Ticket> {
    let ticket_id = row.id;
    let linked_tests = ticket_tests::table
        .inner_join(tests::table)
        .filter(ticket_tests::ticket_id.eq(ticket_id))
        .order(tests::id)
        .select(TestRow::as_select())
        .load::<TestRow>(connection)
        .map_err(TicketRepositoryError::persistence)?;
    let linked_jobs = ticket_jobs::table
        .inner_join(jobs::table)
        .filter(ticket_jobs::ticket_id.eq(ticket_id))
        .order(jobs::id)
        .select(JobRow::as_select())
        .load::<JobRow>(connection)
        .map_err(TicketRepositoryError::persistence)?;

    let ticket = row_to_ticket(row)?
        .with_tests(
            linked_tests
                .into_iter()
                .map(|test| TestRef::new(TestId::new(test.id), test.name)),
        )
        .with_jobs(
            linked_jobs
                .into_iter()
                .map(|job| JobRef::new(JobId::new(job.id), job.name)),
        );
    Ok(ticket)
}

fn row_to_ticket(row: StoredTicketRow) -> TicketRepositoryResult<Ticket> {
    let StoredTicketRow {
        id,
        key,
        status,
        summary,
        last_change_time,
        affects_versions,
        fix_versions,
        target_versions,
        components,
        labels,
        url,
    } = row;

    let ticket_id = TicketId::new(id).map_err(TicketRepositoryError::persistence)?;
    let ticket_key = TicketKey::new(key).map_err(TicketRepositoryError::persistence)?;
    let details = TicketDetails {
        status,
        summary,
        last_changed_at: last_change_time,
        affects_versions,
        fix_versions,
        target_versions,
        components,
        labels,
    };
    Ok(Ticket::from_persisted(ticket_id, ticket_key, url, details))
}
