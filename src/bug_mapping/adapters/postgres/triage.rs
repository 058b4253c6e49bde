//! `PostgreSQL` repository implementation for triage ticket links.

use super::{models::TriageLinkRow, repository::TicketPgPool, schema::triages};
use crate::bug_mapping::{
    domain::{LinkedTicket, TicketId, Triage, TriageId},
    ports::{TriageRepository, TriageRepositoryError, TriageRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;

/// `PostgreSQL`-backed triage repository.
#[derive(Debug, Clone)]
pub struct PostgresTriageRepository {
    pool: TicketPgPool,
}

impl PostgresTriageRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TicketPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TriageRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TriageRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TriageRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TriageRepositoryError::persistence)?
    }
}

#[async_trait]
impl TriageRepository for PostgresTriageRepository {
    async fn list(&self) -> TriageRepositoryResult<Vec<Triage>> {
        self.run_blocking(|connection| {
            let rows = diesel::sql_query(concat!(
                "SELECT tr.id, tr.description, tr.url, tr.ticket_id, t.url AS ticket_url ",
                "FROM triages tr ",
                "LEFT JOIN tickets t ON t.id = tr.ticket_id ",
                "ORDER BY tr.id",
            ))
            .load::<TriageLinkRow>(connection)
            .map_err(TriageRepositoryError::persistence)?;
            rows.into_iter().map(row_to_triage).collect()
        })
        .await
    }

    async fn link_ticket(
        &self,
        triage_id: TriageId,
        ticket: &LinkedTicket,
    ) -> TriageRepositoryResult<()> {
        let ticket_id = ticket.id.value();
        self.run_blocking(move |connection| {
            let updated = diesel::update(triages::table.find(triage_id.value()))
                .set(triages::ticket_id.eq(Some(ticket_id)))
                .execute(connection)
                .map_err(TriageRepositoryError::persistence)?;
            if updated == 0 {
                return Err(TriageRepositoryError::NotFound(triage_id));
            }
            Ok(())
        })
        .await
    }

    async fn unlink_ticket(&self, triage_id: TriageId) -> TriageRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let updated = diesel::update(triages::table.find(triage_id.value()))
                .set(triages::ticket_id.eq(None::<i64>))
                .execute(connection)
                .map_err(TriageRepositoryError::persistence)?;
            if updated == 0 {
                return Err(TriageRepositoryError::NotFound(triage_id));
            }
            Ok(())
        })
        .await
    }
}

fn row_to_triage(row: TriageLinkRow) -> TriageRepositoryResult<Triage> {
    let triage = Triage::new(TriageId::new(row.id), row.description, row.url);
    let linked = match (row.ticket_id, row.ticket_url) {
        (Some(id), Some(url)) => Some(LinkedTicket {
            id: TicketId::new(id).map_err(TriageRepositoryError::persistence)?,
            url,
        }),
        _ => None,
    };
    Ok(match linked {
        Some(link) => triage.with_link(link),
        None => triage,
    })
}
