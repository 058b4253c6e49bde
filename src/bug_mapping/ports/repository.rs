//! Repository ports for ticket and triage persistence.

use crate::bug_mapping::domain::{JobRef, LinkedTicket, TestRef, Ticket, TicketId, Triage, TriageId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for ticket repository operations.
pub type TicketRepositoryResult<T> = Result<T, TicketRepositoryError>;

/// Ticket persistence contract.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Inserts the ticket row, or updates every column when a row with the
    /// same identifier exists.
    ///
    /// Test and job associations are not touched.
    async fn upsert(&self, ticket: &Ticket) -> TicketRepositoryResult<()>;

    /// Replaces the ticket's test associations with exactly `tests`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketRepositoryError::NotFound`] when the ticket row does not
    /// exist.
    async fn replace_tests(
        &self,
        ticket_id: TicketId,
        tests: &[TestRef],
    ) -> TicketRepositoryResult<()>;

    /// Replaces the ticket's job associations with exactly `jobs`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketRepositoryError::NotFound`] when the ticket row does not
    /// exist.
    async fn replace_jobs(&self, ticket_id: TicketId, jobs: &[JobRef])
    -> TicketRepositoryResult<()>;

    /// Deletes every ticket whose identifier is not in `keep`, returning the
    /// number of deleted rows.
    ///
    /// An empty `keep` set deletes every ticket.
    async fn delete_except(&self, keep: &[TicketId]) -> TicketRepositoryResult<u64>;

    /// Finds a ticket by identifier, including its associations.
    async fn find_by_id(&self, id: TicketId) -> TicketRepositoryResult<Option<Ticket>>;

    /// Finds a ticket by canonical URL.
    async fn find_by_url(&self, url: &str) -> TicketRepositoryResult<Option<Ticket>>;
}

/// Errors returned by ticket repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TicketRepositoryError {
    /// The ticket was not found.
    #[error("ticket not found: {0}")]
    NotFound(TicketId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TicketRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Result type for triage repository operations.
pub type TriageRepositoryResult<T> = Result<T, TriageRepositoryError>;

/// Triage linkage contract.
///
/// Triage records are created elsewhere; only their ticket link is mutated
/// here.
#[async_trait]
pub trait TriageRepository: Send + Sync {
    /// Lists every triage with its currently linked ticket.
    async fn list(&self) -> TriageRepositoryResult<Vec<Triage>>;

    /// Points the triage at `ticket`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageRepositoryError::NotFound`] when the triage does not
    /// exist.
    async fn link_ticket(
        &self,
        triage_id: TriageId,
        ticket: &LinkedTicket,
    ) -> TriageRepositoryResult<()>;

    /// Clears the triage's ticket link.
    ///
    /// # Errors
    ///
    /// Returns [`TriageRepositoryError::NotFound`] when the triage does not
    /// exist.
    async fn unlink_ticket(&self, triage_id: TriageId) -> TriageRepositoryResult<()>;
}

/// Errors returned by triage repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TriageRepositoryError {
    /// The triage was not found.
    #[error("triage not found: {0}")]
    NotFound(TriageId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TriageRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
