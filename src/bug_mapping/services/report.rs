//! Outcome of a reconciliation run.

use crate::bug_mapping::{
    domain::{BugMappingDomainError, TicketId, TriageId},
    ports::{MappingSource, TicketRepositoryError, TriageRepositoryError},
};
use std::fmt;
use thiserror::Error;

/// Which write failed while persisting a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStage {
    /// The ticket row upsert.
    Upsert,
    /// Replacing the test associations.
    Tests,
    /// Replacing the job associations.
    Jobs,
}

impl fmt::Display for PersistStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upsert => "upsert",
            Self::Tests => "tests",
            Self::Jobs => "jobs",
        })
    }
}

/// A recoverable problem recorded during a run.
///
/// Issues never stop the run; they are reported alongside the work that
/// succeeded.
#[derive(Debug, Clone, Error)]
pub enum ReconcileIssue {
    /// A warehouse row carried no tracker identifier.
    #[error("{mapping} row for ticket `{key}` has no tracker id")]
    MissingTicketId {
        /// Query that produced the row.
        mapping: MappingSource,
        /// Ticket key on the row.
        key: String,
    },
    /// A warehouse row carried an unusable identifier or key.
    #[error("{mapping} row for ticket `{key}` is invalid: {reason}")]
    InvalidTicketRow {
        /// Query that produced the row.
        mapping: MappingSource,
        /// Ticket key on the row.
        key: String,
        /// Validation failure.
        reason: BugMappingDomainError,
    },
    /// Writing a ticket failed; later stages for that ticket were skipped.
    #[error("failed to persist {stage} for ticket {ticket_id}: {error}")]
    Persist {
        /// Ticket being written.
        ticket_id: TicketId,
        /// Write that failed.
        stage: PersistStage,
        /// Repository failure.
        error: TicketRepositoryError,
    },
    /// Removing tickets absent from the authoritative set failed.
    #[error("failed to delete stale tickets: {0}")]
    DeleteStale(TicketRepositoryError),
    /// No stored ticket has the triage's URL.
    #[error("no ticket found for triage {triage_id} with url `{url}`")]
    TriageTicketNotFound {
        /// Triage being repaired.
        triage_id: TriageId,
        /// Curated URL that resolved to nothing.
        url: String,
    },
    /// Looking up the ticket for a triage failed.
    #[error("failed to look up ticket for triage {triage_id}: {error}")]
    TriageLookup {
        /// Triage being repaired.
        triage_id: TriageId,
        /// Repository failure.
        error: TicketRepositoryError,
    },
    /// Writing the triage link failed.
    #[error("failed to relink triage {triage_id}: {error}")]
    TriageRelink {
        /// Triage being repaired.
        triage_id: TriageId,
        /// Repository failure.
        error: TriageRepositoryError,
    },
}

/// Row and ticket counts gathered during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileCounts {
    /// Tickets found through test mentions.
    pub test_mapped: usize,
    /// Tickets found through job mentions.
    pub job_mapped: usize,
    /// Tickets found through triage keys.
    pub triage_mapped: usize,
    /// Tickets in the merged authoritative set.
    pub merged: usize,
    /// Tickets whose row and associations were written.
    pub persisted: usize,
    /// Tickets removed because no source mentioned them.
    pub deleted: u64,
    /// Triages pointed at a ticket.
    pub relinked: usize,
    /// Triages whose stale link was cleared.
    pub unlinked: usize,
}

/// Counts plus the recoverable issues of one run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Run counts.
    pub counts: ReconcileCounts,
    /// Recoverable issues, in the order they occurred.
    pub issues: Vec<ReconcileIssue>,
}

impl ReconcileReport {
    /// Returns `true` when the run recorded no issues.
    ///
    /// A report with issues means stored data may be partially stale.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}
