//! Folding warehouse rows into per-source ticket sets.

use super::report::ReconcileIssue;
use crate::bug_mapping::{
    domain::{
        BugMappingDomainError, JobCache, TestCache, Ticket, TicketDetails, TicketId, TicketKey,
        TicketRow, TicketUrlScheme,
    },
    ports::MappingSource,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::debug;

/// Tickets keyed by tracker identifier.
pub type TicketSet = BTreeMap<TicketId, Ticket>;

/// Builds one mapping set from the rows of a single warehouse query.
///
/// The first row for a ticket creates its record; later rows for the same
/// ticket only contribute their matched test or job.
#[derive(Debug)]
pub struct MappingAccumulator<'a> {
    mapping: MappingSource,
    scheme: &'a TicketUrlScheme,
    fallback_time: DateTime<Utc>,
    tickets: TicketSet,
    issues: Vec<ReconcileIssue>,
}

impl<'a> MappingAccumulator<'a> {
    /// Creates an empty accumulator.
    ///
    /// `fallback_time` stands in for rows without a last-changed timestamp.
    #[must_use]
    pub const fn new(
        mapping: MappingSource,
        scheme: &'a TicketUrlScheme,
        fallback_time: DateTime<Utc>,
    ) -> Self {
        Self {
            mapping,
            scheme,
            fallback_time,
            tickets: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    /// Adds a test-mention row, attaching the test when it is known locally.
    pub fn add_test_row(&mut self, row: TicketRow, tests: &TestCache) {
        let Some(name) = row.link_name() else {
            return;
        };
        let Some(test) = tests.get(name).cloned() else {
            debug!(test = name, key = %row.key, "skipping ticket for unknown test");
            return;
        };
        if let Some(ticket) = self.ticket_for(row)
            && !ticket.tests().contains(&test)
        {
            ticket.push_test(test);
        }
    }

    /// Adds a job-mention row, attaching the job when it is known locally.
    pub fn add_job_row(&mut self, row: TicketRow, jobs: &JobCache) {
        let Some(name) = row.link_name() else {
            return;
        };
        let Some(job) = jobs.get(name).cloned() else {
            debug!(job = name, key = %row.key, "skipping ticket for unknown job");
            return;
        };
        if let Some(ticket) = self.ticket_for(row)
            && !ticket.jobs().contains(&job)
        {
            ticket.push_job(job);
        }
    }

    /// Adds a triage-key row; only the ticket's existence is recorded.
    pub fn add_triage_row(&mut self, row: TicketRow) {
        let _ = self.ticket_for(row);
    }

    /// Returns the number of distinct tickets collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Returns `true` when no ticket has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Consumes the accumulator, returning the ticket set and row issues.
    #[must_use]
    pub fn finish(self) -> (TicketSet, Vec<ReconcileIssue>) {
        (self.tickets, self.issues)
    }

    fn ticket_for(&mut self, row: TicketRow) -> Option<&mut Ticket> {
        let Some(raw_id) = row.raw_id() else {
            self.issues.push(ReconcileIssue::MissingTicketId {
                mapping: self.mapping,
                key: row.key,
            });
            return None;
        };
        let id = match TicketId::parse(raw_id) {
            Ok(id) => id,
            Err(reason) => {
                self.issues.push(ReconcileIssue::InvalidTicketRow {
                    mapping: self.mapping,
                    key: row.key,
                    reason,
                });
                return None;
            }
        };

        match self.tickets.entry(id) {
            Entry::Occupied(entry) => Some(entry.into_mut()),
            Entry::Vacant(entry) => match build_ticket(id, row, self.scheme, self.fallback_time) {
                Ok(ticket) => Some(entry.insert(ticket)),
                Err(issue) => {
                    self.issues.push(issue.with_mapping(self.mapping));
                    None
                }
            },
        }
    }
}

struct KeyIssue {
    key: String,
    reason: BugMappingDomainError,
}

impl KeyIssue {
    fn with_mapping(self, mapping: MappingSource) -> ReconcileIssue {
        ReconcileIssue::InvalidTicketRow {
            mapping,
            key: self.key,
            reason: self.reason,
        }
    }
}

fn build_ticket(
    id: TicketId,
    row: TicketRow,
    scheme: &TicketUrlScheme,
    fallback_time: DateTime<Utc>,
) -> Result<Ticket, KeyIssue> {
    let TicketRow {
        key,
        summary,
        status,
        last_changed_time,
        affects_versions,
        fix_versions,
        target_versions,
        components,
        labels,
        ..
    } = row;
    let ticket_key = match TicketKey::new(key.as_str()) {
        Ok(ticket_key) => ticket_key,
        Err(reason) => return Err(KeyIssue { key, reason }),
    };
    let details = TicketDetails {
        status,
        summary,
        last_changed_at: last_changed_time.unwrap_or(fallback_time),
        affects_versions,
        fix_versions,
        target_versions,
        components,
        labels,
    };
    Ok(Ticket::new(id, ticket_key, details, scheme))
}
