//! Precedence merge of the three mapping sets.

use super::mapping::TicketSet;
use std::collections::btree_map::Entry;

/// Merges the per-source sets into the authoritative ticket set.
///
/// The test set is the base. A ticket also in the job set takes the job
/// set's job list wholesale, even when that list is empty; a ticket only in
/// the job set is inserted as is. Triage tickets are inserted only when no
/// other source produced them and never overwrite an existing record.
#[must_use]
pub fn merge_mappings(test_set: TicketSet, job_set: TicketSet, triage_set: TicketSet) -> TicketSet {
    let mut merged = test_set;

    for (id, job_ticket) in job_set {
        match merged.entry(id) {
            Entry::Occupied(mut entry) => entry.get_mut().replace_jobs(job_ticket.into_jobs()),
            Entry::Vacant(entry) => {
                entry.insert(job_ticket);
            }
        }
    }

    for (id, triage_ticket) in triage_set {
        merged.entry(id).or_insert(triage_ticket);
    }

    merged
}
