//! Shared builders for reconciliation tests.

use std::sync::Arc;

use crate::bug_mapping::{
    adapters::memory::{InMemoryBugStore, InMemoryWarehouse},
    domain::{
        JobId, JobRef, LinkedTicket, TestId, TestRef, Ticket, TicketDetails, TicketId, TicketKey,
        TicketRow, TicketUrlScheme, Triage, TriageId,
    },
    ports::MappingSource,
    services::BugMappingReconciler,
};
use chrono::{DateTime, Utc};
use mockable::DefaultClock;

pub(super) const TRACKER: &str = "https://issues.redhat.com";

pub(super) type MemoryReconciler =
    BugMappingReconciler<InMemoryWarehouse, InMemoryBugStore, InMemoryBugStore, DefaultClock>;

pub(super) fn changed_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-09-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub(super) fn browse_url(key: &str) -> String {
    format!("{TRACKER}/browse/{key}")
}

/// Row for `OCPBUGS-<id>` naming `link` as the matched test or job.
pub(super) fn row(id: i64, link: Option<&str>) -> TicketRow {
    TicketRow {
        key: format!("OCPBUGS-{id}"),
        jira_id: Some(id.to_string()),
        summary: format!("{} fails intermittently", link.unwrap_or("cluster")),
        status: "New".to_owned(),
        last_changed_time: Some(changed_at()),
        components: vec!["Networking".to_owned()],
        link_name: link.map(str::to_owned),
        ..TicketRow::default()
    }
}

pub(super) fn test_ref(id: i64, name: &str) -> TestRef {
    TestRef::new(TestId::new(id), name)
}

pub(super) fn job_ref(id: i64, name: &str) -> JobRef {
    JobRef::new(JobId::new(id), name)
}

pub(super) fn ticket_id(value: i64) -> TicketId {
    TicketId::new(value).expect("non-negative ticket id")
}

/// A stored ticket for `OCPBUGS-<id>` with no associations.
pub(super) fn stored_ticket(id: i64) -> Ticket {
    Ticket::new(
        ticket_id(id),
        TicketKey::new(format!("OCPBUGS-{id}")).expect("valid key"),
        TicketDetails::new("Closed", "old summary", changed_at()),
        &TicketUrlScheme::new(TRACKER),
    )
}

pub(super) fn triage(id: i64, key: &str, linked_to: Option<i64>) -> Triage {
    let base = Triage::new(TriageId::new(id), format!("regression {id}"), browse_url(key));
    match linked_to {
        Some(ticket) => base.with_link(LinkedTicket {
            id: ticket_id(ticket),
            url: browse_url(&format!("OCPBUGS-{ticket}")),
        }),
        None => base,
    }
}

/// In-memory warehouse and store wired into a reconciler.
pub(super) struct Harness {
    pub(super) warehouse: InMemoryWarehouse,
    pub(super) store: InMemoryBugStore,
}

impl Harness {
    pub(super) fn new() -> Self {
        let store = InMemoryBugStore::new();
        store.add_test(test_ref(1, "unit-test-foo"));
        store.add_test(test_ref(2, "[sig-network] pods reach services"));
        store.add_job(job_ref(10, "periodic-job-x"));
        store.add_job(job_ref(11, "periodic-e2e-aws"));
        Self {
            warehouse: InMemoryWarehouse::new(),
            store,
        }
    }

    pub(super) fn reconciler(&self) -> MemoryReconciler {
        BugMappingReconciler::new(
            Arc::new(self.warehouse.clone()),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            Arc::new(DefaultClock),
        )
    }

    pub(super) fn push(&self, source: MappingSource, id: i64, link: Option<&str>) {
        self.warehouse.push_row(source, row(id, link));
    }
}
