//! Reconciler orchestration tests.

use std::sync::Arc;
use std::time::Duration;

use super::support::{Harness, browse_url, job_ref, stored_ticket, test_ref, ticket_id, triage};
use crate::bug_mapping::{
    adapters::memory::{InMemoryBugStore, InMemoryWarehouse},
    domain::{JobRef, TestRef, Ticket, TicketId, Triage, TriageId},
    ports::{
        MappingSource, TicketRepository, TicketRepositoryError, TicketRepositoryResult,
        TicketRowStream, TicketWarehouse, WarehouseError, WarehouseQuery, WarehouseResult,
    },
    services::{
        BugMappingReconciler, PersistStage, ReconcileError, ReconcileIssue, ReconcilerSettings,
    },
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::{fixture, rstest};

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

fn warehouse_down() -> WarehouseError {
    WarehouseError::query(std::io::Error::other("connection refused"))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn twelve_three_four_five_keeps_tests_and_loses_prior_jobs(harness: Harness) {
    harness.store.seed_ticket(
        &stored_ticket(12345).with_jobs([job_ref(10, "periodic-job-x")]),
    );
    harness.push(MappingSource::TestMentions, 12345, Some("unit-test-foo"));
    let reconciler = harness.reconciler();

    let inputs = reconciler
        .load_inputs(&harness.store)
        .await
        .expect("inputs load");
    let report = reconciler.reconcile(inputs).await.expect("run succeeds");

    assert!(report.is_clean());
    assert_eq!(report.counts.persisted, 1);
    let tickets = harness.store.tickets();
    let [ticket] = tickets.as_slice() else {
        panic!("expected one ticket, got {tickets:?}");
    };
    assert_eq!(ticket.id(), ticket_id(12345));
    assert_eq!(ticket.tests(), [test_ref(1, "unit-test-foo")].as_slice());
    assert!(ticket.jobs().is_empty());
    assert_eq!(ticket.details().status, "New");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rerunning_with_unchanged_sources_changes_nothing(harness: Harness) {
    harness.push(MappingSource::TestMentions, 1, Some("unit-test-foo"));
    harness.push(MappingSource::TestMentions, 1, Some("[sig-network] pods reach services"));
    harness.push(MappingSource::JobMentions, 1, Some("periodic-e2e-aws"));
    harness.push(MappingSource::JobMentions, 2, Some("periodic-job-x"));
    harness.push(MappingSource::TriageKeys, 3, None);
    harness.store.add_triage(triage(1, "OCPBUGS-3", None));
    let reconciler = harness.reconciler();

    let first_inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    let first = reconciler.reconcile(first_inputs).await.expect("first run");
    let after_first = harness.store.tickets();
    let triage_after_first = harness.store.triage(TriageId::new(1));

    let second_inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    let second = reconciler.reconcile(second_inputs).await.expect("second run");

    assert_eq!(first.counts.merged, 3);
    assert_eq!(first.counts.relinked, 1);
    assert_eq!(harness.store.tickets(), after_first);
    assert_eq!(harness.store.triage(TriageId::new(1)), triage_after_first);
    assert_eq!(second.counts.deleted, 0);
    assert_eq!(second.counts.relinked, 0);
    assert!(second.is_clean());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tickets_absent_from_every_source_are_deleted(harness: Harness) {
    harness.store.seed_ticket(&stored_ticket(900));
    harness.store.seed_ticket(&stored_ticket(901));
    harness.push(MappingSource::TestMentions, 901, Some("unit-test-foo"));
    let reconciler = harness.reconciler();

    let inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    let report = reconciler.reconcile(inputs).await.expect("run succeeds");

    assert_eq!(report.counts.deleted, 1);
    let ids: Vec<TicketId> = harness.store.tickets().iter().map(Ticket::id).collect();
    assert_eq!(ids, vec![ticket_id(901)]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_triage_links_are_repaired_or_cleared(harness: Harness) {
    harness.store.seed_ticket(&stored_ticket(100));
    harness.store.seed_ticket(&stored_ticket(400));
    // Curated URL names OCPBUGS-200 but the link still points at 100.
    harness.store.add_triage(triage(1, "OCPBUGS-200", Some(100)));
    // OCPBUGS-300 no longer exists in the warehouse.
    harness.store.add_triage(triage(2, "OCPBUGS-300", Some(100)));
    harness.store.add_triage(triage(3, "OCPBUGS-400", Some(400)));
    harness.push(MappingSource::TriageKeys, 200, None);
    harness.push(MappingSource::TestMentions, 400, Some("unit-test-foo"));
    let reconciler = harness.reconciler();

    let inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    let report = reconciler.reconcile(inputs).await.expect("run succeeds");

    let repaired = harness.store.triage(TriageId::new(1)).expect("triage 1");
    assert!(repaired.is_link_current());
    assert_eq!(repaired.linked().map(|link| link.id), Some(ticket_id(200)));

    let cleared = harness.store.triage(TriageId::new(2)).expect("triage 2");
    assert_eq!(cleared.linked(), None);

    let untouched = harness.store.triage(TriageId::new(3)).expect("triage 3");
    assert!(untouched.is_link_current());

    assert_eq!(report.counts.relinked, 1);
    assert_eq!(report.counts.unlinked, 1);
    assert_eq!(report.counts.deleted, 1);
    assert!(matches!(
        report.issues.as_slice(),
        [ReconcileIssue::TriageTicketNotFound { triage_id, url }]
            if *triage_id == TriageId::new(2) && *url == browse_url("OCPBUGS-300")
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn triage_query_is_skipped_without_triages(harness: Harness) {
    harness.push(MappingSource::TestMentions, 1, Some("unit-test-foo"));
    let reconciler = harness.reconciler();

    let inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    reconciler.reconcile(inputs).await.expect("run succeeds");

    let sources: Vec<MappingSource> = harness
        .warehouse
        .executed_queries()
        .iter()
        .map(WarehouseQuery::source)
        .collect();
    assert_eq!(
        sources,
        vec![MappingSource::TestMentions, MappingSource::JobMentions]
    );
}

#[rstest]
#[case::query_fails(MappingSource::JobMentions, false)]
#[case::iteration_fails(MappingSource::TestMentions, true)]
#[tokio::test(flavor = "multi_thread")]
async fn warehouse_failures_abort_before_any_write(
    harness: Harness,
    #[case] failing: MappingSource,
    #[case] mid_stream: bool,
) {
    harness.store.seed_ticket(&stored_ticket(7));
    harness.push(MappingSource::TestMentions, 1, Some("unit-test-foo"));
    if mid_stream {
        harness
            .warehouse
            .push_error(failing, WarehouseError::read(std::io::Error::other("reset")));
    } else {
        harness.warehouse.fail_query(failing, warehouse_down());
    }
    let reconciler = harness.reconciler();

    let inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    let result = reconciler.reconcile(inputs).await;

    assert!(matches!(result, Err(ReconcileError::Warehouse { mapping, .. }) if mapping == failing));
    let ids: Vec<TicketId> = harness.store.tickets().iter().map(Ticket::id).collect();
    assert_eq!(ids, vec![ticket_id(7)]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_triage_url_aborts_the_run(harness: Harness) {
    harness.store.seed_ticket(&stored_ticket(7));
    harness.push(MappingSource::TestMentions, 1, Some("unit-test-foo"));
    harness.store.add_triage(Triage::new(
        TriageId::new(5),
        "hand-entered link",
        "https://issues.redhat.com/projects/OCPBUGS",
    ));
    let reconciler = harness.reconciler();

    let inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    let result = reconciler.reconcile(inputs).await;

    assert!(matches!(
        result,
        Err(ReconcileError::MalformedTriageUrl { triage_id, .. }) if triage_id == TriageId::new(5)
    ));
    assert!(harness.warehouse.executed_queries().is_empty());
    assert_eq!(harness.store.tickets().len(), 1);
}

/// Delegates to the in-memory store but rejects writes for chosen tickets.
#[derive(Clone)]
struct FlakyTickets {
    inner: InMemoryBugStore,
    fail_upsert: TicketId,
    fail_jobs: TicketId,
}

fn write_rejected() -> TicketRepositoryError {
    TicketRepositoryError::persistence(std::io::Error::other("write rejected"))
}

#[async_trait]
impl TicketRepository for FlakyTickets {
    async fn upsert(&self, ticket: &Ticket) -> TicketRepositoryResult<()> {
        if ticket.id() == self.fail_upsert {
            return Err(write_rejected());
        }
        self.inner.upsert(ticket).await
    }

    async fn replace_tests(
        &self,
        ticket_id: TicketId,
        tests: &[TestRef],
    ) -> TicketRepositoryResult<()> {
        self.inner.replace_tests(ticket_id, tests).await
    }

    async fn replace_jobs(
        &self,
        ticket_id: TicketId,
        jobs: &[JobRef],
    ) -> TicketRepositoryResult<()> {
        if ticket_id == self.fail_jobs {
            return Err(write_rejected());
        }
        self.inner.replace_jobs(ticket_id, jobs).await
    }

    async fn delete_except(&self, keep: &[TicketId]) -> TicketRepositoryResult<u64> {
        self.inner.delete_except(keep).await
    }

    async fn find_by_id(&self, id: TicketId) -> TicketRepositoryResult<Option<Ticket>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_url(&self, url: &str) -> TicketRepositoryResult<Option<Ticket>> {
        self.inner.find_by_url(url).await
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn persistence_failures_are_isolated_per_ticket(harness: Harness) {
    for id in [1, 2, 3] {
        harness.push(MappingSource::TestMentions, id, Some("unit-test-foo"));
    }
    harness.push(MappingSource::JobMentions, 3, Some("periodic-job-x"));
    let tickets = FlakyTickets {
        inner: harness.store.clone(),
        fail_upsert: ticket_id(1),
        fail_jobs: ticket_id(3),
    };
    let reconciler = BugMappingReconciler::new(
        Arc::new(harness.warehouse.clone()),
        Arc::new(tickets),
        Arc::new(harness.store.clone()),
        Arc::new(DefaultClock),
    );

    let inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    let report = reconciler.reconcile(inputs).await.expect("run succeeds");

    assert_eq!(report.counts.merged, 3);
    assert_eq!(report.counts.persisted, 1);
    let stages: Vec<(TicketId, PersistStage)> = report
        .issues
        .iter()
        .filter_map(|issue| match issue {
            ReconcileIssue::Persist {
                ticket_id, stage, ..
            } => Some((*ticket_id, *stage)),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            (ticket_id(1), PersistStage::Upsert),
            (ticket_id(3), PersistStage::Jobs),
        ]
    );
    let ids: Vec<TicketId> = harness.store.tickets().iter().map(Ticket::id).collect();
    assert_eq!(ids, vec![ticket_id(2), ticket_id(3)]);
}

/// Warehouse that takes `delay` before answering any query.
struct SlowWarehouse {
    inner: InMemoryWarehouse,
    delay: Duration,
}

#[async_trait]
impl TicketWarehouse for SlowWarehouse {
    async fn query(&self, query: &WarehouseQuery) -> WarehouseResult<TicketRowStream> {
        tokio::time::sleep(self.delay).await;
        self.inner.query(query).await
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn fetch_phase_deadline_aborts_the_run(harness: Harness) {
    harness.store.seed_ticket(&stored_ticket(7));
    harness.push(MappingSource::TestMentions, 1, Some("unit-test-foo"));
    let warehouse = SlowWarehouse {
        inner: harness.warehouse.clone(),
        delay: Duration::from_secs(40),
    };
    let settings = ReconcilerSettings {
        deadline: Duration::from_secs(60),
        ..ReconcilerSettings::default()
    };
    let reconciler = BugMappingReconciler::new(
        Arc::new(warehouse),
        Arc::new(harness.store.clone()),
        Arc::new(harness.store.clone()),
        Arc::new(DefaultClock),
    )
    .with_settings(settings);

    let inputs = reconciler.load_inputs(&harness.store).await.expect("inputs load");
    let result = reconciler.reconcile(inputs).await;

    assert!(matches!(
        result,
        Err(ReconcileError::DeadlineExceeded(limit)) if limit == Duration::from_secs(60)
    ));
    assert_eq!(harness.store.tickets().len(), 1);
}
