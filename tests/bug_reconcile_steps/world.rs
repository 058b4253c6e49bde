//! Shared world state for ticket reconciliation BDD scenarios.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flakewatch::bug_mapping::{
    adapters::memory::{InMemoryBugStore, InMemoryWarehouse},
    domain::{JobId, JobRef, TestId, TestRef, Ticket, TicketRow},
    services::{BugMappingReconciler, ReconcileError, ReconcileReport},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Reconciler type used by the BDD world.
pub type TestReconciler =
    BugMappingReconciler<InMemoryWarehouse, InMemoryBugStore, InMemoryBugStore, DefaultClock>;

/// Tracker base URL used for ticket and triage URLs.
pub const TRACKER: &str = "https://issues.redhat.com";

/// Scenario world for reconciliation behaviour tests.
pub struct ReconcileWorld {
    /// Scripted warehouse.
    pub warehouse: InMemoryWarehouse,
    /// Store holding tickets, triages, and reference data.
    pub store: InMemoryBugStore,
    /// Reconciler wired to the warehouse and store.
    pub reconciler: TestReconciler,
    /// Registered tests, by insertion order.
    pub tests: Vec<TestRef>,
    /// Registered jobs, by insertion order.
    pub jobs: Vec<JobRef>,
    /// Store content captured before the most recent run.
    pub previous_tickets: Option<Vec<Ticket>>,
    /// Outcome of the most recent run.
    pub last_result: Option<Result<ReconcileReport, ReconcileError>>,
}

impl ReconcileWorld {
    /// Creates a world with an empty warehouse and store.
    #[must_use]
    pub fn new() -> Self {
        let warehouse = InMemoryWarehouse::new();
        let store = InMemoryBugStore::new();
        let reconciler = BugMappingReconciler::new(
            Arc::new(warehouse.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(DefaultClock),
        );
        Self {
            warehouse,
            store,
            reconciler,
            tests: Vec::new(),
            jobs: Vec::new(),
            previous_tickets: None,
            last_result: None,
        }
    }

    /// Registers a known test.
    pub fn add_test(&mut self, name: &str) {
        let test = TestRef::new(TestId::new(next_id(self.tests.len())), name);
        self.store.add_test(test.clone());
        self.tests.push(test);
    }

    /// Registers a known job.
    pub fn add_job(&mut self, name: &str) {
        let job = JobRef::new(JobId::new(next_id(self.jobs.len())), name);
        self.store.add_job(job.clone());
        self.jobs.push(job);
    }

    /// Returns the registered job called `name`.
    #[must_use]
    pub fn job(&self, name: &str) -> Option<JobRef> {
        self.jobs.iter().find(|job| job.name() == name).cloned()
    }
}

impl Default for ReconcileWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn next_id(registered: usize) -> i64 {
    i64::try_from(registered).unwrap_or(i64::MAX - 1) + 1
}

/// Returns the canonical URL of `OCPBUGS-<id>`.
#[must_use]
pub fn ticket_url(id: i64) -> String {
    format!("{TRACKER}/browse/OCPBUGS-{id}")
}

/// Builds the warehouse row for `OCPBUGS-<id>`.
#[must_use]
pub fn ticket_row(id: i64, link_name: Option<&str>) -> TicketRow {
    TicketRow {
        key: format!("OCPBUGS-{id}"),
        jira_id: Some(id.to_string()),
        summary: "intermittent failure".to_owned(),
        status: "New".to_owned(),
        last_changed_time: Some(changed_at()),
        link_name: link_name.map(str::to_owned),
        ..TicketRow::default()
    }
}

/// Fixed last-changed time for warehouse rows.
#[must_use]
pub fn changed_at() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_788_000_000, 0).unwrap_or_default()
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ReconcileWorld {
    ReconcileWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
