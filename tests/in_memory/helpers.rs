//! Shared fixtures for the in-memory integration tests.

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};
use flakewatch::bug_mapping::{
    adapters::memory::{InMemoryBugStore, InMemoryWarehouse},
    domain::{JobId, JobRef, TestId, TestRef, TicketRow},
    services::BugMappingReconciler,
};
use flakewatch::matview::adapters::memory::InMemoryViewStore;
use mockable::DefaultClock;
use rstest::fixture;
use std::io;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Reconciler wired to in-memory adapters.
pub type MemoryReconciler =
    BugMappingReconciler<InMemoryWarehouse, InMemoryBugStore, InMemoryBugStore, DefaultClock>;

/// Provides a tokio runtime for async operations in tests.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
#[fixture]
pub fn runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Provides a fresh view store for each test.
#[fixture]
pub fn views() -> InMemoryViewStore {
    InMemoryViewStore::new()
}

/// Warehouse and store with one known test and one known job.
#[derive(Clone)]
pub struct BugBackends {
    /// Scripted warehouse.
    pub warehouse: InMemoryWarehouse,
    /// Ticket, triage, and reference data store.
    pub store: InMemoryBugStore,
}

impl BugBackends {
    /// Builds a reconciler over these backends.
    #[must_use]
    pub fn reconciler(&self) -> MemoryReconciler {
        BugMappingReconciler::new(
            Arc::new(self.warehouse.clone()),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            Arc::new(DefaultClock),
        )
    }
}

/// Provides backends knowing test `unit-test-foo` and job `periodic-job-x`.
#[fixture]
pub fn backends() -> BugBackends {
    let store = InMemoryBugStore::new();
    store.add_test(TestRef::new(TestId::new(1), "unit-test-foo"));
    store.add_job(JobRef::new(JobId::new(10), "periodic-job-x"));
    BugBackends {
        warehouse: InMemoryWarehouse::new(),
        store,
    }
}

/// Builds the warehouse row for `OCPBUGS-<id>` mentioning `link_name`.
#[must_use]
pub fn ticket_row(id: i64, link_name: Option<&str>) -> TicketRow {
    TicketRow {
        key: format!("OCPBUGS-{id}"),
        jira_id: Some(id.to_string()),
        summary: format!("failure in {}", link_name.unwrap_or("ci")),
        status: "New".to_owned(),
        last_changed_time: DateTime::<Utc>::from_timestamp(1_788_000_000, 0),
        link_name: link_name.map(str::to_owned),
        ..TicketRow::default()
    }
}

/// Temporary bucket directory removed on drop.
pub struct TempBucket {
    parent: Dir,
    name: String,
    path: Utf8PathBuf,
}

impl TempBucket {
    /// Creates an empty bucket directory under the system temp dir.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp dir is not valid UTF-8 or cannot be
    /// written.
    pub fn create() -> io::Result<Self> {
        let temp = Utf8PathBuf::try_from(std::env::temp_dir()).map_err(io::Error::other)?;
        let name = format!("flakewatch_bucket_{}", uuid::Uuid::new_v4());
        let parent = Dir::open_ambient_dir(&temp, ambient_authority())?;
        parent.create_dir(&name)?;
        Ok(Self {
            path: temp.join(&name),
            parent,
            name,
        })
    }

    /// Writes `contents` at `object`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be written.
    pub fn put(&self, object: &str, contents: &str) -> io::Result<()> {
        let root = self.parent.open_dir(&self.name)?;
        if let Some((dirs, _)) = object.rsplit_once('/') {
            root.create_dir_all(dirs)?;
        }
        root.write(object, contents)
    }

    /// Returns the bucket's absolute path.
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

impl Drop for TempBucket {
    fn drop(&mut self) {
        drop(self.parent.remove_dir_all(&self.name));
    }
}
