//! Ticket aggregate mirrored from the defect tracker.

use super::{JobId, TestId, TicketId, TicketKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derives canonical ticket URLs from ticket keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketUrlScheme {
    base_url: String,
}

impl TicketUrlScheme {
    /// Creates a scheme rooted at the tracker base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let raw = base_url.into();
        Self {
            base_url: raw.trim_end_matches('/').to_owned(),
        }
    }

    /// Returns `<base_url>/browse/<key>`.
    #[must_use]
    pub fn browse_url(&self, key: &TicketKey) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }
}

impl Default for TicketUrlScheme {
    fn default() -> Self {
        Self::new("https://issues.redhat.com")
    }
}

/// Reference to a locally known test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestRef {
    id: TestId,
    name: String,
}

impl TestRef {
    /// Creates a test reference.
    #[must_use]
    pub fn new(id: TestId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the local test identifier.
    #[must_use]
    pub const fn id(&self) -> TestId {
        self.id
    }

    /// Returns the test name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Reference to a locally known CI job definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobRef {
    id: JobId,
    name: String,
}

impl JobRef {
    /// Creates a job reference.
    #[must_use]
    pub fn new(id: JobId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the local job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the job name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Tracker-owned ticket attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetails {
    /// Workflow status name.
    pub status: String,
    /// One-line summary.
    pub summary: String,
    /// Last modification time reported by the tracker.
    pub last_changed_at: DateTime<Utc>,
    /// Versions the defect affects.
    pub affects_versions: Vec<String>,
    /// Versions containing the fix.
    pub fix_versions: Vec<String>,
    /// Versions the fix is targeted at.
    pub target_versions: Vec<String>,
    /// Tracker components.
    pub components: Vec<String>,
    /// Tracker labels.
    pub labels: Vec<String>,
}

impl TicketDetails {
    /// Creates details with no versions, components, or labels.
    #[must_use]
    pub fn new(
        status: impl Into<String>,
        summary: impl Into<String>,
        last_changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: status.into(),
            summary: summary.into(),
            last_changed_at,
            affects_versions: Vec::new(),
            fix_versions: Vec::new(),
            target_versions: Vec::new(),
            components: Vec::new(),
            labels: Vec::new(),
        }
    }
}

/// A defect tracker ticket together with its test and job associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    key: TicketKey,
    url: String,
    details: TicketDetails,
    tests: Vec<TestRef>,
    jobs: Vec<JobRef>,
}

impl Ticket {
    /// Creates a ticket with no associations, deriving its URL from the key.
    #[must_use]
    pub fn new(
        id: TicketId,
        key: TicketKey,
        details: TicketDetails,
        scheme: &TicketUrlScheme,
    ) -> Self {
        let url = scheme.browse_url(&key);
        Self {
            id,
            key,
            url,
            details,
            tests: Vec::new(),
            jobs: Vec::new(),
        }
    }

    /// Reconstructs a ticket from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: TicketId,
        key: TicketKey,
        url: String,
        details: TicketDetails,
    ) -> Self {
        Self {
            id,
            key,
            url,
            details,
            tests: Vec::new(),
            jobs: Vec::new(),
        }
    }

    /// Sets the associated tests.
    #[must_use]
    pub fn with_tests(mut self, tests: impl IntoIterator<Item = TestRef>) -> Self {
        self.tests = tests.into_iter().collect();
        self
    }

    /// Sets the associated jobs.
    #[must_use]
    pub fn with_jobs(mut self, jobs: impl IntoIterator<Item = JobRef>) -> Self {
        self.jobs = jobs.into_iter().collect();
        self
    }

    /// Appends a test association.
    pub fn push_test(&mut self, test: TestRef) {
        self.tests.push(test);
    }

    /// Appends a job association.
    pub fn push_job(&mut self, job: JobRef) {
        self.jobs.push(job);
    }

    /// Replaces the job associations wholesale, including with an empty list.
    pub fn replace_jobs(&mut self, jobs: Vec<JobRef>) {
        self.jobs = jobs;
    }

    /// Consumes the ticket, returning its job associations.
    #[must_use]
    pub fn into_jobs(self) -> Vec<JobRef> {
        self.jobs
    }

    /// Returns the tracker identifier.
    #[must_use]
    pub const fn id(&self) -> TicketId {
        self.id
    }

    /// Returns the ticket key.
    #[must_use]
    pub const fn key(&self) -> &TicketKey {
        &self.key
    }

    /// Returns the canonical ticket URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns tracker-owned attributes.
    #[must_use]
    pub const fn details(&self) -> &TicketDetails {
        &self.details
    }

    /// Returns associated tests.
    #[must_use]
    pub fn tests(&self) -> &[TestRef] {
        &self.tests
    }

    /// Returns associated jobs.
    #[must_use]
    pub fn jobs(&self) -> &[JobRef] {
        &self.jobs
    }
}
