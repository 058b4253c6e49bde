//! Job run identifiers and scan results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a CI job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobRunId(i64);

impl JobRunId {
    /// Wraps a job run identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Object paths found under a job run prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactListing {
    /// Full object paths, in listing order.
    pub paths: Vec<String>,
    /// `true` when more objects matched than the scan cap allows.
    ///
    /// A truncated listing is valid but incomplete, not a failure.
    pub truncated: bool,
}

/// Scan result for one artifact file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRunArtifact {
    /// Job run the file belongs to.
    pub job_run_id: String,
    /// Public URL of the file.
    pub artifact_url: String,
    /// Matcher output; may be partial when `error` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_content: Option<Value>,
    /// Open, read, or match failure for this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRunArtifact {
    /// Creates a result carrying only the artifact URL.
    #[must_use]
    pub fn listed(job_run_id: JobRunId, artifact_url: impl Into<String>) -> Self {
        Self {
            job_run_id: job_run_id.to_string(),
            artifact_url: artifact_url.into(),
            matched_content: None,
            error: None,
        }
    }

    /// Sets the matcher output.
    #[must_use]
    pub fn with_matches(mut self, matches: Option<Value>) -> Self {
        self.matched_content = matches;
        self
    }

    /// Records a failure for this file.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Scan response for one job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRunArtifacts {
    /// Job run identifier.
    pub id: String,
    /// Name of the job definition.
    pub job_name: String,
    /// Stored job run URL.
    pub url: String,
    /// Whether the listing stopped at the scan cap.
    pub artifact_list_truncated: bool,
    /// One result per listed file, in listing order.
    pub artifacts: Vec<JobRunArtifact>,
}
