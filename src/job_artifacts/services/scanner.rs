//! Bounded, best-effort scanning of job run artifacts.

use super::deadline::DeadlineReader;
use crate::config::ArtifactsConfig;
use crate::job_artifacts::{
    domain::{
        ArtifactListing, ArtifactLocation, JobArtifactsDomainError, JobRunArtifact,
        JobRunArtifacts, JobRunId,
    },
    ports::{
        BlobReader, BlobStore, BlobStoreError, ContentMatcher, JobRunRepository,
        JobRunRepositoryError, ObjectQuery,
    },
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors that fail a whole job run scan.
///
/// Per-file failures are recorded on [`JobRunArtifact::error`] instead.
#[derive(Debug, Clone, Error)]
pub enum ArtifactScanError {
    /// No job run has the identifier.
    #[error("job run {0} not found")]
    JobRunNotFound(JobRunId),
    /// Looking up the job run failed.
    #[error("failed to look up job run {id}: {error}")]
    JobRunLookup {
        /// Job run requested.
        id: JobRunId,
        /// Repository failure.
        error: JobRunRepositoryError,
    },
    /// The job run has no stored URL.
    #[error("job run {0} has no URL")]
    MissingUrl(JobRunId),
    /// The stored URL is not an artifact bucket URL.
    #[error("job run {id}: {reason}")]
    NotBucketUrl {
        /// Job run requested.
        id: JobRunId,
        /// Resolution failure.
        reason: JobArtifactsDomainError,
    },
    /// The path glob does not compile.
    #[error("invalid path glob {glob:?}: {reason}")]
    InvalidGlob {
        /// Glob as supplied.
        glob: String,
        /// Compilation failure.
        reason: String,
    },
    /// Listing objects failed.
    #[error("failed to list artifacts: {0}")]
    Listing(BlobStoreError),
    /// Listing objects took longer than allowed.
    #[error("artifact listing timed out after {0:?}")]
    ListTimeout(Duration),
    /// The request was cancelled.
    #[error("artifact scan cancelled")]
    Cancelled,
}

/// Limits and bucket layout for scans.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Bucket layout.
    pub location: ArtifactLocation,
    /// Maximum files listed per job run.
    pub max_files: usize,
    /// Limit on listing one job run's files.
    pub list_timeout: Duration,
    /// Limit on opening and matching one file.
    pub file_timeout: Duration,
    /// Files scanned at once.
    pub concurrency: usize,
}

impl ScanSettings {
    /// Builds settings from artifact configuration.
    #[must_use]
    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self {
            location: ArtifactLocation::from_config(config),
            max_files: config.max_files,
            list_timeout: config.list_timeout(),
            file_timeout: config.file_timeout(),
            concurrency: config.scan_concurrency,
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from_config(&ArtifactsConfig::default())
    }
}

/// What to list and how to match it.
#[derive(Clone, Default)]
pub struct ArtifactQuery {
    /// Glob over paths relative to the job run prefix; `None` lists all.
    pub path_glob: Option<String>,
    /// Matcher applied to each file; `None` only lists.
    pub matcher: Option<Arc<dyn ContentMatcher>>,
}

impl ArtifactQuery {
    /// Lists every file without scanning content.
    #[must_use]
    pub fn list_only() -> Self {
        Self::default()
    }

    /// Restricts the listing to `glob`.
    #[must_use]
    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.path_glob = Some(glob.into());
        self
    }

    /// Scans each listed file with `matcher`.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Arc<dyn ContentMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }
}

/// Maps job runs to their artifact files and scans their content.
#[derive(Clone)]
pub struct JobArtifactScanner<J, B>
where
    J: JobRunRepository,
    B: BlobStore,
{
    job_runs: Arc<J>,
    blobs: Arc<B>,
    settings: ScanSettings,
}

impl<J, B> JobArtifactScanner<J, B>
where
    J: JobRunRepository,
    B: BlobStore,
{
    /// Creates a scanner.
    #[must_use]
    pub const fn new(job_runs: Arc<J>, blobs: Arc<B>, settings: ScanSettings) -> Self {
        Self {
            job_runs,
            blobs,
            settings,
        }
    }

    /// Scans several job runs, one result per requested run, in order.
    pub async fn scan_job_runs(
        &self,
        ids: &[JobRunId],
        query: &ArtifactQuery,
        cancel: &CancellationToken,
    ) -> Vec<Result<JobRunArtifacts, ArtifactScanError>> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            results.push(self.scan_job_run(*id, query, cancel).await);
        }
        results
    }

    /// Lists and scans the artifacts of one job run.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactScanError`] when the job run cannot be resolved to
    /// a bucket prefix, the glob is invalid, listing fails or times out, or
    /// `cancel` fires.
    pub async fn scan_job_run(
        &self,
        id: JobRunId,
        query: &ArtifactQuery,
        cancel: &CancellationToken,
    ) -> Result<JobRunArtifacts, ArtifactScanError> {
        info!(job_run_id = %id, "scanning job run artifacts");
        let (record_name, url, prefix) = self.resolve_prefix(id).await.inspect_err(|err| {
            error!(job_run_id = %id, error = %err, "could not resolve job run bucket path");
        })?;

        let listing = self
            .list_artifacts(&prefix, query.path_glob.as_deref(), cancel)
            .await
            .inspect_err(|err| {
                error!(job_run_id = %id, error = %err, "could not list job artifact files");
            })?;
        if listing.truncated {
            warn!(job_run_id = %id, max_files = self.settings.max_files, "artifact listing truncated");
        }

        let matcher = query.matcher.as_deref();
        let artifacts: Vec<JobRunArtifact> = stream::iter(listing.paths.iter())
            .map(|path| self.scan_file(id, path, matcher, cancel))
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;
        if cancel.is_cancelled() {
            return Err(ArtifactScanError::Cancelled);
        }

        Ok(JobRunArtifacts {
            id: id.to_string(),
            job_name: record_name,
            url,
            artifact_list_truncated: listing.truncated,
            artifacts,
        })
    }

    /// Lists objects under `prefix` matching `glob`, up to the file cap.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactScanError::InvalidGlob`],
    /// [`ArtifactScanError::Listing`], [`ArtifactScanError::ListTimeout`], or
    /// [`ArtifactScanError::Cancelled`].
    pub async fn list_artifacts(
        &self,
        prefix: &str,
        glob: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ArtifactListing, ArtifactScanError> {
        let object_query = build_query(prefix, glob)?;
        let limit = self.settings.list_timeout;
        tokio::select! {
            () = cancel.cancelled() => Err(ArtifactScanError::Cancelled),
            listed = tokio::time::timeout(limit, self.collect_listing(&object_query)) => {
                listed.map_err(|_| ArtifactScanError::ListTimeout(limit))?
            }
        }
    }

    async fn collect_listing(
        &self,
        object_query: &ObjectQuery,
    ) -> Result<ArtifactListing, ArtifactScanError> {
        let mut names = self
            .blobs
            .list(object_query)
            .await
            .map_err(ArtifactScanError::Listing)?;
        let mut listing = ArtifactListing::default();
        while let Some(next) = names.next().await {
            let name = next.map_err(ArtifactScanError::Listing)?;
            if listing.paths.len() >= self.settings.max_files {
                listing.truncated = true;
                break;
            }
            listing.paths.push(name);
        }
        debug!(
            prefix = object_query.prefix(),
            files = listing.paths.len(),
            truncated = listing.truncated,
            "listed artifacts"
        );
        Ok(listing)
    }

    async fn resolve_prefix(
        &self,
        id: JobRunId,
    ) -> Result<(String, String, String), ArtifactScanError> {
        let record = self
            .job_runs
            .find_job_run(id)
            .await
            .map_err(|error| ArtifactScanError::JobRunLookup { id, error })?
            .ok_or(ArtifactScanError::JobRunNotFound(id))?;
        let url = record.url.ok_or(ArtifactScanError::MissingUrl(id))?;
        let prefix = self
            .settings
            .location
            .job_run_prefix(&url)
            .map_err(|reason| ArtifactScanError::NotBucketUrl { id, reason })?;
        Ok((record.job_name, url, prefix))
    }

    async fn scan_file(
        &self,
        id: JobRunId,
        path: &str,
        matcher: Option<&dyn ContentMatcher>,
        cancel: &CancellationToken,
    ) -> JobRunArtifact {
        let artifact = JobRunArtifact::listed(id, self.settings.location.artifact_url(path));
        let Some(content_matcher) = matcher else {
            return artifact;
        };

        let limit = self.settings.file_timeout;
        let deadline = Instant::now() + limit;
        let work = async {
            let opened = self.blobs.open(path).await?;
            let mut reader: BlobReader =
                Box::new(DeadlineReader::new(opened, deadline, limit, cancel));
            Ok::<_, BlobStoreError>(content_matcher.get_matches(&mut reader).await)
        };
        // Expiry surfaces as a read error; the outer limits only catch
        // matchers that stop reading.
        let scanned = tokio::select! {
            biased;
            timed = tokio::time::timeout_at(deadline, work) => timed,
            () = cancel.cancelled() => return artifact.with_error("scan cancelled"),
        };

        match scanned {
            Err(_) => {
                warn!(job_run_id = %id, path, "artifact scan timed out");
                artifact.with_error(format!("scan timed out after {limit:?}"))
            }
            Ok(Err(open_err)) => {
                warn!(job_run_id = %id, path, error = %open_err, "could not open artifact");
                artifact.with_error(open_err.to_string())
            }
            Ok(Ok(outcome)) => {
                let partial = artifact.with_matches(outcome.matches);
                match outcome.error {
                    Some(match_err) => {
                        warn!(job_run_id = %id, path, error = %match_err, "artifact match incomplete");
                        partial.with_error(match_err.to_string())
                    }
                    None => partial,
                }
            }
        }
    }
}

fn build_query(prefix: &str, glob: Option<&str>) -> Result<ObjectQuery, ArtifactScanError> {
    let object_query = ObjectQuery::new(prefix);
    match glob.filter(|pattern| !pattern.is_empty()) {
        None => Ok(object_query),
        Some(pattern) => {
            object_query
                .with_glob(pattern)
                .map_err(|err| ArtifactScanError::InvalidGlob {
                    glob: pattern.to_owned(),
                    reason: err.to_string(),
                })
        }
    }
}
