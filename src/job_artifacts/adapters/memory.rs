//! In-memory blob store and job run repository for tests.

use crate::job_artifacts::{
    domain::JobRunId,
    ports::{
        BlobReader, BlobStore, BlobStoreError, JobRunRecord, JobRunRepository,
        JobRunRepositoryError, ObjectNameStream, ObjectQuery,
    },
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::io::BufReader;

/// Blob store over an in-memory object map.
///
/// Objects are listed in path order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    state: Arc<RwLock<BlobState>>,
}

#[derive(Debug, Default)]
struct BlobState {
    objects: BTreeMap<String, Vec<u8>>,
    failing_opens: HashSet<String>,
    list_delay: Option<Duration>,
    list_failure: Option<String>,
}

impl InMemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` at `path`.
    pub fn put(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .objects
            .insert(path.into(), content.into());
    }

    /// Makes opening `path` fail.
    pub fn fail_open(&self, path: impl Into<String>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .failing_opens
            .insert(path.into());
    }

    /// Delays every listing by `delay`.
    pub fn delay_listing(&self, delay: Duration) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .list_delay = Some(delay);
    }

    /// Makes every listing fail with `message`.
    pub fn fail_listing(&self, message: impl Into<String>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .list_failure = Some(message.into());
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn list(&self, query: &ObjectQuery) -> Result<ObjectNameStream, BlobStoreError> {
        let (delay, names) = {
            let state = self
                .state
                .read()
                .map_err(|err| BlobStoreError::backend(std::io::Error::other(err.to_string())))?;
            if let Some(message) = &state.list_failure {
                return Err(BlobStoreError::backend(std::io::Error::other(
                    message.clone(),
                )));
            }
            let names: Vec<Result<String, BlobStoreError>> = state
                .objects
                .keys()
                .filter(|name| query.matches(name))
                .cloned()
                .map(Ok)
                .collect();
            (state.list_delay, names)
        };
        if let Some(pause) = delay {
            tokio::time::sleep(pause).await;
        }
        Ok(stream::iter(names).boxed())
    }

    async fn open(&self, path: &str) -> Result<BlobReader, BlobStoreError> {
        let state = self
            .state
            .read()
            .map_err(|err| BlobStoreError::backend(std::io::Error::other(err.to_string())))?;
        if state.failing_opens.contains(path) {
            return Err(BlobStoreError::backend(std::io::Error::other(format!(
                "cannot open {path}"
            ))));
        }
        let content = state
            .objects
            .get(path)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(path.to_owned()))?;
        Ok(Box::new(BufReader::new(Cursor::new(content))))
    }
}

/// Job run repository over an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobRunRepository {
    runs: Arc<RwLock<HashMap<JobRunId, JobRunRecord>>>,
}

impl InMemoryJobRunRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a job run.
    pub fn insert(&self, record: JobRunRecord) {
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id, record);
    }
}

#[async_trait]
impl JobRunRepository for InMemoryJobRunRepository {
    async fn find_job_run(
        &self,
        id: JobRunId,
    ) -> Result<Option<JobRunRecord>, JobRunRepositoryError> {
        let runs = self.runs.read().map_err(|err| {
            JobRunRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(runs.get(&id).cloned())
    }
}
