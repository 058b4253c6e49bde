//! Port contracts for job artifact scanning.

mod blob;
mod job_run;
mod matcher;

pub use blob::{BlobReader, BlobStore, BlobStoreError, ObjectNameStream, ObjectQuery};
pub use job_run::{JobRunRecord, JobRunRepository, JobRunRepositoryError};
pub use matcher::{ContentMatchError, ContentMatcher, MatchOutcome};
