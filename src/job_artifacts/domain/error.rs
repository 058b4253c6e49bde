//! Job artifact domain errors.

use thiserror::Error;

/// Errors returned while resolving artifact locations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobArtifactsDomainError {
    /// The job run URL does not point into the artifact bucket.
    #[error("url {url} does not include bucket root {bucket_root:?}")]
    MissingBucketMarker {
        /// Stored job run URL.
        url: String,
        /// Bucket root that was expected.
        bucket_root: String,
    },
}
