//! Mapping between job run URLs, bucket prefixes, and public artifact URLs.

use super::JobArtifactsDomainError;
use crate::config::ArtifactsConfig;

/// Bucket layout used to resolve artifact paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    bucket_root: String,
    artifact_url_base: String,
}

impl ArtifactLocation {
    /// Creates a location for `bucket_root`, publishing under `artifact_url_base`.
    #[must_use]
    pub fn new(bucket_root: impl Into<String>, artifact_url_base: impl Into<String>) -> Self {
        let root: String = bucket_root.into();
        let base: String = artifact_url_base.into();
        Self {
            bucket_root: root.trim_matches('/').to_owned(),
            artifact_url_base: base.trim_end_matches('/').to_owned(),
        }
    }

    /// Builds a location from artifact configuration.
    #[must_use]
    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self::new(
            config.bucket_root.as_str(),
            config.artifact_url_base.as_str(),
        )
    }

    /// Returns the bucket root.
    #[must_use]
    pub fn bucket_root(&self) -> &str {
        &self.bucket_root
    }

    /// Extracts the object prefix following `/<bucket_root>/` in `url`.
    ///
    /// The prefix always ends with `/`.
    ///
    /// # Errors
    ///
    /// Returns [`JobArtifactsDomainError::MissingBucketMarker`] when the URL
    /// does not contain the bucket root as a path segment.
    pub fn job_run_prefix(&self, url: &str) -> Result<String, JobArtifactsDomainError> {
        let marker = format!("/{}/", self.bucket_root);
        let Some((_, path)) = url.split_once(marker.as_str()) else {
            return Err(JobArtifactsDomainError::MissingBucketMarker {
                url: url.to_owned(),
                bucket_root: self.bucket_root.clone(),
            });
        };
        let mut prefix = path.to_owned();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Ok(prefix)
    }

    /// Returns the public URL of the object at `path`.
    #[must_use]
    pub fn artifact_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.artifact_url_base, self.bucket_root, path)
    }
}
