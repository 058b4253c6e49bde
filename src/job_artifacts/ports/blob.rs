//! Object storage holding job run artifacts.

use async_trait::async_trait;
use futures::stream::BoxStream;
use globset::GlobMatcher;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncBufRead;

/// Lazily listed object names.
pub type ObjectNameStream = BoxStream<'static, Result<String, BlobStoreError>>;

/// Buffered streaming reader over one object.
pub type BlobReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Prefix-bounded listing request with an optional glob.
///
/// The glob is matched against the object path relative to the prefix, and
/// `*` never crosses a `/`.
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    prefix: String,
    glob: Option<GlobMatcher>,
}

impl ObjectQuery {
    /// Lists every object under `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            glob: None,
        }
    }

    /// Restricts the listing to objects matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`globset::Error`] when `pattern` is not a valid glob.
    pub fn with_glob(mut self, pattern: &str) -> Result<Self, globset::Error> {
        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()?;
        self.glob = Some(glob.compile_matcher());
        Ok(self)
    }

    /// Returns the object prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `true` when `name` lies under the prefix and matches the glob.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let Some(relative) = name.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        self.glob
            .as_ref()
            .is_none_or(|glob| glob.is_match(relative))
    }
}

/// Read access to the artifact bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Lists object names accepted by `query`.
    ///
    /// The stream ends when the listing is exhausted; callers may stop
    /// polling early.
    async fn list(&self, query: &ObjectQuery) -> Result<ObjectNameStream, BlobStoreError>;

    /// Opens a streaming reader for the object at `path`.
    async fn open(&self, path: &str) -> Result<BlobReader, BlobStoreError>;
}

/// Errors returned by blob store implementations.
#[derive(Debug, Clone, Error)]
pub enum BlobStoreError {
    /// No object exists at the path.
    #[error("object not found: {0}")]
    NotFound(String),
    /// The backend failed.
    #[error("blob store error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl BlobStoreError {
    /// Wraps a backend-specific error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

