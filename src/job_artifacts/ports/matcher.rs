//! Pluggable content matching over artifact files.

use super::BlobReader;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Matches and the failure that interrupted matching, if any.
///
/// Both may be set: a matcher that fails mid-stream still returns what it
/// found before the failure.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Matcher-specific payload; opaque to the scanner.
    pub matches: Option<Value>,
    /// Failure that stopped matching early.
    pub error: Option<ContentMatchError>,
}

impl MatchOutcome {
    /// Creates a complete outcome.
    #[must_use]
    pub const fn complete(matches: Option<Value>) -> Self {
        Self {
            matches,
            error: None,
        }
    }

    /// Creates an outcome interrupted by `error`.
    #[must_use]
    pub const fn partial(matches: Option<Value>, error: ContentMatchError) -> Self {
        Self {
            matches,
            error: Some(error),
        }
    }
}

/// Scans one file's content.
#[async_trait]
pub trait ContentMatcher: Send + Sync {
    /// Reads `reader` and returns what matched.
    async fn get_matches(&self, reader: &mut BlobReader) -> MatchOutcome;
}

/// Errors raised while matching content.
#[derive(Debug, Clone, Error)]
pub enum ContentMatchError {
    /// Reading the stream failed.
    #[error("failed reading content: {0}")]
    Read(Arc<std::io::Error>),
    /// The matcher rejected the content.
    #[error("{0}")]
    Invalid(String),
}

impl From<std::io::Error> for ContentMatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Read(Arc::new(err))
    }
}
