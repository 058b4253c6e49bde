//! Content matcher collecting lines that match a regular expression.

use crate::job_artifacts::ports::{BlobReader, ContentMatchError, ContentMatcher, MatchOutcome};
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tokio::io::AsyncBufReadExt;

/// Collects matching lines, stopping after `max_matches`.
///
/// The payload is `{"lines": [...], "truncated": bool}`, where `truncated`
/// means further lines would have matched.
#[derive(Debug, Clone)]
pub struct LineRegexMatcher {
    pattern: Regex,
    max_matches: usize,
}

impl LineRegexMatcher {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] when the pattern does not compile.
    pub fn new(pattern: &str, max_matches: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            max_matches,
        })
    }
}

#[async_trait]
impl ContentMatcher for LineRegexMatcher {
    async fn get_matches(&self, reader: &mut BlobReader) -> MatchOutcome {
        let mut matched = Vec::new();
        let mut truncated = false;
        let mut lines = reader.lines();
        let failure = loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if !self.pattern.is_match(&line) {
                        continue;
                    }
                    if matched.len() >= self.max_matches {
                        truncated = true;
                        break None;
                    }
                    matched.push(line);
                }
                Ok(None) => break None,
                Err(err) => break Some(ContentMatchError::from(err)),
            }
        };

        let payload = Some(json!({ "lines": matched, "truncated": truncated }));
        match failure {
            Some(error) => MatchOutcome::partial(payload, error),
            None => MatchOutcome::complete(payload),
        }
    }
}
