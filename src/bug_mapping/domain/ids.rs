//! Identifier and validated scalar types for the ticket domain.

use super::BugMappingDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric ticket identifier assigned by the defect tracker.
///
/// This is also the primary key of the local ticket table; no local
/// identifier is minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(i64);

impl TicketId {
    /// Creates a validated ticket identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BugMappingDomainError::InvalidTicketId`] when the value is
    /// negative.
    pub fn new(value: i64) -> Result<Self, BugMappingDomainError> {
        if value < 0 {
            return Err(BugMappingDomainError::InvalidTicketId(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parses the string form delivered by the warehouse.
    ///
    /// # Errors
    ///
    /// Returns [`BugMappingDomainError::InvalidTicketId`] when the value is not
    /// a non-negative integer.
    pub fn parse(raw: &str) -> Result<Self, BugMappingDomainError> {
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| BugMappingDomainError::InvalidTicketId(raw.to_owned()))?;
        Self::new(value).map_err(|_| BugMappingDomainError::InvalidTicketId(raw.to_owned()))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable ticket key such as `OCPBUGS-1234`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketKey(String);

impl TicketKey {
    /// Creates a validated ticket key.
    ///
    /// # Errors
    ///
    /// Returns [`BugMappingDomainError::EmptyTicketKey`] when the key is empty
    /// after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, BugMappingDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BugMappingDomainError::EmptyTicketKey);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Extracts the key from a tracker URL whose path ends in
    /// `/browse/<key>`.
    ///
    /// Query strings and fragments are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BugMappingDomainError::InvalidBrowseUrl`] when the URL has no
    /// scheme and host or its path does not end in `/browse/<key>`.
    pub fn from_browse_url(url: &str) -> Result<Self, BugMappingDomainError> {
        let invalid = || BugMappingDomainError::InvalidBrowseUrl(url.to_owned());
        let (_, after_scheme) = url.trim().split_once("://").ok_or_else(invalid)?;
        let without_suffix = after_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let (_, path) = without_suffix.split_once('/').ok_or_else(invalid)?;

        let mut segments = path.rsplit('/');
        let key = segments.next().unwrap_or_default();
        let marker = segments.next().ok_or_else(invalid)?;
        if marker != "browse" || key.is_empty() {
            return Err(invalid());
        }
        Self::new(key).map_err(|_| invalid())
    }

    /// Returns the key as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local identifier of a triage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriageId(i64);

impl TriageId {
    /// Wraps a persisted triage identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TriageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local identifier of a known test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(i64);

impl TestId {
    /// Wraps a persisted test identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

/// Local identifier of a known CI job definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(i64);

impl JobId {
    /// Wraps a persisted job identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}
