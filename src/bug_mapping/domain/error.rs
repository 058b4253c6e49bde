//! Error types for ticket domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing ticket domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BugMappingDomainError {
    /// The external ticket ID is not a non-negative integer.
    #[error("invalid ticket id '{0}', expected a non-negative integer")]
    InvalidTicketId(String),

    /// The ticket key is empty after trimming.
    #[error("ticket key must not be empty")]
    EmptyTicketKey,

    /// The URL does not end in `/browse/<key>`.
    #[error("invalid ticket URL '{0}', expected a path ending in /browse/<key>")]
    InvalidBrowseUrl(String),
}
