//! Validated materialized view names.

use super::MatviewDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a materialized view, optionally schema-qualified.
///
/// Each part matches `[A-Za-z_][A-Za-z0-9_]*`, so a validated name can be
/// spliced into refresh statements.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ViewName(String);

impl ViewName {
    /// Validates and wraps a view name.
    ///
    /// # Errors
    ///
    /// Returns [`MatviewDomainError::InvalidViewName`] when the name is empty,
    /// has more than two dot-separated parts, or contains characters outside
    /// identifier syntax.
    pub fn new(value: impl Into<String>) -> Result<Self, MatviewDomainError> {
        let raw = value.into();
        let mut parts = raw.split('.');
        let valid = parts.by_ref().take(2).all(is_identifier) && parts.next().is_none();
        if valid {
            Ok(Self(raw))
        } else {
            Err(MatviewDomainError::InvalidViewName(raw))
        }
    }

    /// Returns the name as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

impl TryFrom<String> for ViewName {
    type Error = MatviewDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ViewName> for String {
    fn from(value: ViewName) -> Self {
        value.0
    }
}

impl AsRef<str> for ViewName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
