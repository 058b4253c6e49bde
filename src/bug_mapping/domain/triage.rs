//! Curated links between detected regressions and tickets.

use super::{BugMappingDomainError, TicketId, TicketKey, TriageId};
use serde::{Deserialize, Serialize};

/// The ticket a triage currently points at, as seen through the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedTicket {
    /// Linked ticket identifier.
    pub id: TicketId,
    /// URL of the linked ticket row.
    pub url: String,
}

/// A human-curated triage record.
///
/// `url` is the curated ticket URL; `linked` is the ticket row the foreign
/// key currently references, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triage {
    id: TriageId,
    description: String,
    url: String,
    linked: Option<LinkedTicket>,
}

impl Triage {
    /// Creates an unlinked triage.
    #[must_use]
    pub fn new(id: TriageId, description: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            url: url.into(),
            linked: None,
        }
    }

    /// Sets the currently linked ticket.
    #[must_use]
    pub fn with_link(mut self, linked: LinkedTicket) -> Self {
        self.linked = Some(linked);
        self
    }

    /// Returns the triage identifier.
    #[must_use]
    pub const fn id(&self) -> TriageId {
        self.id
    }

    /// Returns the triage description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the curated ticket URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the linked ticket, if any.
    #[must_use]
    pub const fn linked(&self) -> Option<&LinkedTicket> {
        self.linked.as_ref()
    }

    /// Returns `true` when the triage is linked to a ticket whose URL equals
    /// the curated URL.
    #[must_use]
    pub fn is_link_current(&self) -> bool {
        self.linked
            .as_ref()
            .is_some_and(|linked| linked.url == self.url)
    }

    /// Extracts the ticket key from the curated URL.
    ///
    /// # Errors
    ///
    /// Returns [`BugMappingDomainError::InvalidBrowseUrl`] when the URL does
    /// not end in `/browse/<key>`.
    pub fn ticket_key(&self) -> Result<TicketKey, BugMappingDomainError> {
        TicketKey::from_browse_url(&self.url)
    }
}
