//! Ticket records as delivered by the analytics warehouse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One warehouse result row.
///
/// A ticket mentioned by several tests or jobs appears once per match, each
/// row naming the matched test or job in `link_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketRow {
    /// Ticket key.
    pub key: String,
    /// Tracker identifier in string form.
    pub jira_id: Option<String>,
    /// Ticket summary.
    pub summary: String,
    /// Workflow status name.
    pub status: String,
    /// Last modification time, when the tracker recorded one.
    pub last_changed_time: Option<DateTime<Utc>>,
    /// Versions the defect affects.
    pub affects_versions: Vec<String>,
    /// Versions containing the fix.
    pub fix_versions: Vec<String>,
    /// Versions the fix is targeted at.
    pub target_versions: Vec<String>,
    /// Tracker components.
    pub components: Vec<String>,
    /// Tracker labels.
    pub labels: Vec<String>,
    /// Name of the test or job found in the ticket text.
    pub link_name: Option<String>,
}

impl TicketRow {
    /// Returns the tracker identifier when present and non-blank.
    #[must_use]
    pub fn raw_id(&self) -> Option<&str> {
        self.jira_id
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
    }

    /// Returns the matched test or job name when present and non-empty.
    #[must_use]
    pub fn link_name(&self) -> Option<&str> {
        self.link_name.as_deref().filter(|name| !name.is_empty())
    }
}
