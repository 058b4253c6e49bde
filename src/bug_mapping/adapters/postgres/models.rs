//! Diesel row models for ticket reconciliation persistence.

use super::schema::{jobs, ticket_jobs, ticket_tests, tickets, tests};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for ticket records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tickets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoredTicketRow {
    /// Tracker identifier.
    pub id: i64,
    /// Ticket key.
    pub key: String,
    /// Workflow status name.
    pub status: String,
    /// Ticket summary.
    pub summary: String,
    /// Last modification time.
    pub last_change_time: DateTime<Utc>,
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
    /// Canonical ticket URL.
    pub url: String,
}

/// Insert and full-update model for ticket records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tickets)]
pub struct NewTicketRow {
    /// Tracker identifier.
    pub id: i64,
    /// Ticket key.
    pub key: String,
    /// Workflow status name.
    pub status: String,
    /// Ticket summary.
    pub summary: String,
    /// Last modification time.
    pub last_change_time: DateTime<Utc>,
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
    /// Canonical ticket URL.
    pub url: String,
}

/// Insert model for ticket to test associations.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ticket_tests)]
pub struct NewTicketTestRow {
    /// Ticket identifier.
    pub ticket_id: i64,
    /// Test identifier.
    pub test_id: i64,
}

/// Insert model for ticket to job associations.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ticket_jobs)]
pub struct NewTicketJobRow {
    /// Ticket identifier.
    pub ticket_id: i64,
    /// Job identifier.
    pub job_id: i64,
}

/// Query result row for known tests.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TestRow {
    /// Test identifier.
    pub id: i64,
    /// Test name.
    pub name: String,
}

/// Query result row for known jobs.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRow {
    /// Job identifier.
    pub id: i64,
    /// Job name.
    pub name: String,
}

/// Triage row joined with its linked ticket URL.
#[derive(Debug, Clone, QueryableByName)]
pub struct TriageLinkRow {
    /// Triage identifier.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub id: i64,
    /// Triage description.
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub description: String,
    /// Curated ticket URL.
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub url: String,
    /// Linked ticket identifier.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::BigInt>)]
    pub ticket_id: Option<i64>,
    /// URL of the linked ticket.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub ticket_url: Option<String>,
}
