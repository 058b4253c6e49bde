//! Domain model for ticket reconciliation.
//!
//! Tickets are keyed by the tracker's numeric identifier. Triage records are
//! owned elsewhere; this domain only models their ticket linkage.

mod cache;
mod error;
mod ids;
mod row;
mod ticket;
mod triage;

pub use cache::{CacheEntry, JobCache, LookupCache, TestCache};
pub use error::BugMappingDomainError;
pub use ids::{JobId, TestId, TicketId, TicketKey, TriageId};
pub use row::TicketRow;
pub use ticket::{JobRef, TestRef, Ticket, TicketDetails, TicketUrlScheme};
pub use triage::{LinkedTicket, Triage};
