//! `PostgreSQL` adapters for ticket reconciliation persistence.

mod models;
mod reference;
mod repository;
mod schema;
mod triage;

pub use reference::PostgresReferenceData;
pub use repository::{PostgresTicketRepository, TicketPgPool};
pub use triage::PostgresTriageRepository;
