//! Port contracts for ticket reconciliation.
//!
//! Ports define infrastructure-agnostic interfaces used by reconciliation
//! services.

pub mod reference;
pub mod repository;
pub mod warehouse;

pub use reference::{ReferenceDataError, ReferenceDataSource};
pub use repository::{
    TicketRepository, TicketRepositoryError, TicketRepositoryResult, TriageRepository,
    TriageRepositoryError, TriageRepositoryResult,
};
pub use warehouse::{
    MappingSource, QueryParameter, TicketRowStream, TicketWarehouse, WarehouseError,
    WarehouseQuery, WarehouseResult,
};
