//! Ticket reconciliation between the analytics warehouse and the local store.
//!
//! Three warehouse mappings (ticket to test, ticket to job, ticket to triage)
//! are merged into one authoritative ticket set which is synchronized into the
//! relational store: tickets are upserted by their external numeric ID, their
//! test and job associations replaced, tickets no longer mentioned deleted,
//! and triage links pointing at stale tickets repaired. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
