//! Periodic refresh cycle.
//!
//! A cycle runs every registered [`DataLoader`] in order, then refreshes the
//! configured materialized views so they are rebuilt from freshly synced
//! base tables.

mod cycle;
mod loader;

pub use cycle::{LoaderReport, RefreshCycle, RefreshCycleReport};
pub use loader::{DataLoader, LoadFailure};
