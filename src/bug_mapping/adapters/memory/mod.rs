//! In-memory adapters for reconciliation tests and local runs.

mod store;
mod warehouse;

pub use store::InMemoryBugStore;
pub use warehouse::InMemoryWarehouse;
