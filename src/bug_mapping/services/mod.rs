//! Application services for ticket reconciliation.

mod loader;
mod mapping;
mod merge;
mod queries;
mod reconciler;
mod report;

pub use loader::BugLoader;
pub use mapping::{MappingAccumulator, TicketSet};
pub use merge::merge_mappings;
pub use queries::{TRIAGE_KEYS_PARAMETER, TicketQueries};
pub use reconciler::{
    BugMappingReconciler, DEFAULT_WAREHOUSE_DEADLINE, ReconcileError, ReconcileInputs,
    ReconcileResult, ReconcilerSettings, triage_keys,
};
pub use report::{PersistStage, ReconcileCounts, ReconcileIssue, ReconcileReport};
