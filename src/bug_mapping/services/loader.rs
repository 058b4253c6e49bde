//! Reconciliation as a step of the periodic refresh cycle.

use super::reconciler::BugMappingReconciler;
use crate::bug_mapping::ports::{
    ReferenceDataSource, TicketRepository, TicketWarehouse, TriageRepository,
};
use crate::refresh::{DataLoader, LoadFailure};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use tracing::error;

/// Loads reference data and runs a full ticket reconciliation.
pub struct BugLoader<W, T, R, C, S>
where
    W: TicketWarehouse,
    T: TicketRepository,
    R: TriageRepository,
    C: Clock + Send + Sync,
    S: ReferenceDataSource,
{
    reconciler: BugMappingReconciler<W, T, R, C>,
    reference: Arc<S>,
}

impl<W, T, R, C, S> BugLoader<W, T, R, C, S>
where
    W: TicketWarehouse,
    T: TicketRepository,
    R: TriageRepository,
    C: Clock + Send + Sync,
    S: ReferenceDataSource,
{
    /// Creates a loader around a configured reconciler.
    #[must_use]
    pub const fn new(reconciler: BugMappingReconciler<W, T, R, C>, reference: Arc<S>) -> Self {
        Self {
            reconciler,
            reference,
        }
    }
}

#[async_trait]
impl<W, T, R, C, S> DataLoader for BugLoader<W, T, R, C, S>
where
    W: TicketWarehouse + 'static,
    T: TicketRepository + 'static,
    R: TriageRepository + 'static,
    C: Clock + Send + Sync + 'static,
    S: ReferenceDataSource + 'static,
{
    fn name(&self) -> &str {
        "bugs"
    }

    async fn load(&self) -> Vec<LoadFailure> {
        let inputs = match self.reconciler.load_inputs(self.reference.as_ref()).await {
            Ok(inputs) => inputs,
            Err(err) => {
                error!(error = %err, "failed to load reconciliation inputs");
                return vec![LoadFailure::aborted(err)];
            }
        };
        match self.reconciler.reconcile(inputs).await {
            Ok(report) => report
                .issues
                .into_iter()
                .map(LoadFailure::partial)
                .collect(),
            Err(err) => {
                error!(error = %err, "ticket reconciliation aborted");
                vec![LoadFailure::aborted(err)]
            }
        }
    }
}
