//! Sequencing loaders before the view refresh.

use super::{DataLoader, LoadFailure};
use crate::matview::{
    domain::{RefreshReport, ViewName},
    ports::ViewStore,
    services::MaterializedViewRefresher,
};
use tracing::{info, warn};

/// Failures reported by one loader.
#[derive(Debug, Clone)]
pub struct LoaderReport {
    /// Loader name.
    pub name: String,
    /// Failures, in the order the loader reported them.
    pub failures: Vec<LoadFailure>,
}

impl LoaderReport {
    /// Returns `true` when the loader aborted.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.failures.iter().any(LoadFailure::is_fatal)
    }
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshCycleReport {
    /// One entry per loader, in run order.
    pub loaders: Vec<LoaderReport>,
    /// View refresh outcome.
    pub views: RefreshReport,
}

impl RefreshCycleReport {
    /// Returns `true` when no loader failed and every view refreshed or was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.loaders.iter().all(|loader| loader.failures.is_empty())
            && self.views.failed_count() == 0
    }
}

/// Runs loaders one after another, then refreshes the views.
///
/// Views are refreshed even when a loader fails; they then reflect whatever
/// the loaders managed to write.
pub struct RefreshCycle<S>
where
    S: ViewStore + 'static,
{
    loaders: Vec<Box<dyn DataLoader>>,
    refresher: MaterializedViewRefresher<S>,
    views: Vec<ViewName>,
    only_if_empty: bool,
}

impl<S> RefreshCycle<S>
where
    S: ViewStore + 'static,
{
    /// Creates a cycle with no loaders.
    #[must_use]
    pub const fn new(refresher: MaterializedViewRefresher<S>, views: Vec<ViewName>) -> Self {
        Self {
            loaders: Vec::new(),
            refresher,
            views,
            only_if_empty: false,
        }
    }

    /// Appends a loader; loaders run in the order they were added.
    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn DataLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Skips views that already hold rows.
    #[must_use]
    pub const fn only_if_empty(mut self, only_if_empty: bool) -> Self {
        self.only_if_empty = only_if_empty;
        self
    }

    /// Runs every loader, then refreshes every view.
    pub async fn run(&self) -> RefreshCycleReport {
        let mut loaders = Vec::with_capacity(self.loaders.len());
        for loader in &self.loaders {
            let name = loader.name().to_owned();
            info!(loader = %name, "running data loader");
            let failures = loader.load().await;
            if failures.is_empty() {
                info!(loader = %name, "data loader finished");
            } else {
                warn!(loader = %name, failures = failures.len(), "data loader reported failures");
            }
            loaders.push(LoaderReport { name, failures });
        }

        let views = self
            .refresher
            .refresh_all(&self.views, self.only_if_empty)
            .await;
        RefreshCycleReport { loaders, views }
    }
}
