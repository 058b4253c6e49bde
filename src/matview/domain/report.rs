//! Per-view and per-batch refresh results.

use super::ViewName;
use crate::matview::ports::ViewStoreError;
use std::time::Duration;

/// How a single view was handled.
#[derive(Debug, Clone)]
pub enum ViewRefreshOutcome {
    /// The view already had rows and only empty views were requested.
    SkippedPopulated,
    /// The non-locking refresh succeeded.
    RefreshedConcurrently,
    /// The non-locking refresh failed and the blocking fallback succeeded.
    RefreshedBlocking,
    /// Both refresh strategies failed.
    Failed(ViewStoreError),
}

impl ViewRefreshOutcome {
    /// Returns `true` when the view contents were re-derived.
    #[must_use]
    pub const fn is_refreshed(&self) -> bool {
        matches!(self, Self::RefreshedConcurrently | Self::RefreshedBlocking)
    }

    /// Returns `true` when both strategies failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome and elapsed time for one view.
#[derive(Debug, Clone)]
pub struct ViewRefreshRecord {
    /// View handled.
    pub view: ViewName,
    /// What happened.
    pub outcome: ViewRefreshOutcome,
    /// Time spent on the view, including any fallback.
    pub elapsed: Duration,
}

/// Result of refreshing a batch of views.
///
/// Records appear in completion order, which is unspecified across views.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    /// One record per processed view.
    pub records: Vec<ViewRefreshRecord>,
    /// Wall-clock time for the whole batch.
    pub total: Duration,
}

impl RefreshReport {
    /// Returns the record for `view`, if it was processed.
    #[must_use]
    pub fn record(&self, view: &ViewName) -> Option<&ViewRefreshRecord> {
        self.records.iter().find(|record| &record.view == view)
    }

    /// Returns the records whose view was re-derived.
    pub fn refreshed(&self) -> impl Iterator<Item = &ViewRefreshRecord> {
        self.records
            .iter()
            .filter(|record| record.outcome.is_refreshed())
    }

    /// Returns the number of views for which both strategies failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome.is_failed())
            .count()
    }
}
