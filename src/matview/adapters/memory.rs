//! Scriptable in-memory view store.

use crate::matview::{
    domain::ViewName,
    ports::{RefreshMode, ViewStore, ViewStoreError, ViewStoreResult},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// In-memory view store recording every refresh attempt.
///
/// Views start empty. A successful refresh populates the view with its
/// configured source row count.
#[derive(Debug, Clone, Default)]
pub struct InMemoryViewStore {
    state: Arc<RwLock<ViewState>>,
}

#[derive(Debug, Default)]
struct ViewState {
    rows: HashMap<ViewName, u64>,
    source_rows: HashMap<ViewName, u64>,
    failing_counts: HashSet<ViewName>,
    failing_modes: HashSet<(ViewName, RefreshMode)>,
    delays: HashMap<ViewName, Duration>,
    attempts: Vec<(ViewName, RefreshMode)>,
}

fn scripted_failure(message: String) -> ViewStoreError {
    ViewStoreError::persistence(std::io::Error::other(message))
}

impl InMemoryViewStore {
    /// Creates a store with no views.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rows currently in `view`.
    pub fn set_rows(&self, view: &ViewName, rows: u64) {
        self.write().rows.insert(view.clone(), rows);
    }

    /// Sets the rows a refresh of `view` produces.
    pub fn set_source_rows(&self, view: &ViewName, rows: u64) {
        self.write().source_rows.insert(view.clone(), rows);
    }

    /// Makes row counts of `view` fail.
    pub fn fail_count(&self, view: &ViewName) {
        self.write().failing_counts.insert(view.clone());
    }

    /// Makes refreshes of `view` in `mode` fail.
    pub fn fail_refresh(&self, view: &ViewName, mode: RefreshMode) {
        self.write().failing_modes.insert((view.clone(), mode));
    }

    /// Delays every refresh of `view`.
    pub fn delay_refresh(&self, view: &ViewName, delay: Duration) {
        self.write().delays.insert(view.clone(), delay);
    }

    /// Returns the rows currently in `view`.
    #[must_use]
    pub fn rows(&self, view: &ViewName) -> u64 {
        self.read().rows.get(view).copied().unwrap_or_default()
    }

    /// Returns every refresh attempt in the order it was made.
    #[must_use]
    pub fn attempts(&self) -> Vec<(ViewName, RefreshMode)> {
        self.read().attempts.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ViewState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ViewState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ViewStore for InMemoryViewStore {
    async fn count_rows(&self, view: &ViewName) -> ViewStoreResult<u64> {
        let state = self.read();
        if state.failing_counts.contains(view) {
            return Err(scripted_failure(format!("count failed for {view}")));
        }
        Ok(state.rows.get(view).copied().unwrap_or_default())
    }

    async fn refresh(&self, view: &ViewName, mode: RefreshMode) -> ViewStoreResult<()> {
        let delay = {
            let mut state = self.write();
            state.attempts.push((view.clone(), mode));
            state.delays.get(view).copied()
        };
        if let Some(pause) = delay {
            tokio::time::sleep(pause).await;
        }

        let mut state = self.write();
        if state.failing_modes.contains(&(view.clone(), mode)) {
            return Err(scripted_failure(format!("{mode} refresh failed for {view}")));
        }
        let rows = state.source_rows.get(view).copied().unwrap_or_default();
        state.rows.insert(view.clone(), rows);
        Ok(())
    }
}
