//! Bounded worker pool refreshing materialized views.

use crate::matview::{
    domain::{RefreshReport, ViewName, ViewRefreshOutcome, ViewRefreshRecord},
    ports::{RefreshMetricsSink, RefreshMode, ViewStore},
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Number of workers refreshing views in parallel.
pub const REFRESH_WORKERS: usize = 3;

type ViewQueue = Arc<Mutex<mpsc::Receiver<ViewName>>>;

/// Refreshes materialized views through a fixed pool of workers.
pub struct MaterializedViewRefresher<S>
where
    S: ViewStore + 'static,
{
    store: Arc<S>,
    metrics: Option<Arc<dyn RefreshMetricsSink>>,
}

impl<S> MaterializedViewRefresher<S>
where
    S: ViewStore + 'static,
{
    /// Creates a refresher without a metrics sink.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    /// Pushes timings to `sink` after every batch.
    #[must_use]
    pub fn with_metrics_sink(mut self, sink: Arc<dyn RefreshMetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Refreshes every view in `views` and waits for all of them.
    ///
    /// With `only_if_empty`, views that already hold rows are skipped; a
    /// failed row count does not prevent the refresh. Failures are recorded
    /// per view and never abort the batch.
    pub async fn refresh_all(&self, views: &[ViewName], only_if_empty: bool) -> RefreshReport {
        let started = Instant::now();
        info!(views = views.len(), only_if_empty, "refreshing materialized views");

        let (sender, receiver) = mpsc::channel(views.len().max(1));
        let queue: ViewQueue = Arc::new(Mutex::new(receiver));
        let mut workers = JoinSet::new();
        for _ in 0..REFRESH_WORKERS {
            workers.spawn(run_worker(
                Arc::clone(&self.store),
                Arc::clone(&queue),
                only_if_empty,
            ));
        }

        for view in views {
            if sender.send(view.clone()).await.is_err() {
                error!(view = %view, "refresh queue closed early");
                break;
            }
        }
        drop(sender);

        let mut records = Vec::with_capacity(views.len());
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_records) => records.extend(worker_records),
                Err(err) => error!(error = %err, "refresh worker stopped unexpectedly"),
            }
        }

        let report = RefreshReport {
            records,
            total: started.elapsed(),
        };
        info!(
            elapsed_ms = report.total.as_millis(),
            failed = report.failed_count(),
            "refreshed all materialized views"
        );
        self.publish(&report).await;
        report
    }

    async fn publish(&self, report: &RefreshReport) {
        let Some(sink) = &self.metrics else {
            return;
        };
        match sink.push(report).await {
            Ok(()) => info!("pushed materialized view metrics"),
            Err(err) => error!(error = %err, "could not push materialized view metrics"),
        }
    }
}

async fn run_worker<S>(store: Arc<S>, queue: ViewQueue, only_if_empty: bool) -> Vec<ViewRefreshRecord>
where
    S: ViewStore + ?Sized,
{
    let mut records = Vec::new();
    loop {
        let next = queue.lock().await.recv().await;
        let Some(view) = next else {
            break;
        };
        records.push(refresh_view(store.as_ref(), view, only_if_empty).await);
    }
    records
}

async fn refresh_view<S>(store: &S, view: ViewName, only_if_empty: bool) -> ViewRefreshRecord
where
    S: ViewStore + ?Sized,
{
    let started = Instant::now();
    if only_if_empty {
        match store.count_rows(&view).await {
            Ok(rows) if rows > 0 => {
                info!(view = %view, rows, "skipping populated materialized view");
                return ViewRefreshRecord {
                    view,
                    outcome: ViewRefreshOutcome::SkippedPopulated,
                    elapsed: started.elapsed(),
                };
            }
            Ok(_) => {}
            Err(err) => {
                warn!(view = %view, error = %err, "row count failed, refreshing view anyway");
            }
        }
    }

    let outcome = match store.refresh(&view, RefreshMode::Concurrent).await {
        Ok(()) => ViewRefreshOutcome::RefreshedConcurrently,
        Err(concurrent_err) => {
            warn!(
                view = %view,
                error = %concurrent_err,
                "concurrent refresh failed, falling back to blocking refresh"
            );
            match store.refresh(&view, RefreshMode::Blocking).await {
                Ok(()) => ViewRefreshOutcome::RefreshedBlocking,
                Err(blocking_err) => {
                    error!(view = %view, error = %blocking_err, "failed to refresh materialized view");
                    ViewRefreshOutcome::Failed(blocking_err)
                }
            }
        }
    };

    let elapsed = started.elapsed();
    if outcome.is_refreshed() {
        info!(view = %view, elapsed_ms = elapsed.as_millis(), "refreshed materialized view");
    }
    ViewRefreshRecord {
        view,
        outcome,
        elapsed,
    }
}
