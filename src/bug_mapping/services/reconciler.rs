//! Full-resync reconciliation of warehouse tickets into the relational store.

use super::{
    mapping::{MappingAccumulator, TicketSet},
    merge::merge_mappings,
    queries::TicketQueries,
    report::{PersistStage, ReconcileCounts, ReconcileIssue, ReconcileReport},
};
use crate::bug_mapping::{
    domain::{
        BugMappingDomainError, JobCache, LinkedTicket, TestCache, TicketRow, TicketUrlScheme,
        Triage, TriageId,
    },
    ports::{
        MappingSource, ReferenceDataError, ReferenceDataSource, TicketRepository,
        TicketWarehouse, TriageRepository, TriageRepositoryError, WarehouseError, WarehouseQuery,
    },
};
use crate::config::FlakewatchConfig;
use futures::StreamExt;
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default ceiling for the warehouse fetch phase.
pub const DEFAULT_WAREHOUSE_DEADLINE: Duration = Duration::from_secs(600);

/// Errors that abort a reconciliation run.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    /// A warehouse query could not be issued or its rows could not be read.
    #[error("{mapping} warehouse query failed: {error}")]
    Warehouse {
        /// Query that failed.
        mapping: MappingSource,
        /// Warehouse failure.
        error: WarehouseError,
    },
    /// Fetching from the warehouse took longer than the configured deadline.
    #[error("warehouse queries exceeded the {0:?} deadline")]
    DeadlineExceeded(Duration),
    /// A triage URL does not name a ticket key.
    #[error("triage {triage_id} has a malformed ticket url: {reason}")]
    MalformedTriageUrl {
        /// Offending triage.
        triage_id: TriageId,
        /// Parse failure.
        reason: BugMappingDomainError,
    },
    /// Loading the test or job caches failed.
    #[error(transparent)]
    ReferenceData(#[from] ReferenceDataError),
    /// Listing triages failed.
    #[error("failed to list triages: {0}")]
    TriageList(TriageRepositoryError),
}

/// Result type for reconciliation runs.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Query text, URL scheme, and deadline used by a reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Warehouse query renderer.
    pub queries: TicketQueries,
    /// Canonical ticket URL scheme.
    pub scheme: TicketUrlScheme,
    /// Ceiling for the whole warehouse fetch phase.
    pub deadline: Duration,
}

impl ReconcilerSettings {
    /// Builds settings from application configuration.
    #[must_use]
    pub fn from_config(config: &FlakewatchConfig) -> Self {
        Self {
            queries: TicketQueries::from_config(&config.warehouse),
            scheme: TicketUrlScheme::new(config.tracker.base_url.as_str()),
            deadline: config.warehouse.query_timeout(),
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            queries: TicketQueries::default(),
            scheme: TicketUrlScheme::default(),
            deadline: DEFAULT_WAREHOUSE_DEADLINE,
        }
    }
}

/// Caller-supplied state for one run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileInputs {
    /// Known tests by name.
    pub tests: TestCache,
    /// Known jobs by name.
    pub jobs: JobCache,
    /// Every triage with its current link.
    pub triages: Vec<Triage>,
}

struct FetchedMappings {
    test_set: TicketSet,
    job_set: TicketSet,
    triage_set: TicketSet,
    issues: Vec<ReconcileIssue>,
}

/// Keeps the ticket table in sync with the warehouse.
///
/// Runs are sequential and perform full-resync deletes, so at most one run
/// may target a store at a time.
#[derive(Clone)]
pub struct BugMappingReconciler<W, T, R, C>
where
    W: TicketWarehouse,
    T: TicketRepository,
    R: TriageRepository,
    C: Clock + Send + Sync,
{
    warehouse: Arc<W>,
    tickets: Arc<T>,
    triages: Arc<R>,
    clock: Arc<C>,
    settings: ReconcilerSettings,
}

impl<W, T, R, C> BugMappingReconciler<W, T, R, C>
where
    W: TicketWarehouse,
    T: TicketRepository,
    R: TriageRepository,
    C: Clock + Send + Sync,
{
    /// Creates a reconciler with default settings.
    #[must_use]
    pub fn new(warehouse: Arc<W>, tickets: Arc<T>, triages: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            warehouse,
            tickets,
            triages,
            clock,
            settings: ReconcilerSettings::default(),
        }
    }

    /// Replaces the reconciler settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ReconcilerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Loads the caches and triage list a run needs.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ReferenceData`] or
    /// [`ReconcileError::TriageList`] when loading fails.
    pub async fn load_inputs<S>(&self, reference: &S) -> ReconcileResult<ReconcileInputs>
    where
        S: ReferenceDataSource + ?Sized,
    {
        let tests = reference.load_test_cache().await?;
        let jobs = reference.load_job_cache().await?;
        let triages = self
            .triages
            .list()
            .await
            .map_err(ReconcileError::TriageList)?;
        debug!(
            tests = tests.len(),
            jobs = jobs.len(),
            triages = triages.len(),
            "loaded reconciliation inputs"
        );
        Ok(ReconcileInputs {
            tests,
            jobs,
            triages,
        })
    }

    /// Runs one full reconciliation.
    ///
    /// Per-row, per-ticket, and per-triage problems are collected in the
    /// returned report and never stop the run.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when a warehouse query fails, the fetch
    /// phase exceeds its deadline, or a triage URL is malformed. Nothing is
    /// written to the store in those cases.
    pub async fn reconcile(&self, inputs: ReconcileInputs) -> ReconcileResult<ReconcileReport> {
        let ReconcileInputs {
            tests,
            jobs,
            triages,
        } = inputs;
        let deadline = self.settings.deadline;
        let fetched = tokio::time::timeout(deadline, self.fetch_mappings(&tests, &jobs, &triages))
            .await
            .map_err(|_| ReconcileError::DeadlineExceeded(deadline))??;

        let FetchedMappings {
            test_set,
            job_set,
            triage_set,
            issues,
        } = fetched;
        let mut report = ReconcileReport {
            counts: ReconcileCounts {
                test_mapped: test_set.len(),
                job_mapped: job_set.len(),
                triage_mapped: triage_set.len(),
                ..ReconcileCounts::default()
            },
            issues,
        };
        for issue in &report.issues {
            warn!(%issue, "skipped warehouse row");
        }

        let merged = merge_mappings(test_set, job_set, triage_set);
        report.counts.merged = merged.len();
        info!(
            test_mapped = report.counts.test_mapped,
            job_mapped = report.counts.job_mapped,
            triage_mapped = report.counts.triage_mapped,
            merged = report.counts.merged,
            "merged ticket mappings"
        );

        self.persist(&merged, &mut report).await;
        self.delete_stale(&merged, &mut report).await;
        self.repair_triages(&triages, &merged, &mut report).await;

        info!(
            persisted = report.counts.persisted,
            deleted = report.counts.deleted,
            relinked = report.counts.relinked,
            unlinked = report.counts.unlinked,
            issues = report.issues.len(),
            "ticket reconciliation finished"
        );
        Ok(report)
    }

    async fn fetch_mappings(
        &self,
        tests: &TestCache,
        jobs: &JobCache,
        triages: &[Triage],
    ) -> ReconcileResult<FetchedMappings> {
        let keys = triage_keys(triages)?;
        let scheme = &self.settings.scheme;
        let now = self.clock.utc();
        let mut issues = Vec::new();

        let mut by_test = MappingAccumulator::new(MappingSource::TestMentions, scheme, now);
        self.drain(&self.settings.queries.test_mentions(), |row| {
            by_test.add_test_row(row, tests);
        })
        .await?;
        let (test_set, test_issues) = by_test.finish();
        issues.extend(test_issues);

        let mut by_job = MappingAccumulator::new(MappingSource::JobMentions, scheme, now);
        self.drain(&self.settings.queries.job_mentions(), |row| {
            by_job.add_job_row(row, jobs);
        })
        .await?;
        let (job_set, job_issues) = by_job.finish();
        issues.extend(job_issues);

        let mut by_triage = MappingAccumulator::new(MappingSource::TriageKeys, scheme, now);
        if keys.is_empty() {
            debug!("no triage keys, skipping triage query");
        } else {
            self.drain(&self.settings.queries.triage_keys(keys), |row| {
                by_triage.add_triage_row(row);
            })
            .await?;
        }
        let (triage_set, triage_issues) = by_triage.finish();
        issues.extend(triage_issues);

        Ok(FetchedMappings {
            test_set,
            job_set,
            triage_set,
            issues,
        })
    }

    async fn drain<F>(&self, query: &WarehouseQuery, mut on_row: F) -> ReconcileResult<()>
    where
        F: FnMut(TicketRow),
    {
        let mapping = query.source();
        let warehouse_failure = |error| ReconcileError::Warehouse { mapping, error };
        let mut rows = self
            .warehouse
            .query(query)
            .await
            .map_err(warehouse_failure)?;
        let mut count = 0_usize;
        while let Some(row) = rows.next().await {
            on_row(row.map_err(warehouse_failure)?);
            count += 1;
        }
        debug!(%mapping, rows = count, "drained warehouse query");
        Ok(())
    }

    async fn persist(&self, merged: &TicketSet, report: &mut ReconcileReport) {
        for ticket in merged.values() {
            let ticket_id = ticket.id();
            let failure = if let Err(error) = self.tickets.upsert(ticket).await {
                Some((PersistStage::Upsert, error))
            } else if let Err(error) = self.tickets.replace_tests(ticket_id, ticket.tests()).await
            {
                Some((PersistStage::Tests, error))
            } else if let Err(error) = self.tickets.replace_jobs(ticket_id, ticket.jobs()).await {
                Some((PersistStage::Jobs, error))
            } else {
                None
            };

            match failure {
                None => report.counts.persisted += 1,
                Some((stage, error)) => {
                    error!(%ticket_id, %stage, %error, "failed to persist ticket");
                    report.issues.push(ReconcileIssue::Persist {
                        ticket_id,
                        stage,
                        error,
                    });
                }
            }
        }
    }

    async fn delete_stale(&self, merged: &TicketSet, report: &mut ReconcileReport) {
        let keep: Vec<_> = merged.keys().copied().collect();
        match self.tickets.delete_except(&keep).await {
            Ok(deleted) => {
                report.counts.deleted = deleted;
                if deleted > 0 {
                    info!(deleted, "deleted tickets no longer in the warehouse");
                }
            }
            Err(error) => {
                error!(%error, "failed to delete stale tickets");
                report.issues.push(ReconcileIssue::DeleteStale(error));
            }
        }
    }

    async fn repair_triages(
        &self,
        triages: &[Triage],
        merged: &TicketSet,
        report: &mut ReconcileReport,
    ) {
        for triage in triages {
            let still_linked = triage
                .linked()
                .is_some_and(|linked| merged.contains_key(&linked.id));
            if still_linked && triage.is_link_current() {
                continue;
            }
            let triage_id = triage.id();

            match self.tickets.find_by_url(triage.url()).await {
                Ok(Some(ticket)) => {
                    let link = LinkedTicket {
                        id: ticket.id(),
                        url: ticket.url().to_owned(),
                    };
                    match self.triages.link_ticket(triage_id, &link).await {
                        Ok(()) => {
                            info!(%triage_id, ticket_id = %link.id, "relinked triage");
                            report.counts.relinked += 1;
                        }
                        Err(error) => {
                            error!(%triage_id, %error, "failed to relink triage");
                            report
                                .issues
                                .push(ReconcileIssue::TriageRelink { triage_id, error });
                        }
                    }
                }
                Ok(None) => {
                    warn!(%triage_id, url = triage.url(), "no ticket found for triage");
                    report.issues.push(ReconcileIssue::TriageTicketNotFound {
                        triage_id,
                        url: triage.url().to_owned(),
                    });
                    if triage.linked().is_some() {
                        self.unlink(triage_id, report).await;
                    }
                }
                Err(error) => {
                    error!(%triage_id, %error, "failed to look up triage ticket");
                    report
                        .issues
                        .push(ReconcileIssue::TriageLookup { triage_id, error });
                }
            }
        }
    }

    async fn unlink(&self, triage_id: TriageId, report: &mut ReconcileReport) {
        match self.triages.unlink_ticket(triage_id).await {
            Ok(()) => {
                info!(%triage_id, "cleared stale triage link");
                report.counts.unlinked += 1;
            }
            Err(error) => {
                error!(%triage_id, %error, "failed to clear stale triage link");
                report
                    .issues
                    .push(ReconcileIssue::TriageRelink { triage_id, error });
            }
        }
    }
}

/// Extracts the distinct ticket keys named by triage URLs.
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedTriageUrl`] for the first URL that
/// does not end in `/browse/<key>`.
pub fn triage_keys(triages: &[Triage]) -> ReconcileResult<Vec<String>> {
    let mut keys = BTreeSet::new();
    for triage in triages {
        let key = triage
            .ticket_key()
            .map_err(|reason| ReconcileError::MalformedTriageUrl {
                triage_id: triage.id(),
                reason,
            })?;
        keys.insert(key.as_str().to_owned());
    }
    Ok(keys.into_iter().collect())
}
