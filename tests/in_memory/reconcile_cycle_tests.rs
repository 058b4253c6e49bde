//! Reconciliation run as the loader of a refresh cycle.

use crate::in_memory::helpers::{BugBackends, backends, runtime, ticket_row, views};
use flakewatch::bug_mapping::{
    domain::{TicketId, Triage, TriageId},
    ports::{MappingSource, WarehouseError},
    services::BugLoader,
};
use flakewatch::matview::{
    adapters::memory::InMemoryViewStore,
    domain::{ViewName, ViewRefreshOutcome},
    ports::RefreshMode,
    services::MaterializedViewRefresher,
};
use flakewatch::refresh::RefreshCycle;
use rstest::rstest;
use std::io;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn cycle(
    backends: &BugBackends,
    views: &InMemoryViewStore,
    names: &[&str],
) -> eyre::Result<RefreshCycle<InMemoryViewStore>> {
    let view_names = names
        .iter()
        .map(|name| ViewName::new(*name))
        .collect::<Result<Vec<_>, _>>()?;
    let loader = BugLoader::new(backends.reconciler(), Arc::new(backends.store.clone()));
    let refresher = MaterializedViewRefresher::new(Arc::new(views.clone()));
    Ok(RefreshCycle::new(refresher, view_names).with_loader(Box::new(loader)))
}

#[rstest]
fn reconciled_tickets_reach_store_before_views_refresh(
    runtime: io::Result<Runtime>,
    backends: BugBackends,
    views: InMemoryViewStore,
) -> eyre::Result<()> {
    let rt = runtime?;
    backends
        .warehouse
        .push_row(MappingSource::TestMentions, ticket_row(1, Some("unit-test-foo")));
    backends
        .warehouse
        .push_row(MappingSource::JobMentions, ticket_row(2, Some("periodic-job-x")));
    backends.store.add_triage(Triage::new(
        TriageId::new(5),
        "network flake",
        "https://issues.redhat.com/browse/OCPBUGS-3",
    ));
    backends
        .warehouse
        .push_row(MappingSource::TriageKeys, ticket_row(3, None));

    let report = rt.block_on(cycle(&backends, &views, &["job_ticket_counts_matview"])?.run());

    assert!(report.is_clean(), "unexpected failures: {report:?}");
    let ids: Vec<i64> = backends
        .store
        .tickets()
        .iter()
        .map(|ticket| ticket.id().value())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    let triage = backends
        .store
        .triage(TriageId::new(5))
        .ok_or_else(|| eyre::eyre!("triage 5 missing"))?;
    assert_eq!(
        triage.linked().map(|linked| linked.id),
        Some(TicketId::new(3)?)
    );

    let view = ViewName::new("job_ticket_counts_matview")?;
    let record = report
        .views
        .record(&view)
        .ok_or_else(|| eyre::eyre!("view was not refreshed"))?;
    assert!(record.outcome.is_refreshed());
    Ok(())
}

#[rstest]
fn warehouse_outage_is_reported_and_views_still_refresh(
    runtime: io::Result<Runtime>,
    backends: BugBackends,
    views: InMemoryViewStore,
) -> eyre::Result<()> {
    let rt = runtime?;
    backends.warehouse.fail_query(
        MappingSource::JobMentions,
        WarehouseError::query(io::Error::other("quota exceeded")),
    );

    let report = rt.block_on(cycle(&backends, &views, &["job_runs_7d_matview"])?.run());

    let [loader] = report.loaders.as_slice() else {
        return Err(eyre::eyre!("expected one loader report, got {:?}", report.loaders));
    };
    assert_eq!(loader.name, "bugs");
    assert!(loader.aborted());
    assert!(backends.store.tickets().is_empty());
    assert_eq!(report.views.failed_count(), 0);
    assert_eq!(report.views.refreshed().count(), 1);
    Ok(())
}

#[rstest]
fn blocking_fallback_covers_failed_concurrent_refresh(
    runtime: io::Result<Runtime>,
    backends: BugBackends,
    views: InMemoryViewStore,
) -> eyre::Result<()> {
    let rt = runtime?;
    let view = ViewName::new("job_ticket_counts_matview")?;
    views.set_source_rows(&view, 4);
    views.fail_refresh(&view, RefreshMode::Concurrent);

    let report = rt.block_on(cycle(&backends, &views, &["job_ticket_counts_matview"])?.run());

    let record = report
        .views
        .record(&view)
        .ok_or_else(|| eyre::eyre!("view was not processed"))?;
    assert!(matches!(record.outcome, ViewRefreshOutcome::RefreshedBlocking));
    assert_eq!(views.rows(&view), 4);
    assert_eq!(
        views.attempts(),
        vec![
            (view.clone(), RefreshMode::Concurrent),
            (view, RefreshMode::Blocking),
        ]
    );
    Ok(())
}
