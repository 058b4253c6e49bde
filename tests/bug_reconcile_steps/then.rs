//! Then steps for ticket reconciliation BDD scenarios.

use super::world::ReconcileWorld;
use eyre::WrapErr;
use flakewatch::bug_mapping::{
    domain::{Ticket, TicketId, TriageId},
    services::{ReconcileError, ReconcileReport},
};
use rstest_bdd_macros::then;

fn report(world: &ReconcileWorld) -> Result<&ReconcileReport, eyre::Report> {
    world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing run result in scenario world"))?
        .as_ref()
        .map_err(|err| eyre::eyre!("unexpected reconciliation failure: {err}"))
}

fn stored(world: &ReconcileWorld, id: i64) -> Result<Option<Ticket>, eyre::Report> {
    let ticket_id = TicketId::new(id).wrap_err("construct ticket id")?;
    Ok(world
        .store
        .tickets()
        .into_iter()
        .find(|ticket| ticket.id() == ticket_id))
}

#[then("the run succeeds")]
fn run_succeeds(world: &ReconcileWorld) -> Result<(), eyre::Report> {
    report(world).map(|_| ())
}

#[then("the run fails with a warehouse error")]
fn run_fails_with_warehouse_error(world: &ReconcileWorld) -> Result<(), eyre::Report> {
    match world.last_result.as_ref() {
        Some(Err(ReconcileError::Warehouse { .. })) => Ok(()),
        other => Err(eyre::eyre!("expected warehouse error, found {other:?}")),
    }
}

#[then(r#"ticket {id:i64} has test "{name}""#)]
fn ticket_has_test(world: &ReconcileWorld, id: i64, name: String) -> Result<(), eyre::Report> {
    let ticket = stored(world, id)?.ok_or_else(|| eyre::eyre!("ticket {id} is not stored"))?;
    if !ticket.tests().iter().any(|test| test.name() == name) {
        return Err(eyre::eyre!(
            "ticket {id} lacks test '{name}': {:?}",
            ticket.tests()
        ));
    }
    Ok(())
}

#[then("ticket {id:i64} has no jobs")]
fn ticket_has_no_jobs(world: &ReconcileWorld, id: i64) -> Result<(), eyre::Report> {
    let ticket = stored(world, id)?.ok_or_else(|| eyre::eyre!("ticket {id} is not stored"))?;
    if !ticket.jobs().is_empty() {
        return Err(eyre::eyre!("ticket {id} still has jobs: {:?}", ticket.jobs()));
    }
    Ok(())
}

#[then("ticket {id:i64} is not stored")]
fn ticket_not_stored(world: &ReconcileWorld, id: i64) -> Result<(), eyre::Report> {
    if stored(world, id)?.is_some() {
        return Err(eyre::eyre!("ticket {id} should have been deleted"));
    }
    Ok(())
}

#[then("the store holds {count:usize} tickets")]
fn store_holds_count(world: &ReconcileWorld, count: usize) -> Result<(), eyre::Report> {
    let found = world.store.tickets().len();
    if found != count {
        return Err(eyre::eyre!("expected {count} tickets, found {found}"));
    }
    Ok(())
}

#[then("the store is unchanged since the previous run")]
fn store_unchanged(world: &ReconcileWorld) -> Result<(), eyre::Report> {
    let previous = world
        .previous_tickets
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing snapshot from the previous run"))?;
    if *previous != world.store.tickets() {
        return Err(eyre::eyre!("store changed on an identical re-run"));
    }
    let repeat = report(world)?;
    if repeat.counts.deleted != 0 || repeat.counts.relinked != 0 {
        return Err(eyre::eyre!(
            "re-run reported changes: {:?}",
            repeat.counts
        ));
    }
    Ok(())
}

#[then("triage {triage:i64} is linked to ticket {ticket:i64}")]
fn triage_linked(world: &ReconcileWorld, triage: i64, ticket: i64) -> Result<(), eyre::Report> {
    let stored_triage = world
        .store
        .triage(TriageId::new(triage))
        .ok_or_else(|| eyre::eyre!("triage {triage} is not stored"))?;
    let linked = stored_triage
        .linked()
        .ok_or_else(|| eyre::eyre!("triage {triage} is unlinked"))?;
    if linked.id.value() != ticket || !stored_triage.is_link_current() {
        return Err(eyre::eyre!(
            "triage {triage} points at {:?}, expected ticket {ticket}",
            linked
        ));
    }
    Ok(())
}

#[then("triage {triage:i64} is unlinked")]
fn triage_unlinked(world: &ReconcileWorld, triage: i64) -> Result<(), eyre::Report> {
    let stored_triage = world
        .store
        .triage(TriageId::new(triage))
        .ok_or_else(|| eyre::eyre!("triage {triage} is not stored"))?;
    if let Some(linked) = stored_triage.linked() {
        return Err(eyre::eyre!("triage {triage} is still linked to {:?}", linked));
    }
    Ok(())
}

#[then("the report records {count:usize} issues")]
fn report_records_issues(world: &ReconcileWorld, count: usize) -> Result<(), eyre::Report> {
    let issues = &report(world)?.issues;
    if issues.len() != count {
        return Err(eyre::eyre!("expected {count} issues, found {issues:?}"));
    }
    Ok(())
}
