//! When steps for ticket reconciliation BDD scenarios.

use super::world::{ReconcileWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

fn run_reconciler(world: &mut ReconcileWorld) -> Result<(), eyre::Report> {
    world.previous_tickets = Some(world.store.tickets());
    let inputs = run_async(world.reconciler.load_inputs(&world.store))
        .wrap_err("load reconciliation inputs")?;
    world.last_result = Some(run_async(world.reconciler.reconcile(inputs)));
    Ok(())
}

#[when("the reconciler runs")]
fn reconciler_runs(world: &mut ReconcileWorld) -> Result<(), eyre::Report> {
    run_reconciler(world)
}

#[when("the reconciler runs again")]
fn reconciler_runs_again(world: &mut ReconcileWorld) -> Result<(), eyre::Report> {
    if world.last_result.is_none() {
        return Err(eyre::eyre!("expected an earlier run in this scenario"));
    }
    run_reconciler(world)
}
