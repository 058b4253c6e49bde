//! Given steps for ticket reconciliation BDD scenarios.

use super::world::{ReconcileWorld, TRACKER, changed_at, ticket_row, ticket_url};
use eyre::WrapErr;
use flakewatch::bug_mapping::{
    domain::{
        LinkedTicket, Ticket, TicketDetails, TicketId, TicketKey, TicketUrlScheme, Triage,
        TriageId,
    },
    ports::{MappingSource, WarehouseError},
};
use rstest_bdd_macros::given;

fn stored_ticket(id: i64) -> Result<Ticket, eyre::Report> {
    Ok(Ticket::new(
        TicketId::new(id).wrap_err("construct ticket id")?,
        TicketKey::new(format!("OCPBUGS-{id}")).wrap_err("construct ticket key")?,
        TicketDetails::new("Closed", "stored before the run", changed_at()),
        &TicketUrlScheme::new(TRACKER),
    ))
}

#[given(r#"the known test "{name}""#)]
fn known_test(world: &mut ReconcileWorld, name: String) {
    world.add_test(&name);
}

#[given(r#"the known job "{name}""#)]
fn known_job(world: &mut ReconcileWorld, name: String) {
    world.add_job(&name);
}

#[given("the store holds ticket {id:i64}")]
fn store_holds_ticket(world: &mut ReconcileWorld, id: i64) -> Result<(), eyre::Report> {
    world.store.seed_ticket(&stored_ticket(id)?);
    Ok(())
}

#[given(r#"the store holds ticket {id:i64} linked to job "{job}""#)]
fn store_holds_ticket_with_job(
    world: &mut ReconcileWorld,
    id: i64,
    job: String,
) -> Result<(), eyre::Report> {
    let job_ref = world
        .job(&job)
        .ok_or_else(|| eyre::eyre!("job '{job}' is not registered"))?;
    world
        .store
        .seed_ticket(&stored_ticket(id)?.with_jobs([job_ref]));
    Ok(())
}

#[given(r#"the warehouse maps ticket {id:i64} to test "{name}""#)]
fn warehouse_maps_test(world: &mut ReconcileWorld, id: i64, name: String) {
    world
        .warehouse
        .push_row(MappingSource::TestMentions, ticket_row(id, Some(&name)));
}

#[given(r#"the warehouse maps ticket {id:i64} to job "{name}""#)]
fn warehouse_maps_job(world: &mut ReconcileWorld, id: i64, name: String) {
    world
        .warehouse
        .push_row(MappingSource::JobMentions, ticket_row(id, Some(&name)));
}

#[given("the warehouse knows triage ticket {id:i64}")]
fn warehouse_knows_triage_ticket(world: &mut ReconcileWorld, id: i64) {
    world
        .warehouse
        .push_row(MappingSource::TriageKeys, ticket_row(id, None));
}

#[given("triage {triage:i64} names ticket {ticket:i64} and is unlinked")]
fn unlinked_triage(world: &mut ReconcileWorld, triage: i64, ticket: i64) {
    world.store.add_triage(Triage::new(
        TriageId::new(triage),
        "regression under investigation",
        ticket_url(ticket),
    ));
}

#[given("triage {triage:i64} names ticket {ticket:i64} and is linked to ticket {linked:i64}")]
fn linked_triage(
    world: &mut ReconcileWorld,
    triage: i64,
    ticket: i64,
    linked: i64,
) -> Result<(), eyre::Report> {
    let link = LinkedTicket {
        id: TicketId::new(linked).wrap_err("construct linked ticket id")?,
        url: ticket_url(linked),
    };
    world.store.add_triage(
        Triage::new(
            TriageId::new(triage),
            "regression under investigation",
            ticket_url(ticket),
        )
        .with_link(link),
    );
    Ok(())
}

#[given("the warehouse is unreachable")]
fn warehouse_unreachable(world: &mut ReconcileWorld) {
    world.warehouse.fail_query(
        MappingSource::TestMentions,
        WarehouseError::query(std::io::Error::other("connection refused")),
    );
}
