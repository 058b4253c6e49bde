//! In-memory relational store for reconciliation tests.
//!
//! Mirrors the relational semantics the reconciler depends on: upserts leave
//! associations untouched, deleting a ticket drops its associations and
//! clears triage links that referenced it.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::bug_mapping::{
    domain::{
        JobCache, JobRef, LinkedTicket, TestCache, TestRef, Ticket, TicketId, Triage, TriageId,
    },
    ports::{
        ReferenceDataError, ReferenceDataSource, TicketRepository, TicketRepositoryError,
        TicketRepositoryResult, TriageRepository, TriageRepositoryError, TriageRepositoryResult,
    },
};

/// Thread-safe in-memory ticket, triage, and reference data store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBugStore {
    state: Arc<RwLock<InMemoryBugState>>,
}

#[derive(Debug, Default)]
struct InMemoryBugState {
    tickets: BTreeMap<TicketId, Ticket>,
    ticket_tests: HashMap<TicketId, Vec<TestRef>>,
    ticket_jobs: HashMap<TicketId, Vec<JobRef>>,
    triages: BTreeMap<TriageId, StoredTriage>,
    tests: Vec<TestRef>,
    jobs: Vec<JobRef>,
}

#[derive(Debug, Clone)]
struct StoredTriage {
    triage: Triage,
    ticket_id: Option<TicketId>,
}

impl InMemoryBugState {
    fn assemble(&self, row: &Ticket) -> Ticket {
        let id = row.id();
        row.clone()
            .with_tests(self.ticket_tests.get(&id).cloned().unwrap_or_default())
            .with_jobs(self.ticket_jobs.get(&id).cloned().unwrap_or_default())
    }

    fn assemble_triage(&self, stored: &StoredTriage) -> Triage {
        let base = Triage::new(
            stored.triage.id(),
            stored.triage.description(),
            stored.triage.url(),
        );
        let linked = stored
            .ticket_id
            .and_then(|id| self.tickets.get(&id))
            .map(|ticket| LinkedTicket {
                id: ticket.id(),
                url: ticket.url().to_owned(),
            });
        match linked {
            Some(link) => base.with_link(link),
            None => base,
        }
    }
}

/// Strips associations so only the ticket row is stored.
fn row_only(ticket: &Ticket) -> Ticket {
    Ticket::from_persisted(
        ticket.id(),
        ticket.key().clone(),
        ticket.url().to_owned(),
        ticket.details().clone(),
    )
}

fn poisoned(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(err.to_string())
}

impl InMemoryBugStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lenient(&self) -> RwLockReadGuard<'_, InMemoryBugState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lenient(&self) -> RwLockWriteGuard<'_, InMemoryBugState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a known test.
    pub fn add_test(&self, test: TestRef) {
        self.write_lenient().tests.push(test);
    }

    /// Registers a known CI job.
    pub fn add_job(&self, job: JobRef) {
        self.write_lenient().jobs.push(job);
    }

    /// Stores a triage, keeping its link when one is set.
    pub fn add_triage(&self, triage: Triage) {
        let ticket_id = triage.linked().map(|linked| linked.id);
        self.write_lenient()
            .triages
            .insert(triage.id(), StoredTriage { triage, ticket_id });
    }

    /// Stores a ticket row together with its associations.
    pub fn seed_ticket(&self, ticket: &Ticket) {
        let mut state = self.write_lenient();
        let id = ticket.id();
        state.ticket_tests.insert(id, ticket.tests().to_vec());
        state.ticket_jobs.insert(id, ticket.jobs().to_vec());
        state.tickets.insert(id, row_only(ticket));
    }

    /// Returns every stored ticket with its associations, ordered by ID.
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        let state = self.read_lenient();
        state
            .tickets
            .values()
            .map(|row| state.assemble(row))
            .collect()
    }

    /// Returns the triage as currently stored.
    #[must_use]
    pub fn triage(&self, id: TriageId) -> Option<Triage> {
        let state = self.read_lenient();
        state
            .triages
            .get(&id)
            .map(|stored| state.assemble_triage(stored))
    }
}

#[async_trait]
impl TicketRepository for InMemoryBugStore {
    async fn upsert(&self, ticket: &Ticket) -> TicketRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TicketRepositoryError::persistence(poisoned(err)))?;
        state.tickets.insert(ticket.id(), row_only(ticket));
        Ok(())
    }

    async fn replace_tests(
        &self,
        ticket_id: TicketId,
        tests: &[TestRef],
    ) -> TicketRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TicketRepositoryError::persistence(poisoned(err)))?;
        if !state.tickets.contains_key(&ticket_id) {
            return Err(TicketRepositoryError::NotFound(ticket_id));
        }
        state.ticket_tests.insert(ticket_id, tests.to_vec());
        Ok(())
    }

    async fn replace_jobs(
        &self,
        ticket_id: TicketId,
        jobs: &[JobRef],
    ) -> TicketRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TicketRepositoryError::persistence(poisoned(err)))?;
        if !state.tickets.contains_key(&ticket_id) {
            return Err(TicketRepositoryError::NotFound(ticket_id));
        }
        state.ticket_jobs.insert(ticket_id, jobs.to_vec());
        Ok(())
    }

    async fn delete_except(&self, keep: &[TicketId]) -> TicketRepositoryResult<u64> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TicketRepositoryError::persistence(poisoned(err)))?;
        let stale: Vec<TicketId> = state
            .tickets
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();

        for id in &stale {
            state.tickets.remove(id);
            state.ticket_tests.remove(id);
            state.ticket_jobs.remove(id);
        }
        for stored in state.triages.values_mut() {
            if stored.ticket_id.is_some_and(|id| stale.contains(&id)) {
                stored.ticket_id = None;
            }
        }
        Ok(u64::try_from(stale.len()).unwrap_or(u64::MAX))
    }

    async fn find_by_id(&self, id: TicketId) -> TicketRepositoryResult<Option<Ticket>> {
        let state = self
            .state
            .read()
            .map_err(|err| TicketRepositoryError::persistence(poisoned(err)))?;
        Ok(state.tickets.get(&id).map(|row| state.assemble(row)))
    }

    async fn find_by_url(&self, url: &str) -> TicketRepositoryResult<Option<Ticket>> {
        let state = self
            .state
            .read()
            .map_err(|err| TicketRepositoryError::persistence(poisoned(err)))?;
        Ok(state
            .tickets
            .values()
            .find(|row| row.url() == url)
            .map(|row| state.assemble(row)))
    }
}

#[async_trait]
impl TriageRepository for InMemoryBugStore {
    async fn list(&self) -> TriageRepositoryResult<Vec<Triage>> {
        let state = self
            .state
            .read()
            .map_err(|err| TriageRepositoryError::persistence(poisoned(err)))?;
        Ok(state
            .triages
            .values()
            .map(|stored| state.assemble_triage(stored))
            .collect())
    }

    async fn link_ticket(
        &self,
        triage_id: TriageId,
        ticket: &LinkedTicket,
    ) -> TriageRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TriageRepositoryError::persistence(poisoned(err)))?;
        if !state.tickets.contains_key(&ticket.id) {
            return Err(TriageRepositoryError::persistence(poisoned(format!(
                "foreign key violation: ticket {} does not exist",
                ticket.id
            ))));
        }
        let stored = state
            .triages
            .get_mut(&triage_id)
            .ok_or(TriageRepositoryError::NotFound(triage_id))?;
        stored.ticket_id = Some(ticket.id);
        Ok(())
    }

    async fn unlink_ticket(&self, triage_id: TriageId) -> TriageRepositoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| TriageRepositoryError::persistence(poisoned(err)))?;
        let stored = state
            .triages
            .get_mut(&triage_id)
            .ok_or(TriageRepositoryError::NotFound(triage_id))?;
        stored.ticket_id = None;
        Ok(())
    }
}

#[async_trait]
impl ReferenceDataSource for InMemoryBugStore {
    async fn load_test_cache(&self) -> Result<TestCache, ReferenceDataError> {
        let state = self
            .state
            .read()
            .map_err(|err| ReferenceDataError::persistence(poisoned(err)))?;
        Ok(state.tests.iter().cloned().collect())
    }

    async fn load_job_cache(&self) -> Result<JobCache, ReferenceDataError> {
        let state = self
            .state
            .read()
            .map_err(|err| ReferenceDataError::persistence(poisoned(err)))?;
        Ok(state.jobs.iter().cloned().collect())
    }
}
