//! Scripted in-memory warehouse.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::bug_mapping::{
    domain::TicketRow,
    ports::{
        MappingSource, TicketRowStream, TicketWarehouse, WarehouseError, WarehouseQuery,
        WarehouseResult,
    },
};

/// Warehouse returning canned rows per [`MappingSource`].
///
/// Triage-key queries only return rows whose key is listed in the query's
/// `keys` parameter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWarehouse {
    state: Arc<RwLock<WarehouseState>>,
}

#[derive(Debug, Default)]
struct WarehouseState {
    rows: HashMap<MappingSource, Vec<WarehouseResult<TicketRow>>>,
    failing_queries: HashMap<MappingSource, WarehouseError>,
    executed: Vec<WarehouseQuery>,
}

impl InMemoryWarehouse {
    /// Creates a warehouse with no rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row to the result of `source` queries.
    pub fn push_row(&self, source: MappingSource, row: TicketRow) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .entry(source)
            .or_default()
            .push(Ok(row));
    }

    /// Appends an iteration error to the result of `source` queries.
    pub fn push_error(&self, source: MappingSource, error: WarehouseError) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .entry(source)
            .or_default()
            .push(Err(error));
    }

    /// Makes `source` queries fail before returning any rows.
    pub fn fail_query(&self, source: MappingSource, error: WarehouseError) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .failing_queries
            .insert(source, error);
    }

    /// Returns the queries executed so far.
    #[must_use]
    pub fn executed_queries(&self) -> Vec<WarehouseQuery> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .executed
            .clone()
    }
}

fn key_filter(query: &WarehouseQuery) -> Option<Vec<String>> {
    (query.source() == MappingSource::TriageKeys)
        .then(|| query.parameter("keys").map(<[String]>::to_vec).unwrap_or_default())
}

#[async_trait]
impl TicketWarehouse for InMemoryWarehouse {
    async fn query(&self, query: &WarehouseQuery) -> WarehouseResult<TicketRowStream> {
        let mut state = self
            .state
            .write()
            .map_err(|err| WarehouseError::query(std::io::Error::other(err.to_string())))?;
        state.executed.push(query.clone());
        if let Some(error) = state.failing_queries.get(&query.source()) {
            return Err(error.clone());
        }

        let keys = key_filter(query);
        let rows: Vec<WarehouseResult<TicketRow>> = state
            .rows
            .get(&query.source())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|row| match (&keys, row) {
                (Some(allowed), Ok(ticket_row)) => allowed.contains(&ticket_row.key),
                _ => true,
            })
            .collect();
        Ok(stream::iter(rows).boxed())
    }
}
