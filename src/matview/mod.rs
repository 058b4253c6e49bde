//! Materialized view refresh.
//!
//! Views are refreshed by a small fixed pool of workers pulling names from a
//! shared queue. Each view is first refreshed without locking readers; when
//! that fails the same worker falls back to a blocking refresh of that view
//! only. Timings are reported per view and for the whole batch, and can be
//! pushed to a metrics sink.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
