//! Port contracts for materialized view refresh.

mod metrics;
mod store;

pub use metrics::{MetricsPushError, RefreshMetricsSink};
pub use store::{RefreshMode, ViewStore, ViewStoreError, ViewStoreResult};
