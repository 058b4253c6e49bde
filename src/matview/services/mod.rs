//! Application services for materialized view refresh.

mod refresher;

pub use refresher::{MaterializedViewRefresher, REFRESH_WORKERS};
