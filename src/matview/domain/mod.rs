//! Domain types for materialized view refresh.

mod error;
mod report;
mod view;

pub use error::MatviewDomainError;
pub use report::{RefreshReport, ViewRefreshOutcome, ViewRefreshRecord};
pub use view::ViewName;
