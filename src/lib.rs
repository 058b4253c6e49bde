//! Flakewatch: test-reliability data reconciliation.
//!
//! This crate keeps a local PostgreSQL store of CI test reliability data
//! consistent with its external sources and query-fast for reports.
//!
//! # Architecture
//!
//! Flakewatch follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, blob stores, etc.)
//!
//! # Modules
//!
//! - [`bug_mapping`]: Reconciles defect-tracker tickets from the analytics warehouse
//! - [`matview`]: Bounded concurrent refresh of materialized views
//! - [`job_artifacts`]: Best-effort scanning of CI job run artifacts
//! - [`refresh`]: Sequencing of loaders and view refreshes
//! - [`config`]: TOML configuration with environment overrides

pub mod bug_mapping;
pub mod config;
pub mod job_artifacts;
pub mod matview;
pub mod postgres;
pub mod refresh;
