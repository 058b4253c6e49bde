//! Adapter implementations for materialized view refresh.

pub mod memory;
pub mod postgres;
pub mod pushgateway;
