//! Adapter implementations for ticket reconciliation ports.

pub mod memory;
pub mod postgres;
