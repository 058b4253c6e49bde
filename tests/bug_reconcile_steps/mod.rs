//! Step definitions for ticket reconciliation scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
