//! Adapter implementations for job artifact scanning.

pub mod filesystem;
pub mod line_regex;
pub mod memory;
pub mod postgres;
