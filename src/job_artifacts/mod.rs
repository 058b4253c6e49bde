//! Job run artifact scanning.
//!
//! A job run's stored URL is resolved to an object prefix in the artifact
//! bucket. Objects under that prefix are listed within a count cap and a
//! wall-clock limit, and each listed file can be fed to a pluggable
//! [`ports::ContentMatcher`]. A failure on one file is recorded on that
//! file's result, next to any partial matches, and never stops the others.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
