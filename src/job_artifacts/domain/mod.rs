//! Domain types for job run artifacts.

mod artifact;
mod error;
mod location;

pub use artifact::{ArtifactListing, JobRunArtifact, JobRunArtifacts, JobRunId};
pub use error::JobArtifactsDomainError;
pub use location::ArtifactLocation;
