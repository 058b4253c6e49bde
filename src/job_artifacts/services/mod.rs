//! Application services for job artifact scanning.

mod deadline;
mod scanner;

pub use scanner::{ArtifactQuery, ArtifactScanError, JobArtifactScanner, ScanSettings};
