//! Artifact scans against a bucket laid out on the local filesystem.

use crate::in_memory::helpers::{TempBucket, runtime};
use flakewatch::job_artifacts::{
    adapters::{
        filesystem::FilesystemBlobStore, line_regex::LineRegexMatcher,
        memory::InMemoryJobRunRepository,
    },
    domain::{ArtifactLocation, JobRunId},
    ports::JobRunRecord,
    services::{ArtifactQuery, ArtifactScanError, JobArtifactScanner, ScanSettings},
};
use rstest::rstest;
use serde_json::json;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

const RUN_PREFIX: &str = "logs/periodic-ci-e2e-aws/77/";

type FsScanner = JobArtifactScanner<InMemoryJobRunRepository, FilesystemBlobStore>;

fn scanner(bucket: &TempBucket, max_files: usize) -> eyre::Result<FsScanner> {
    let job_runs = InMemoryJobRunRepository::new();
    job_runs.insert(JobRunRecord {
        id: JobRunId::new(77),
        job_name: "periodic-ci-e2e-aws".to_owned(),
        url: Some(format!(
            "https://prow.ci.example/view/gs/test-platform-results/{RUN_PREFIX}"
        )),
    });
    let settings = ScanSettings {
        location: ArtifactLocation::new(
            "test-platform-results",
            "https://gcsweb-ci.example/gcs",
        ),
        max_files,
        list_timeout: Duration::from_secs(30),
        file_timeout: Duration::from_secs(5),
        concurrency: 4,
    };
    Ok(JobArtifactScanner::new(
        Arc::new(job_runs),
        Arc::new(FilesystemBlobStore::open_root(bucket.path())?),
        settings,
    ))
}

fn populated_bucket() -> eyre::Result<TempBucket> {
    let bucket = TempBucket::create()?;
    bucket.put(
        &format!("{RUN_PREFIX}build-log.txt"),
        "setup ok\npanic: runtime error\nteardown\n",
    )?;
    bucket.put(
        &format!("{RUN_PREFIX}artifacts/e2e/gather-extra/events.json"),
        "{\"reason\":\"BackOff\"}\n",
    )?;
    bucket.put(
        &format!("{RUN_PREFIX}artifacts/e2e/junit_e2e.xml"),
        "<testcase name=\"a\"/>\n<failure>panic: timeout</failure>\n",
    )?;
    bucket.put("logs/periodic-ci-e2e-aws/78/build-log.txt", "panic: other run\n")?;
    Ok(bucket)
}

#[rstest]
fn scan_matches_lines_in_every_run_file(runtime: io::Result<Runtime>) -> eyre::Result<()> {
    let rt = runtime?;
    let bucket = populated_bucket()?;
    let query =
        ArtifactQuery::list_only().with_matcher(Arc::new(LineRegexMatcher::new("panic:", 10)?));

    let result = rt.block_on(scanner(&bucket, 100)?.scan_job_run(
        JobRunId::new(77),
        &query,
        &CancellationToken::new(),
    ))?;

    assert_eq!(result.id, "77");
    assert_eq!(result.job_name, "periodic-ci-e2e-aws");
    assert!(!result.artifact_list_truncated);
    let urls: Vec<&str> = result
        .artifacts
        .iter()
        .map(|artifact| artifact.artifact_url.as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://gcsweb-ci.example/gcs/test-platform-results/logs/periodic-ci-e2e-aws/77/artifacts/e2e/gather-extra/events.json",
            "https://gcsweb-ci.example/gcs/test-platform-results/logs/periodic-ci-e2e-aws/77/artifacts/e2e/junit_e2e.xml",
            "https://gcsweb-ci.example/gcs/test-platform-results/logs/periodic-ci-e2e-aws/77/build-log.txt",
        ]
    );
    let matches: Vec<_> = result
        .artifacts
        .iter()
        .map(|artifact| artifact.matched_content.clone())
        .collect();
    assert_eq!(
        matches,
        vec![
            Some(json!({ "lines": [], "truncated": false })),
            Some(json!({ "lines": ["<failure>panic: timeout</failure>"], "truncated": false })),
            Some(json!({ "lines": ["panic: runtime error"], "truncated": false })),
        ]
    );
    assert!(result.artifacts.iter().all(|artifact| artifact.error.is_none()));
    Ok(())
}

#[rstest]
fn glob_and_cap_limit_the_listing(runtime: io::Result<Runtime>) -> eyre::Result<()> {
    let rt = runtime?;
    let bucket = populated_bucket()?;
    let scan = scanner(&bucket, 1)?;

    let listing = rt.block_on(scan.list_artifacts(
        RUN_PREFIX,
        Some("artifacts/**"),
        &CancellationToken::new(),
    ))?;

    assert!(listing.truncated);
    assert_eq!(
        listing.paths,
        vec![format!("{RUN_PREFIX}artifacts/e2e/gather-extra/events.json")]
    );
    Ok(())
}

#[rstest]
fn cancelled_scan_returns_no_results(runtime: io::Result<Runtime>) -> eyre::Result<()> {
    let rt = runtime?;
    let bucket = populated_bucket()?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = rt.block_on(scanner(&bucket, 100)?.scan_job_run(
        JobRunId::new(77),
        &ArtifactQuery::list_only(),
        &cancel,
    ));

    assert!(matches!(result, Err(ArtifactScanError::Cancelled)));
    Ok(())
}
