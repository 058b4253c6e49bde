//! Refreshes the configured materialized views once.
//!
//! Usage:
//!
//! ```text
//! refresh_views [config-path]
//! ```
//!
//! Without a path the built-in defaults are used. `FLAKEWATCH_DATABASE_URL`
//! and `FLAKEWATCH_PUSHGATEWAY` override the file. A representative
//! configuration is:
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/flakewatch"
//!
//! [views]
//! names = ["prow_test_report_7d_matview", "prow_job_runs_report_matview"]
//! only_if_empty = false
//!
//! [metrics]
//! pushgateway_url = "http://pushgateway:9091"
//! ```
//!
//! The process exits non-zero when any view could not be refreshed by either
//! strategy.

use camino::Utf8PathBuf;
use flakewatch::config::FlakewatchConfig;
use flakewatch::matview::adapters::postgres::PostgresViewStore;
use flakewatch::matview::adapters::pushgateway::PushGatewaySink;
use flakewatch::matview::domain::ViewName;
use flakewatch::matview::services::MaterializedViewRefresher;
use flakewatch::postgres::build_pool;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that stop the refresh before or after it runs.
#[derive(Debug, Error)]
enum RefreshViewsError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("failed to load configuration: {0}")]
    Config(#[from] flakewatch::config::ConfigError),
    #[error("invalid view name: {0}")]
    ViewName(#[from] flakewatch::matview::domain::MatviewDomainError),
    #[error("failed to connect to the database: {0}")]
    Database(#[source] diesel::r2d2::PoolError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("{0} materialized view(s) failed to refresh")]
    ViewsFailed(usize),
}

fn main() -> Result<(), BoxError> {
    init_tracing();
    run(env::args().skip(1)).map_err(Into::into)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: impl Iterator<Item = String>) -> Result<(), RefreshViewsError> {
    let config = load_config(parse_args(args)?)?;
    let views = config
        .views
        .names
        .iter()
        .map(ViewName::new)
        .collect::<Result<Vec<_>, _>>()?;
    if views.is_empty() {
        warn!("no materialized views configured");
        return Ok(());
    }

    let pool = build_pool(&config.database).map_err(RefreshViewsError::Database)?;
    let mut refresher = MaterializedViewRefresher::new(Arc::new(PostgresViewStore::new(pool)));
    if let Some(gateway) = config.metrics.pushgateway_url.as_deref() {
        match PushGatewaySink::new(gateway, &config.metrics.job_name) {
            Ok(sink) => refresher = refresher.with_metrics_sink(Arc::new(sink)),
            Err(err) => warn!(error = %err, "metrics push disabled"),
        }
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(RefreshViewsError::RuntimeInit)?;
    let report = runtime.block_on(refresher.refresh_all(&views, config.views.only_if_empty));

    info!(
        views = report.records.len(),
        refreshed = report.refreshed().count(),
        total_ms = report.total.as_millis(),
        "materialized view refresh complete"
    );
    match report.failed_count() {
        0 => Ok(()),
        failed => Err(RefreshViewsError::ViewsFailed(failed)),
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Utf8PathBuf>, RefreshViewsError> {
    let config_path = args.next().map(Utf8PathBuf::from);
    if let Some(extra) = args.next() {
        return Err(RefreshViewsError::InvalidArgs(format!(
            "unexpected extra argument: {extra}"
        )));
    }
    Ok(config_path)
}

fn load_config(path: Option<Utf8PathBuf>) -> Result<FlakewatchConfig, RefreshViewsError> {
    let base = match path {
        Some(config_path) => FlakewatchConfig::load(config_path)?,
        None => FlakewatchConfig::default(),
    };
    Ok(base.with_env_overrides(|key| env::var(key).ok()))
}
