//! Runtime configuration for reconciliation, view refresh, and artifact
//! scanning.
//!
//! Configuration is read from TOML. Every section and field has a default so
//! a partial file (or no file at all) yields a usable configuration.
//! Selected values can be overridden from the environment through
//! [`FlakewatchConfig::with_env_overrides`].

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding [`DatabaseConfig::url`].
pub const DATABASE_URL_ENV: &str = "FLAKEWATCH_DATABASE_URL";

/// Environment variable overriding [`MetricsConfig::pushgateway_url`].
pub const PUSHGATEWAY_ENV: &str = "FLAKEWATCH_PUSHGATEWAY";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlakewatchConfig {
    /// Relational store connection settings.
    pub database: DatabaseConfig,
    /// Analytics warehouse query settings.
    pub warehouse: WarehouseConfig,
    /// Defect tracker settings.
    pub tracker: TrackerConfig,
    /// Materialized views refreshed after reconciliation.
    pub views: ViewsConfig,
    /// Optional metrics push gateway.
    pub metrics: MetricsConfig,
    /// Job artifact scanning limits.
    pub artifacts: ArtifactsConfig,
}

impl FlakewatchConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not valid TOML or a
    /// field has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its content is invalid.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let file_path = path.as_ref();
        let read_error = |source: std::io::Error| ConfigError::Read {
            path: file_path.to_string(),
            source,
        };
        let parent = file_path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = file_path.file_name().ok_or_else(|| {
            read_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no file name",
            ))
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let text = dir.read_to_string(file_name).map_err(read_error)?;
        Self::from_toml_str(&text)
    }

    /// Applies environment overrides using the supplied lookup.
    ///
    /// The lookup is usually `|key| std::env::var(key).ok()`. Empty values are
    /// ignored.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = non_empty(DATABASE_URL_ENV) {
            self.database.url = url;
        }
        if let Some(gateway) = non_empty(PUSHGATEWAY_ENV) {
            self.metrics.pushgateway_url = Some(gateway);
        }
        self
    }
}

/// Relational store connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/flakewatch".to_owned(),
            pool_size: 8,
        }
    }
}

/// Analytics warehouse query settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Only tickets changed within this many days are mapped.
    pub lookback_days: u32,
    /// Test names never matched against ticket text.
    pub excluded_test_names: Vec<String>,
    /// Deadline for the warehouse fetch phase of a run, including row iteration.
    pub query_timeout_secs: u64,
    /// Fully qualified ticket table.
    pub tickets_table: String,
    /// Fully qualified table of known test names.
    pub test_mapping_table: String,
    /// Fully qualified table of CI job runs carrying job names.
    pub jobs_table: String,
}

impl WarehouseConfig {
    /// Returns the fetch phase deadline.
    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            excluded_test_names: vec!["upgrade".to_owned()],
            query_timeout_secs: 600,
            tickets_table: "openshift-ci-data-analysis.jira_data.tickets_dedup".to_owned(),
            test_mapping_table: "openshift-gce-devel.ci_analysis_us.component_mapping_latest"
                .to_owned(),
            jobs_table: "openshift-gce-devel.ci_analysis_us.jobs".to_owned(),
        }
    }
}

/// Defect tracker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base URL; ticket URLs are `<base_url>/browse/<key>`.
    pub base_url: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://issues.redhat.com".to_owned(),
        }
    }
}

/// Materialized view refresh settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// View names in refresh submission order.
    pub names: Vec<String>,
    /// Refresh only views that currently have no rows.
    pub only_if_empty: bool,
}

/// Metrics push settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus push gateway base URL. Metrics are not pushed when unset.
    pub pushgateway_url: Option<String>,
    /// Job label used when pushing.
    pub job_name: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            pushgateway_url: None,
            job_name: "flakewatch-matviews".to_owned(),
        }
    }
}

/// Job artifact scanning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Bucket root marker found in stored job run URLs.
    pub bucket_root: String,
    /// Public artifact browser base; artifact URLs are
    /// `<artifact_url_base>/<bucket_root>/<path>`.
    pub artifact_url_base: String,
    /// Maximum objects listed for a single job run.
    pub max_files: usize,
    /// Deadline for listing a job run's objects.
    pub list_timeout_secs: u64,
    /// Deadline for opening and matching a single object.
    pub file_timeout_secs: u64,
    /// Maximum objects scanned concurrently for one job run.
    pub scan_concurrency: usize,
}

impl ArtifactsConfig {
    /// Returns the listing deadline.
    #[must_use]
    pub const fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    /// Returns the per-object deadline.
    #[must_use]
    pub const fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            bucket_root: "test-platform-results".to_owned(),
            artifact_url_base: "https://gcsweb-ci.apps.ci.l2s4.p1.openshiftapps.com/gcs"
                .to_owned(),
            max_files: 500,
            list_timeout_secs: 30,
            file_timeout_secs: 60,
            scan_concurrency: 8,
        }
    }
}
