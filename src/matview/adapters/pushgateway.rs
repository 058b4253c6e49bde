//! Prometheus push gateway sink for refresh timings.

use crate::matview::{
    domain::RefreshReport,
    ports::{MetricsPushError, RefreshMetricsSink},
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Per-view refresh time metric.
pub const VIEW_REFRESH_METRIC: &str = "flakewatch_matview_refresh_millis";

/// Whole-batch refresh time metric.
pub const ALL_VIEWS_REFRESH_METRIC: &str = "flakewatch_all_matviews_refresh_millis";

const PUSH_TIMEOUT: Duration = Duration::from_secs(10);
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Pushes refresh timings to a Prometheus push gateway.
///
/// Metrics are sent with `POST`, replacing only same-named metrics in the
/// job's group.
#[derive(Debug, Clone)]
pub struct PushGatewaySink {
    client: reqwest::Client,
    endpoint: String,
}

impl PushGatewaySink {
    /// Creates a sink for `job` on the gateway at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsPushError::Configuration`] when the URL or job name
    /// is blank, or when the HTTP client cannot be built.
    pub fn new(base_url: &str, job: &str) -> Result<Self, MetricsPushError> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() || job.trim().is_empty() {
            return Err(MetricsPushError::Configuration(
                "push gateway url and job name must not be blank".to_owned(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .map_err(|err| MetricsPushError::Configuration(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{base}/metrics/job/{}", job.trim()),
        })
    }

    /// Returns the URL metrics are pushed to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RefreshMetricsSink for PushGatewaySink {
    async fn push(&self, report: &RefreshReport) -> Result<(), MetricsPushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)
            .body(render_exposition(report))
            .send()
            .await
            .map_err(MetricsPushError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetricsPushError::Rejected {
                status: status.as_u16(),
            });
        }
        info!(endpoint = %self.endpoint, "pushed refresh metrics");
        Ok(())
    }
}

/// Renders `report` in the Prometheus text exposition format.
///
/// Only views that were actually refreshed get a per-view sample.
#[must_use]
pub fn render_exposition(report: &RefreshReport) -> String {
    let mut body = format!("# TYPE {VIEW_REFRESH_METRIC} gauge\n");
    for record in report.refreshed() {
        body.push_str(&format!(
            "{VIEW_REFRESH_METRIC}{{view=\"{}\"}} {}\n",
            escape_label(record.view.as_str()),
            record.elapsed.as_millis(),
        ));
    }
    body.push_str(&format!(
        "# TYPE {ALL_VIEWS_REFRESH_METRIC} gauge\n{ALL_VIEWS_REFRESH_METRIC} {}\n",
        report.total.as_millis(),
    ));
    body
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
