//! Warehouse query text for the three ticket mapping sources.

use crate::bug_mapping::ports::{MappingSource, WarehouseQuery};
use crate::config::WarehouseConfig;

/// Name of the array parameter carrying triage ticket keys.
pub const TRIAGE_KEYS_PARAMETER: &str = "keys";

const LINK_NAME_PROJECTION: &str = "  j.name AS link_name,\n";

/// Renders the warehouse queries from configured table names and filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQueries {
    tickets_table: String,
    test_mapping_table: String,
    jobs_table: String,
    lookback_days: u32,
    excluded_test_names: Vec<String>,
}

impl TicketQueries {
    /// Builds query settings from warehouse configuration.
    #[must_use]
    pub fn from_config(config: &WarehouseConfig) -> Self {
        Self {
            tickets_table: config.tickets_table.clone(),
            test_mapping_table: config.test_mapping_table.clone(),
            jobs_table: config.jobs_table.clone(),
            lookback_days: config.lookback_days,
            excluded_test_names: config.excluded_test_names.clone(),
        }
    }

    /// Query matching tickets that mention a known test name.
    #[must_use]
    pub fn test_mentions(&self) -> WarehouseQuery {
        let mut predicates: Vec<String> = self
            .excluded_test_names
            .iter()
            .map(|name| format!("j.name != {}", quote_literal(name)))
            .collect();
        predicates.push(MENTION_PREDICATE.to_owned());
        let sql = format!(
            "{} CROSS JOIN `{}` j WHERE {}",
            self.ticket_projection(true),
            self.test_mapping_table,
            predicates.join(" AND "),
        );
        WarehouseQuery::new(MappingSource::TestMentions, sql)
    }

    /// Query matching tickets that mention a known job name.
    #[must_use]
    pub fn job_mentions(&self) -> WarehouseQuery {
        let sql = format!(
            concat!(
                "{} CROSS JOIN (SELECT DISTINCT prowjob_job_name AS name FROM `{}` ",
                "WHERE prowjob_job_name IS NOT NULL AND prowjob_job_name != \"\") j WHERE {}",
            ),
            self.ticket_projection(true),
            self.jobs_table,
            MENTION_PREDICATE,
        );
        WarehouseQuery::new(MappingSource::JobMentions, sql)
    }

    /// Query fetching exactly the tickets named by `keys`.
    #[must_use]
    pub fn triage_keys(&self, keys: Vec<String>) -> WarehouseQuery {
        let sql = format!(
            "{} WHERE t.issue.key IN UNNEST(@{TRIAGE_KEYS_PARAMETER})",
            self.ticket_projection(false),
        );
        WarehouseQuery::new(MappingSource::TriageKeys, sql)
            .with_parameter(TRIAGE_KEYS_PARAMETER, keys)
    }

    fn ticket_projection(&self, with_link_name: bool) -> String {
        let link_name = if with_link_name {
            LINK_NAME_PROJECTION
        } else {
            ""
        };
        format!(
            concat!(
                "WITH TicketData AS (\n",
                "  SELECT t.*, c.message AS comment\n",
                "  FROM `{table}` t\n",
                "  LEFT JOIN UNNEST(t.comments) AS c\n",
                "  WHERE t.summary IS NOT NULL\n",
                "    AND last_changed_time >= TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL {days} DAY)\n",
                ")\n",
                "SELECT\n",
                "  t.issue.key AS key,\n",
                "  t.issue.id AS jira_id,\n",
                "  t.summary AS summary,\n",
                "{link_name}",
                "  t.last_changed_time AS last_changed_time,\n",
                "  t.status.name AS status,\n",
                "  ARRAY(SELECT name FROM UNNEST(affects_versions)) AS affects_versions,\n",
                "  ARRAY(SELECT name FROM UNNEST(fix_versions)) AS fix_versions,\n",
                "  ARRAY(SELECT name FROM UNNEST(target_versions)) AS target_versions,\n",
                "  ARRAY(SELECT name FROM UNNEST(components)) AS components,\n",
                "  t.labels AS labels\n",
                "FROM TicketData t",
            ),
            table = self.tickets_table,
            days = self.lookback_days,
            link_name = link_name,
        )
    }
}

impl Default for TicketQueries {
    fn default() -> Self {
        Self::from_config(&WarehouseConfig::default())
    }
}

const MENTION_PREDICATE: &str = concat!(
    "(STRPOS(t.summary, j.name) > 0 OR STRPOS(t.description, j.name) > 0 ",
    "OR STRPOS(t.comment, j.name) > 0)",
);

fn quote_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
