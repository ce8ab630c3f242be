//! Grafana API models
//!
//! See: http://docs.grafana.org/http_api/dashboard/#search-dashboards

use serde::{Deserialize, Serialize};

/// Prefix Grafana puts in front of the slug in search result URIs
const DB_URI_PREFIX: &str = "db/";

/// Dashboard entry returned by `/api/search`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRecord {
    /// Identifier assigned by Grafana
    pub id: i64,
    /// Display name
    #[serde(default)]
    pub title: String,
    /// Grafana-internal path, `db/<slug>`
    #[serde(default)]
    pub uri: String,
}

impl DashboardRecord {
    /// Slug used to address the dashboard for deletion.
    ///
    /// The search result `uri` is `db/<slug>`; URIs without that prefix are
    /// returned as-is.
    pub fn slug(&self) -> &str {
        self.uri.strip_prefix(DB_URI_PREFIX).unwrap_or(&self.uri)
    }
}
