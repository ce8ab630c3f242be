//! GrafanaClient trait for mocking
//!
//! This trait abstracts the GrafanaClient so the reconciler can be tested
//! against an in-memory implementation.

use crate::error::GrafanaError;
use crate::models::DashboardRecord;

/// Trait for Grafana API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Payloads are passed through to Grafana unmodified.
#[async_trait::async_trait]
pub trait GrafanaClientTrait: Send + Sync {
    /// List dashboards known to Grafana
    async fn search_dashboards(&self) -> Result<Vec<DashboardRecord>, GrafanaError>;

    /// Import a dashboard from its raw JSON definition
    async fn create_dashboard(&self, payload: &str) -> Result<(), GrafanaError>;

    /// Create a datasource from its raw JSON definition
    async fn create_datasource(&self, payload: &str) -> Result<(), GrafanaError>;

    /// Delete the dashboard addressed by `slug`
    async fn delete_dashboard(&self, slug: &str) -> Result<(), GrafanaError>;
}
