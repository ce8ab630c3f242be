//! Reconciliation logic for dashboard ConfigMaps.
//!
//! A ConfigMap is in scope when its `grafana.net/dashboards` annotation
//! parses as `true`. Every data entry of an in-scope ConfigMap is pushed to
//! Grafana: keys containing `datasource.json` become datasources, all other
//! keys are imported as dashboards. Entries are independent; a failed entry
//! is logged and the rest are still processed.

use crate::watcher::ResourceEventHandler;
use grafana_client::{GrafanaClientTrait, GrafanaError};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Annotation that marks a ConfigMap as carrying Grafana content
pub const DASHBOARDS_ANNOTATION: &str = "grafana.net/dashboards";

/// Data keys containing this marker are datasource definitions
pub const DATASOURCE_KEY_MARKER: &str = "datasource.json";

/// What a ConfigMap data entry holds, decided by its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Datasource,
    Dashboard,
}

impl EntryKind {
    pub fn classify(key: &str) -> Self {
        if key.contains(DATASOURCE_KEY_MARKER) {
            EntryKind::Datasource
        } else {
            EntryKind::Dashboard
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Datasource => f.write_str("datasource"),
            EntryKind::Dashboard => f.write_str("dashboard"),
        }
    }
}

/// Result of pushing one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    Success,
    Failure(String),
}

/// Per-entry outcome. Only used for logging and tests, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub entry_key: String,
    pub kind: EntryKind,
    pub result: SyncResult,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        self.result == SyncResult::Success
    }
}

/// Parse a boolean the way the annotation has always been read:
/// `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Whether the ConfigMap opted in via [`DASHBOARDS_ANNOTATION`].
///
/// A missing or unparseable annotation is the same as `false`.
pub fn dashboards_enabled(config_map: &ConfigMap) -> bool {
    config_map
        .annotations()
        .get(DASHBOARDS_ANNOTATION)
        .and_then(|value| parse_bool(value))
        .unwrap_or(false)
}

/// Pushes dashboard ConfigMaps into Grafana.
pub struct Reconciler {
    grafana: Arc<dyn GrafanaClientTrait>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(grafana: Arc<dyn GrafanaClientTrait>) -> Self {
        Self { grafana }
    }

    /// Pushes every data entry of an opted-in ConfigMap to Grafana.
    ///
    /// Out-of-scope ConfigMaps are skipped without any Grafana call. Entries
    /// are processed one after another; a failure never stops the others.
    pub async fn create_dashboards(&self, config_map: &ConfigMap) -> Vec<SyncOutcome> {
        let name = config_map.name_any();

        if !dashboards_enabled(config_map) {
            if let Some(raw) = config_map.annotations().get(DASHBOARDS_ANNOTATION) {
                debug!("ConfigMap {} has {}={:?}", name, DASHBOARDS_ANNOTATION, raw);
            }
            info!("Skipping configmap: {}", name);
            return Vec::new();
        }

        let Some(data) = config_map.data.as_ref() else {
            info!("ConfigMap {} has no data entries", name);
            return Vec::new();
        };

        let mut outcomes = Vec::with_capacity(data.len());
        for (key, value) in data {
            outcomes.push(self.sync_entry(&name, key, value).await);
        }

        let failed: Vec<String> = outcomes
            .iter()
            .filter_map(|o| match &o.result {
                SyncResult::Failure(reason) => Some(format!("{} {} ({})", o.kind, o.entry_key, reason)),
                SyncResult::Success => None,
            })
            .collect();
        if failed.is_empty() {
            debug!("ConfigMap {}: all {} entries created", name, outcomes.len());
        } else {
            error!(
                "ConfigMap {}: {} of {} entries failed: {}",
                name,
                failed.len(),
                outcomes.len(),
                failed.join(", ")
            );
        }

        outcomes
    }

    async fn sync_entry(&self, config_map: &str, key: &str, value: &str) -> SyncOutcome {
        let kind = EntryKind::classify(key);
        debug!("key: {}; value: {}", key, value);
        info!("Creating {}: {}", kind, key);

        let result: Result<(), GrafanaError> = match kind {
            EntryKind::Datasource => self.grafana.create_datasource(value).await,
            EntryKind::Dashboard => self.grafana.create_dashboard(value).await,
        };

        let result = match result {
            Ok(()) => {
                info!("Created {}", key);
                SyncResult::Success
            }
            Err(e) => {
                error!("Failed to create {} {} from ConfigMap {}: {}", kind, key, config_map, e);
                SyncResult::Failure(e.to_string())
            }
        };

        SyncOutcome {
            entry_key: key.to_string(),
            kind,
            result,
        }
    }
}

#[async_trait::async_trait]
impl ResourceEventHandler<ConfigMap> for Reconciler {
    async fn on_add(&self, config_map: &ConfigMap) {
        self.create_dashboards(config_map).await;
    }
}
