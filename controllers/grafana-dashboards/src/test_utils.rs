//! Test utilities for unit testing the reconciler and informer
//!
//! This module provides helpers for creating test ConfigMaps and a handler
//! that records the informer events it receives.

use crate::reconciler::DASHBOARDS_ANNOTATION;
use crate::watcher::ResourceEventHandler;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Helper to create a test ConfigMap in the `default` namespace
pub fn dashboard_config_map(name: &str, annotation: Option<&str>, data: &[(&str, &str)]) -> ConfigMap {
    namespaced_config_map("default", name, annotation, data)
}

/// Helper to create a test ConfigMap in a given namespace
pub fn namespaced_config_map(
    namespace: &str,
    name: &str,
    annotation: Option<&str>,
    data: &[(&str, &str)],
) -> ConfigMap {
    let annotations = annotation.map(|value| {
        BTreeMap::from([(DASHBOARDS_ANNOTATION.to_string(), value.to_string())])
    });

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            annotations,
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ),
        ..Default::default()
    }
}

/// Informer event as seen by [`RecordingHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Added(String),
    Updated(String),
    Deleted(String),
}

/// Handler that records every event it is given
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<Seen>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<Seen> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, seen: Seen) {
        self.events.lock().unwrap().push(seen);
    }
}

#[async_trait::async_trait]
impl ResourceEventHandler<ConfigMap> for RecordingHandler {
    async fn on_add(&self, obj: &ConfigMap) {
        self.push(Seen::Added(obj.name_any()));
    }

    async fn on_update(&self, _old: &ConfigMap, new: &ConfigMap) {
        self.push(Seen::Updated(new.name_any()));
    }

    async fn on_delete(&self, obj: &ConfigMap) {
        self.push(Seen::Deleted(obj.name_any()));
    }
}
