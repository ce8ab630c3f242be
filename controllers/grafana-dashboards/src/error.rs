//! Controller-specific error types.
//!
//! This module defines error types specific to the Grafana dashboards
//! controller that are not covered by upstream library errors.

use grafana_client::GrafanaError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Grafana dashboards controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Kubernetes client configuration could not be loaded
    #[error("Kubernetes configuration error: {0}")]
    KubeConfig(String),

    /// Grafana API error
    #[error("Grafana error: {0}")]
    Grafana(#[from] GrafanaError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
