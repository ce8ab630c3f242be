//! Grafana Dashboards Controller
//!
//! Watches ConfigMaps in every namespace and, for those annotated with
//! `grafana.net/dashboards: "true"`, pushes each data entry into Grafana:
//! entries whose key contains `datasource.json` become datasources, every
//! other entry is imported as a dashboard.
//!
//! Sync is one-way and happens when a ConfigMap is first seen. Updates and
//! deletions in the cluster are not propagated.

mod config;
mod controller;
mod error;
mod reconciler;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::{Config, GrafanaCredentials, resync_period_from_env};
use crate::controller::{Controller, shutdown_signal};
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Informer;
use clap::Parser;
use grafana_client::{GrafanaClient, GrafanaClientTrait};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Upper bound on the startup connectivity check.
const GRAFANA_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Connectivity check only; Grafana may come up after the controller.
async fn check_grafana_connectivity(grafana: &dyn GrafanaClientTrait) {
    match tokio::time::timeout(GRAFANA_CHECK_TIMEOUT, grafana.search_dashboards()).await {
        Ok(Ok(dashboards)) => info!("Grafana reachable, {} dashboards present", dashboards.len()),
        Ok(Err(e)) => warn!("Grafana not reachable yet (continuing): {}", e),
        Err(_) => warn!(
            "Grafana did not answer within {:?} (continuing)",
            GRAFANA_CHECK_TIMEOUT
        ),
    }
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    info!("Starting Grafana Dashboards Controller");

    let config = Config::parse();
    let grafana_url = config.grafana_base_url(&GrafanaCredentials::from_env())?;
    let grafana = GrafanaClient::new(grafana_url)?;
    let resync_period = resync_period_from_env()?;

    info!("Configuration:");
    info!("  Grafana URL: {}", grafana.base_url());
    info!(
        "  Kubernetes credentials: {}",
        if config.run_outside_cluster { "local kubeconfig" } else { "in-cluster" }
    );
    info!("  Resync period: {:?}", resync_period);

    let kube_client = config.kube_client().await?;

    check_grafana_connectivity(&grafana).await;
    let config_maps: Api<ConfigMap> = Api::all(kube_client);

    let reconciler = Arc::new(Reconciler::new(Arc::new(grafana)));
    let controller = Controller::start(
        Informer::for_api(config_maps).with_resync_period(resync_period),
        reconciler,
    );
    controller.run_until(shutdown_signal()).await
}
