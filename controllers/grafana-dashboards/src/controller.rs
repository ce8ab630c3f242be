//! Main controller implementation.
//!
//! This module contains the `Controller` struct that runs the ConfigMap
//! informer on a background task and coordinates shutdown: once the
//! shutdown signal fires, no new events are accepted, the event being
//! handled is allowed to finish, and the task is awaited before returning.

use crate::error::ControllerError;
use crate::watcher::{Informer, ResourceEventHandler};
use kube::Resource;
use std::future::Future;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Main controller for Grafana dashboard sync.
#[derive(Debug)]
pub struct Controller {
    cancel: CancellationToken,
    informer: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Starts the informer in a background task, delivering to `handler`.
    pub fn start<K, H>(informer: Informer<K>, handler: Arc<H>) -> Self
    where
        K: Resource + Clone + Send + Sync + 'static,
        H: ResourceEventHandler<K> + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.child_token();

        let informer = tokio::spawn(async move { informer.run(handler.as_ref(), token).await });

        Self { cancel, informer }
    }

    /// Runs the controller until `shutdown` resolves.
    ///
    /// Returns early with an error if the informer task exits on its own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ControllerError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            cancel,
            mut informer,
        } = self;

        info!("Grafana Dashboards Controller running");

        tokio::select! {
            () = shutdown => {}
            result = &mut informer => {
                error!("ConfigMap informer exited before shutdown");
                return joined(result);
            }
        }

        info!("Shutting down...");
        cancel.cancel();
        let result = joined(informer.await);
        info!("ConfigMap informer stopped");
        result
    }
}

fn joined(result: Result<Result<(), ControllerError>, JoinError>) -> Result<(), ControllerError> {
    result.map_err(|e| ControllerError::Watch(format!("ConfigMap informer panicked: {}", e)))?
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
