//! Mock GrafanaClient for unit testing
//!
//! This module provides a mock implementation of GrafanaClientTrait that
//! records every call and can be told to reject specific operations, so
//! callers can be tested without a running Grafana instance.

use crate::error::GrafanaError;
use crate::grafana_trait::GrafanaClientTrait;
use crate::models::DashboardRecord;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Grafana API operation, as seen by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `search_dashboards`
    SearchDashboards,
    /// `create_dashboard`
    CreateDashboard,
    /// `create_datasource`
    CreateDatasource,
    /// `delete_dashboard`
    DeleteDashboard,
}

/// A call observed by the mock, with its argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Which operation was called
    pub operation: Operation,
    /// Payload for create calls, slug for deletes, empty for searches
    pub argument: String,
}

/// Mock GrafanaClient for testing
///
/// Clones share the same call log and configuration.
#[derive(Debug, Clone, Default)]
pub struct MockGrafanaClient {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failures: Arc<Mutex<HashMap<Operation, u16>>>,
    dashboards: Arc<Mutex<Vec<DashboardRecord>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockGrafanaClient {
    /// Create a new mock client that accepts every call
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail with HTTP `status` (for test setup)
    pub fn fail_with(&self, operation: Operation, status: u16) {
        lock(&self.failures).insert(operation, status);
    }

    /// Add a dashboard to the mock store (for test setup)
    pub fn add_dashboard(&self, dashboard: DashboardRecord) {
        lock(&self.dashboards).push(dashboard);
    }

    /// All calls in the order they were made
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Arguments of the calls made to `operation`
    pub fn calls_to(&self, operation: Operation) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.operation == operation)
            .map(|call| call.argument.clone())
            .collect()
    }

    fn record(&self, operation: Operation, argument: &str) -> Result<(), GrafanaError> {
        lock(&self.calls).push(RecordedCall {
            operation,
            argument: argument.to_string(),
        });

        match lock(&self.failures).get(&operation) {
            Some(&status) => Err(GrafanaError::UnexpectedStatus {
                status,
                status_text: format!("{} Mock Failure", status),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl GrafanaClientTrait for MockGrafanaClient {
    async fn search_dashboards(&self) -> Result<Vec<DashboardRecord>, GrafanaError> {
        self.record(Operation::SearchDashboards, "")?;
        Ok(lock(&self.dashboards).clone())
    }

    async fn create_dashboard(&self, payload: &str) -> Result<(), GrafanaError> {
        self.record(Operation::CreateDashboard, payload)
    }

    async fn create_datasource(&self, payload: &str) -> Result<(), GrafanaError> {
        self.record(Operation::CreateDatasource, payload)
    }

    async fn delete_dashboard(&self, slug: &str) -> Result<(), GrafanaError> {
        self.record(Operation::DeleteDashboard, slug)?;
        lock(&self.dashboards).retain(|d| d.slug() != slug);
        Ok(())
    }
}
