//! Grafana client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Grafana API
#[derive(Debug, Error)]
pub enum GrafanaError {
    /// The HTTP round trip itself failed (DNS, connection refused, timeout)
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Grafana answered with something other than `200 OK`
    #[error("Unexpected status code returned from Grafana API (got: {status}, expected: 200, msg: {status_text})")]
    UnexpectedStatus {
        /// Numeric HTTP status
        status: u16,
        /// Status line text, e.g. `500 Internal Server Error`.
        ///
        /// Uses the canonical reason phrase for the code; unregistered codes
        /// such as 599 carry only the number.
        status_text: String,
    },

    /// Response body did not have the expected JSON shape
    #[error("Failed to decode Grafana response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL could not be parsed or used as a base
    #[error("Invalid Grafana URL: {0}")]
    InvalidUrl(String),
}

impl GrafanaError {
    /// Status code carried by an `UnexpectedStatus` error
    pub fn status(&self) -> Option<u16> {
        match self {
            GrafanaError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<url::ParseError> for GrafanaError {
    fn from(e: url::ParseError) -> Self {
        GrafanaError::InvalidUrl(e.to_string())
    }
}
