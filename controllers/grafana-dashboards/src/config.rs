//! Process configuration.
//!
//! Flags are parsed with clap; Grafana credentials come from the
//! `GRAFANA_USER` / `GRAFANA_PASSWORD` environment variables and are
//! folded into the Grafana base URL.

use crate::error::ControllerError;
use crate::watcher::DEFAULT_RESYNC_PERIOD;
use clap::{ArgAction, Parser};
use kube::Client;
use kube::config::KubeConfigOptions;
use std::env;
use std::time::Duration;
use url::Url;

/// Command-line configuration for the controller.
#[derive(Parser, Debug, Clone)]
#[command(name = "grafana-dashboards-controller", version, about = "Sync annotated ConfigMaps into Grafana")]
pub struct Config {
    /// The url to issue requests to update dashboards to.
    #[arg(long = "grafana-url", env = "GRAFANA_URL")]
    pub grafana_url: String,

    /// Set this flag when running outside of the cluster.
    #[arg(long = "run-outside-cluster", action = ArgAction::SetTrue)]
    pub run_outside_cluster: bool,
}

/// Grafana credentials supplied through the environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GrafanaCredentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for GrafanaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrafanaCredentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GrafanaCredentials {
    /// Read `GRAFANA_USER` and `GRAFANA_PASSWORD`; empty values count as unset.
    pub fn from_env() -> Self {
        Self {
            user: non_empty_var("GRAFANA_USER"),
            password: non_empty_var("GRAFANA_PASSWORD"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Informer resync period from `RESYNC_PERIOD_SECS` (0 disables resync).
pub fn resync_period_from_env() -> Result<Duration, ControllerError> {
    parse_resync_period(non_empty_var("RESYNC_PERIOD_SECS").as_deref())
}

fn parse_resync_period(raw: Option<&str>) -> Result<Duration, ControllerError> {
    match raw {
        None => Ok(DEFAULT_RESYNC_PERIOD),
        Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|e| {
            ControllerError::InvalidConfig(format!("RESYNC_PERIOD_SECS must be a number of seconds: {} ({})", raw, e))
        }),
    }
}

impl Config {
    /// Parse the Grafana URL and inject credentials into its user info.
    pub fn grafana_base_url(&self, credentials: &GrafanaCredentials) -> Result<Url, ControllerError> {
        if self.grafana_url.is_empty() {
            return Err(ControllerError::InvalidConfig("Missing grafana-url".to_string()));
        }

        let mut url = Url::parse(&self.grafana_url).map_err(|e| {
            ControllerError::InvalidConfig(format!(
                "Grafana URL could not be parsed: {} ({})",
                self.grafana_url, e
            ))
        })?;

        // A password without a user is ignored.
        if let Some(user) = &credentials.user {
            url.set_username(user)
                .and_then(|()| url.set_password(credentials.password.as_deref()))
                .map_err(|()| {
                    ControllerError::InvalidConfig(format!(
                        "Grafana URL cannot carry credentials: {}",
                        self.grafana_url
                    ))
                })?;
        }

        Ok(url)
    }

    /// Build a Kubernetes client from the local kubeconfig or the in-cluster
    /// service account, depending on `--run-outside-cluster`.
    pub async fn kube_client(&self) -> Result<Client, ControllerError> {
        let config = if self.run_outside_cluster {
            kube::Config::from_kubeconfig(&KubeConfigOptions::default())
                .await
                .map_err(|e| ControllerError::KubeConfig(e.to_string()))?
        } else {
            kube::Config::incluster().map_err(|e| ControllerError::KubeConfig(e.to_string()))?
        };

        Client::try_from(config).map_err(ControllerError::Kube)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> Config {
        Config {
            grafana_url: url.to_string(),
            run_outside_cluster: false,
        }
    }

    fn creds(user: Option<&str>, password: Option<&str>) -> GrafanaCredentials {
        GrafanaCredentials {
            user: user.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn parses_flags() {
        let cfg = Config::try_parse_from([
            "grafana-dashboards-controller",
            "--grafana-url",
            "http://grafana:3000",
            "--run-outside-cluster",
        ])
        .unwrap();
        assert_eq!(cfg.grafana_url, "http://grafana:3000");
        assert!(cfg.run_outside_cluster);
    }

    #[test]
    fn run_outside_cluster_defaults_to_false() {
        let cfg = Config::try_parse_from([
            "grafana-dashboards-controller",
            "--grafana-url=http://grafana:3000",
        ])
        .unwrap();
        assert!(!cfg.run_outside_cluster);
    }

    #[test]
    fn url_without_credentials() {
        let url = config("http://grafana:3000/grafana").grafana_base_url(&creds(None, None)).unwrap();
        assert_eq!(url.as_str(), "http://grafana:3000/grafana");
    }

    #[test]
    fn user_and_password_are_injected() {
        let url = config("http://grafana:3000")
            .grafana_base_url(&creds(Some("admin"), Some("secret")))
            .unwrap();
        assert_eq!(url.username(), "admin");
        assert_eq!(url.password(), Some("secret"));
    }

    #[test]
    fn user_only_replaces_embedded_credentials() {
        let url = config("http://old:pw@grafana:3000")
            .grafana_base_url(&creds(Some("viewer"), None))
            .unwrap();
        assert_eq!(url.username(), "viewer");
        assert_eq!(url.password(), None);
    }

    #[test]
    fn password_without_user_is_ignored() {
        let url = config("http://grafana:3000")
            .grafana_base_url(&creds(None, Some("secret")))
            .unwrap();
        assert_eq!(url.username(), "");
        assert_eq!(url.password(), None);
    }

    #[test]
    fn unparseable_url_is_rejected() {
        let err = config("not a url").grafana_base_url(&creds(None, None)).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = config("").grafana_base_url(&creds(None, None)).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn resync_period_parsing() {
        assert_eq!(parse_resync_period(None).unwrap(), Duration::from_secs(180));
        assert_eq!(parse_resync_period(Some("30")).unwrap(), Duration::from_secs(30));
        assert_eq!(parse_resync_period(Some("0")).unwrap(), Duration::ZERO);
        assert!(matches!(
            parse_resync_period(Some("3m")),
            Err(ControllerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let rendered = format!("{:?}", creds(Some("admin"), Some("hunter2")));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
