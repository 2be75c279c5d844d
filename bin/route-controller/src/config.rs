//! Controller configuration loaded from YAML

use anyhow::{Context, Result};
use ipnetwork::IpNetwork;
use router_core::RouterOpts;
use router_openstack::OpenStackOpts;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

const CONFIG_PATH_ENV: &str = "ROUTE_CONTROLLER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "/etc/route-controller/config.yaml";
const AUTH_TOKEN_ENV: &str = "OS_AUTH_TOKEN";

#[derive(Clone, Debug, Deserialize)]
pub struct ControllerConfig {
    /// Cluster name passed to the reconciler
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Networks whose routes this controller owns; stale routes outside
    /// them are never deleted
    #[serde(default)]
    pub cluster_cidrs: Vec<String>,

    pub router: RouterOpts,

    pub openstack: OpenStackOpts,

    /// Seconds between reconcile passes
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Listen address for /metrics and /healthz
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: SocketAddr,
}

fn default_cluster_name() -> String {
    "kubernetes".to_string()
}

fn default_reconcile_interval_secs() -> u64 {
    30
}

fn default_metrics_addr() -> SocketAddr {
    ([0, 0, 0, 0], 9090).into()
}

impl ControllerConfig {
    /// Load the config file named by ROUTE_CONTROLLER_CONFIG, applying
    /// OS_AUTH_TOKEN on top
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let mut config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path))?;

        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            config.openstack.auth_token = token;
        }
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.managed_networks()?;
        Ok(config)
    }

    /// Parsed `cluster_cidrs`
    pub fn managed_networks(&self) -> Result<Vec<IpNetwork>> {
        self.cluster_cidrs
            .iter()
            .map(|cidr| {
                cidr.parse::<IpNetwork>()
                    .with_context(|| format!("Invalid cluster CIDR {}", cidr))
            })
            .collect()
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
cluster_name: prod
cluster_cidrs:
  - 10.244.0.0/16
  - fd00:10::/56
router:
  router-id: 6f1c0b9e
openstack:
  compute_endpoint: https://nova.example:8774/v2.1
  network_endpoint: https://neutron.example:9696
  auth_token: secret
"#;

    #[test]
    fn test_parse_config() {
        let config = ControllerConfig::from_yaml(CONFIG).unwrap();
        assert_eq!(config.cluster_name, "prod");
        assert_eq!(config.router.router_id, "6f1c0b9e");
        assert_eq!(config.openstack.request_timeout_secs, 30);
        assert_eq!(config.managed_networks().unwrap().len(), 2);
        assert_eq!(config.reconcile_interval(), Duration::from_secs(30));
        assert_eq!(config.metrics_addr, "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_invalid_cluster_cidr_is_rejected() {
        let config = CONFIG.replace("10.244.0.0/16", "10.244.0.0/40");
        assert!(ControllerConfig::from_yaml(&config).is_err());
    }

    #[test]
    fn test_missing_router_section_is_rejected() {
        let config = r#"
openstack:
  compute_endpoint: https://nova
  network_endpoint: https://neutron
"#;
        assert!(ControllerConfig::from_yaml(config).is_err());
    }
}
