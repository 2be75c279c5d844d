//! Compute-side view of nodes: instances, their addresses and interfaces

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// IP address family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Family of a textual IP address, `None` if it does not parse
    pub fn of_address(address: &str) -> Option<Self> {
        address.parse::<IpAddr>().ok().map(Self::of)
    }

    pub fn of(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Role of a node address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressRole {
    /// Reachable inside the cluster network (fixed IP)
    #[serde(rename = "InternalIP")]
    Internal,
    /// Reachable from outside (floating or access IP)
    #[serde(rename = "ExternalIP")]
    External,
}

/// An address of a node, tagged by role and family
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    pub address: String,
    pub family: AddressFamily,
    pub role: AddressRole,
}

impl NodeAddress {
    /// Build a node address; returns `None` if `address` is not an IP
    pub fn parse(address: impl Into<String>, role: AddressRole) -> Option<Self> {
        let address = address.into();
        let family = AddressFamily::of_address(&address)?;
        Some(Self {
            address,
            family,
            role,
        })
    }

    pub fn is_internal(&self) -> bool {
        self.role == AddressRole::Internal
    }
}

/// A compute instance backing a node
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    /// Instance name, which is also the node name
    pub name: String,
    #[serde(default)]
    pub addresses: Vec<NodeAddress>,
}

/// A fixed IP on an attached interface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIp {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

/// A network interface attached to an instance
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedInterface {
    pub port_id: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}

impl AttachedInterface {
    /// Whether `ip_address` is one of this interface's fixed IPs
    pub fn has_fixed_ip(&self, ip_address: &str) -> bool {
        self.fixed_ips.iter().any(|ip| ip.ip_address == ip_address)
    }
}
