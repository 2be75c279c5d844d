//! Network-side state: router extra-routes and port allowed-address-pairs
//!
//! Field names follow the Neutron wire format so these types can be sent
//! and received as-is.

use serde::{Deserialize, Serialize};

/// A single entry of a router's route table
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Destination CIDR
    pub destination: String,

    /// Next-hop IP address
    pub nexthop: String,
}

impl RouteEntry {
    pub fn new(destination: impl Into<String>, nexthop: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            nexthop: nexthop.into(),
        }
    }

    /// Whether this entry routes `destination` via `nexthop`
    pub fn matches(&self, destination: &str, nexthop: &str) -> bool {
        self.destination == destination && self.nexthop == nexthop
    }
}

/// An allowed-address-pair on a port
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressFilterEntry {
    /// Permitted IP address or CIDR
    pub ip_address: String,

    /// MAC address the pair is bound to; the port's own MAC when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

impl AddressFilterEntry {
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            mac_address: None,
        }
    }
}

/// Router as seen by the reconciler
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterState {
    pub id: String,

    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// Port as seen by the reconciler
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortState {
    pub id: String,

    #[serde(default)]
    pub allowed_address_pairs: Vec<AddressFilterEntry>,
}
