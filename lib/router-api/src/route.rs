use serde::{Deserialize, Serialize};
use std::fmt;

/// Route describes a destination CIDR that should be forwarded to a node
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Name of the route, conventionally the destination CIDR
    pub name: String,

    /// Node the route forwards to (empty when the next-hop is unknown)
    #[serde(default)]
    pub target_node: String,

    /// Destination CIDR (e.g. "10.244.1.0/24")
    pub destination_cidr: String,

    /// Set by listing when the next-hop matches no known node
    #[serde(default)]
    pub blackhole: bool,
}

impl Route {
    /// Create a route to `target_node`, named after its destination
    pub fn new(destination_cidr: impl Into<String>, target_node: impl Into<String>) -> Self {
        let destination_cidr = destination_cidr.into();
        Self {
            name: destination_cidr.clone(),
            target_node: target_node.into(),
            destination_cidr,
            blackhole: false,
        }
    }

    /// Create a route whose next-hop could not be mapped to a node
    pub fn blackhole(destination_cidr: impl Into<String>) -> Self {
        Self {
            blackhole: true,
            ..Self::new(destination_cidr, String::new())
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.blackhole {
            write!(f, "{} -> (blackhole)", self.destination_cidr)
        } else {
            write!(f, "{} -> {}", self.destination_cidr, self.target_node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_route_is_named_after_cidr() {
        let route = Route::new("10.1.0.0/24", "n1");
        assert_eq!(route.name, "10.1.0.0/24");
        assert_eq!(route.target_node, "n1");
        assert!(!route.blackhole);
    }

    #[test]
    fn test_blackhole_route_has_no_target() {
        let route = Route::blackhole("10.9.0.0/24");
        assert!(route.blackhole);
        assert!(route.target_node.is_empty());
        assert_eq!(route.to_string(), "10.9.0.0/24 -> (blackhole)");
    }

    #[test]
    fn test_route_json_uses_camel_case() {
        let json = serde_json::to_value(Route::new("10.1.0.0/24", "n1")).unwrap();
        assert_eq!(json["destinationCidr"], "10.1.0.0/24");
        assert_eq!(json["targetNode"], "n1");
    }
}
