//! Node address resolution and next-hop selection

use crate::client::ComputeClient;
use crate::{CoreError, ResourceKind, Result};
use ipnetwork::IpNetwork;
use router_api::{AddressFamily, NodeAddress};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Next-hop chosen for a node, with the instance it belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NextHop {
    pub address: String,
    pub instance_id: String,
}

/// Family of a destination CIDR
pub fn destination_family(cidr: &str) -> Result<AddressFamily> {
    let network: IpNetwork = cidr.parse().map_err(|e: ipnetwork::IpNetworkError| CoreError::InvalidCidr {
        cidr: cidr.to_string(),
        reason: e.to_string(),
    })?;
    Ok(AddressFamily::of(network.ip()))
}

/// First internal address of `family`, in the order the node reports them
pub fn select_next_hop(addresses: &[NodeAddress], family: AddressFamily) -> Option<&NodeAddress> {
    addresses
        .iter()
        .find(|addr| addr.is_internal() && addr.family == family)
}

/// AddressResolver maps nodes to addresses and addresses back to nodes
pub struct AddressResolver {
    compute: Arc<dyn ComputeClient>,
}

impl AddressResolver {
    pub fn new(compute: Arc<dyn ComputeClient>) -> Self {
        Self { compute }
    }

    /// Build an address -> node name index over every known instance.
    /// On collision the instance listed last wins.
    pub async fn address_index(&self) -> Result<HashMap<String, String>> {
        self.index_where(|_| true).await
    }

    /// Like `address_index`, restricted to internal addresses. These are the
    /// only addresses `next_hop` ever selects.
    pub async fn internal_address_index(&self) -> Result<HashMap<String, String>> {
        self.index_where(NodeAddress::is_internal).await
    }

    async fn index_where(&self, keep: impl Fn(&NodeAddress) -> bool) -> Result<HashMap<String, String>> {
        let instances = self.compute.list_instances().await?;
        let mut index = HashMap::new();
        for instance in instances {
            for addr in instance.addresses.into_iter().filter(|addr| keep(addr)) {
                index.insert(addr.address, instance.name.clone());
            }
        }
        debug!("Indexed {} node addresses", index.len());
        Ok(index)
    }

    /// Pick the address routes to `node` for `family` should use
    pub async fn next_hop(&self, node: &str, family: AddressFamily) -> Result<NextHop> {
        let instance = self.compute.instance_by_node(node).await?;
        let not_found = || CoreError::AddressNotFound {
            node: node.to_string(),
            family,
        };
        if instance.addresses.is_empty() {
            return Err(not_found());
        }

        let addr = select_next_hop(&instance.addresses, family).ok_or_else(not_found)?;
        debug!("Using nexthop {} for node {}", addr.address, node);
        Ok(NextHop {
            address: addr.address.clone(),
            instance_id: instance.id,
        })
    }

    /// Find the port carrying `next_hop` among its instance's interfaces
    pub async fn port_for(&self, next_hop: &NextHop) -> Result<String> {
        let interfaces = self.compute.attached_interfaces(&next_hop.instance_id).await?;
        interfaces
            .into_iter()
            .find(|intf| intf.has_fixed_ip(&next_hop.address))
            .map(|intf| intf.port_id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Interface, next_hop.address.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCloud;
    use router_api::AddressRole;

    fn addr(address: &str, role: AddressRole) -> NodeAddress {
        NodeAddress::parse(address, role).unwrap()
    }

    #[test]
    fn test_destination_family() {
        assert_eq!(destination_family("10.1.0.0/24").unwrap(), AddressFamily::V4);
        assert_eq!(destination_family("fd00:10::/64").unwrap(), AddressFamily::V6);
        assert!(matches!(
            destination_family("10.1.0.0/33"),
            Err(CoreError::InvalidCidr { .. })
        ));
        assert!(destination_family("garbage").is_err());
    }

    #[test]
    fn test_select_next_hop_matches_family_and_role() {
        let addresses = vec![
            addr("203.0.113.7", AddressRole::External),
            addr("fd00::5", AddressRole::Internal),
            addr("10.0.0.5", AddressRole::Internal),
        ];
        assert_eq!(
            select_next_hop(&addresses, AddressFamily::V4).unwrap().address,
            "10.0.0.5"
        );
        assert_eq!(
            select_next_hop(&addresses, AddressFamily::V6).unwrap().address,
            "fd00::5"
        );
    }

    #[test]
    fn test_select_next_hop_ignores_external() {
        let addresses = vec![addr("203.0.113.7", AddressRole::External)];
        assert!(select_next_hop(&addresses, AddressFamily::V4).is_none());
    }

    #[tokio::test]
    async fn test_address_index_last_writer_wins() {
        let cloud = FakeCloud::new("r1");
        cloud.add_node("n1", "i-1", &["10.0.0.5"], "p1");
        cloud.add_node("n2", "i-2", &["10.0.0.5", "10.0.0.6"], "p2");

        let resolver = AddressResolver::new(cloud.clone());
        let index = resolver.address_index().await.unwrap();
        assert_eq!(index.get("10.0.0.5").map(String::as_str), Some("n2"));
        assert_eq!(index.get("10.0.0.6").map(String::as_str), Some("n2"));
    }

    #[tokio::test]
    async fn test_internal_address_index_skips_external() {
        let cloud = FakeCloud::new("r1");
        cloud.add_instance(
            "n1",
            "i-1",
            vec![
                addr("10.0.0.5", AddressRole::Internal),
                addr("203.0.113.7", AddressRole::External),
            ],
        );

        let resolver = AddressResolver::new(cloud.clone());
        let index = resolver.internal_address_index().await.unwrap();
        assert_eq!(index.get("10.0.0.5").map(String::as_str), Some("n1"));
        assert!(!index.contains_key("203.0.113.7"));
        assert!(resolver.address_index().await.unwrap().contains_key("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_next_hop_without_addresses() {
        let cloud = FakeCloud::new("r1");
        cloud.add_node("n1", "i-1", &[], "p1");

        let resolver = AddressResolver::new(cloud.clone());
        let err = resolver.next_hop("n1", AddressFamily::V4).await.unwrap_err();
        assert!(matches!(err, CoreError::AddressNotFound { ref node, .. } if node == "n1"));
    }

    #[tokio::test]
    async fn test_port_for_unknown_address() {
        let cloud = FakeCloud::new("r1");
        cloud.add_node("n1", "i-1", &["10.0.0.5"], "p1");

        let resolver = AddressResolver::new(cloud.clone());
        let hop = NextHop {
            address: "10.0.0.99".to_string(),
            instance_id: "i-1".to_string(),
        };
        let err = resolver.port_for(&hop).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ResourceNotFound { kind: ResourceKind::Interface, .. }
        ));

        let hop = NextHop {
            address: "10.0.0.5".to_string(),
            instance_id: "i-1".to_string(),
        };
        assert_eq!(resolver.port_for(&hop).await.unwrap(), "p1");
    }
}
