//! Collaborator interfaces to the remote control plane
//!
//! Both network collections only support whole-collection replacement:
//! an update writes the complete list and the remote side keeps nothing
//! that is not in it.

use crate::Result;
use async_trait::async_trait;
use router_api::{AddressFilterEntry, AttachedInterface, Instance, PortState, RouteEntry, RouterState};

/// Read access to compute instances backing nodes
#[async_trait]
pub trait ComputeClient: Send + Sync {
    /// Enumerate all instances visible to the project
    async fn list_instances(&self) -> Result<Vec<Instance>>;

    /// Resolve a node name to its single backing instance
    async fn instance_by_node(&self, node: &str) -> Result<Instance>;

    /// Interfaces attached to an instance
    async fn attached_interfaces(&self, instance_id: &str) -> Result<Vec<AttachedInterface>>;
}

/// Whole-table access to a router's routes
#[async_trait]
pub trait RouteTableClient: Send + Sync {
    async fn get_router(&self, router_id: &str) -> Result<RouterState>;

    /// Replace the router's routes with `routes`
    async fn update_routes(&self, router_id: &str, routes: Vec<RouteEntry>) -> Result<RouterState>;
}

/// Whole-list access to a port's allowed-address-pairs
#[async_trait]
pub trait PortFilterClient: Send + Sync {
    async fn get_port(&self, port_id: &str) -> Result<PortState>;

    /// Replace the port's allowed-address-pairs with `pairs`
    async fn update_address_pairs(
        &self,
        port_id: &str,
        pairs: Vec<AddressFilterEntry>,
    ) -> Result<PortState>;
}
