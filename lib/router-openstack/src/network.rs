//! Neutron network client: router extra-routes and port address pairs

use crate::client::OpenStackClient;
use async_trait::async_trait;
use router_api::{AddressFilterEntry, PortState, RouteEntry, RouterState};
use router_core::{PortFilterClient, ResourceKind, Result, RouteTableClient};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RouterEnvelope {
    router: RouterState,
}

#[derive(Debug, Serialize)]
struct RouterUpdate<'a> {
    router: RoutesBody<'a>,
}

#[derive(Debug, Serialize)]
struct RoutesBody<'a> {
    routes: &'a [RouteEntry],
}

#[derive(Debug, Deserialize)]
struct PortEnvelope {
    port: PortState,
}

#[derive(Debug, Serialize)]
struct PortUpdate<'a> {
    port: AddressPairsBody<'a>,
}

#[derive(Debug, Serialize)]
struct AddressPairsBody<'a> {
    allowed_address_pairs: &'a [AddressFilterEntry],
}

/// Router and port collaborator backed by the Neutron API
pub struct NeutronNetwork {
    client: OpenStackClient,
}

impl NeutronNetwork {
    pub fn new(client: OpenStackClient) -> Self {
        Self { client }
    }

    fn router_url(&self, router_id: &str) -> String {
        self.client.network_url(&format!("v2.0/routers/{}", router_id))
    }

    fn port_url(&self, port_id: &str) -> String {
        self.client.network_url(&format!("v2.0/ports/{}", port_id))
    }
}

#[async_trait]
impl RouteTableClient for NeutronNetwork {
    async fn get_router(&self, router_id: &str) -> Result<RouterState> {
        let envelope: RouterEnvelope = self
            .client
            .get(&self.router_url(router_id), &[], ResourceKind::Router, router_id)
            .await?;
        Ok(envelope.router)
    }

    async fn update_routes(&self, router_id: &str, routes: Vec<RouteEntry>) -> Result<RouterState> {
        debug!("Writing {} routes to router {}", routes.len(), router_id);
        let body = RouterUpdate {
            router: RoutesBody { routes: &routes },
        };
        let envelope: RouterEnvelope = self
            .client
            .put(&self.router_url(router_id), &body, ResourceKind::Router, router_id)
            .await?;
        Ok(envelope.router)
    }
}

#[async_trait]
impl PortFilterClient for NeutronNetwork {
    async fn get_port(&self, port_id: &str) -> Result<PortState> {
        let envelope: PortEnvelope = self
            .client
            .get(&self.port_url(port_id), &[], ResourceKind::Port, port_id)
            .await?;
        Ok(envelope.port)
    }

    async fn update_address_pairs(
        &self,
        port_id: &str,
        pairs: Vec<AddressFilterEntry>,
    ) -> Result<PortState> {
        debug!("Writing {} allowed-address-pairs to port {}", pairs.len(), port_id);
        let body = PortUpdate {
            port: AddressPairsBody {
                allowed_address_pairs: &pairs,
            },
        };
        let envelope: PortEnvelope = self
            .client
            .put(&self.port_url(port_id), &body, ResourceKind::Port, port_id)
            .await?;
        Ok(envelope.port)
    }
}
