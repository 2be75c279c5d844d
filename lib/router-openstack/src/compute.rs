//! Nova compute client: servers, their addresses and interfaces

use crate::client::OpenStackClient;
use async_trait::async_trait;
use router_api::{AddressRole, AttachedInterface, Instance, NodeAddress};
use router_core::{ComputeClient, CoreError, ResourceKind, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A server as returned by `GET /servers/detail`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<ServerAddress>>,
    #[serde(default, rename = "accessIPv4")]
    pub access_ipv4: String,
    #[serde(default, rename = "accessIPv6")]
    pub access_ipv6: String,
}

/// One address of a server on a network
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServerAddress {
    pub addr: String,
    #[serde(default)]
    pub version: u8,
    /// "fixed" or "floating"
    #[serde(default, rename = "OS-EXT-IPS:type")]
    pub ip_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerList {
    servers: Vec<Server>,
    #[serde(default)]
    servers_links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct InterfaceList {
    #[serde(rename = "interfaceAttachments")]
    interface_attachments: Vec<AttachedInterface>,
}

/// Name of the network whose addresses are always external
const PUBLIC_NETWORK: &str = "public";

/// Derive node addresses from a server.
///
/// Networks are visited in name order. Floating addresses and addresses on
/// the public network are external, all others internal. Access IPs follow
/// as external addresses. Repeated addresses are kept once.
pub fn server_addresses(server: &Server) -> Vec<NodeAddress> {
    let mut addresses: Vec<NodeAddress> = Vec::new();
    let mut add = |address: &str, role: AddressRole| {
        if addresses
            .iter()
            .any(|a| a.address == address && a.role == role)
        {
            return;
        }
        match NodeAddress::parse(address, role) {
            Some(addr) => addresses.push(addr),
            None => debug!("Ignoring invalid address {:?} on server {}", address, server.name),
        }
    };

    for (network, network_addresses) in &server.addresses {
        for props in network_addresses {
            let role = if props.ip_type.as_deref() == Some("floating") || network == PUBLIC_NETWORK {
                AddressRole::External
            } else {
                AddressRole::Internal
            };
            add(&props.addr, role);
        }
    }

    for access_ip in [&server.access_ipv4, &server.access_ipv6] {
        if !access_ip.is_empty() {
            add(access_ip, AddressRole::External);
        }
    }

    addresses
}

/// Compute collaborator backed by the Nova API
pub struct NovaCompute {
    client: OpenStackClient,
}

impl NovaCompute {
    pub fn new(client: OpenStackClient) -> Self {
        Self { client }
    }

    /// Fetch all servers matching `query`, following pagination links
    async fn servers(&self, query: &[(&str, &str)]) -> Result<Vec<Server>> {
        let mut servers = Vec::new();
        let mut page: ServerList = self
            .client
            .get(&self.client.compute_url("servers/detail"), query, ResourceKind::Instance, "servers")
            .await?;

        loop {
            servers.append(&mut page.servers);
            let next = page
                .servers_links
                .iter()
                .find(|link| link.rel == "next")
                .map(|link| link.href.clone());

            match next {
                Some(href) => {
                    page = self
                        .client
                        .get(&href, &[], ResourceKind::Instance, "servers")
                        .await?;
                }
                None => break,
            }
        }

        debug!("Listed {} servers", servers.len());
        Ok(servers)
    }
}

fn to_instance(server: &Server) -> Instance {
    Instance {
        id: server.id.clone(),
        name: server.name.clone(),
        addresses: server_addresses(server),
    }
}

#[async_trait]
impl ComputeClient for NovaCompute {
    async fn list_instances(&self) -> Result<Vec<Instance>> {
        let servers = self.servers(&[]).await?;
        Ok(servers.iter().map(to_instance).collect())
    }

    async fn instance_by_node(&self, node: &str) -> Result<Instance> {
        let name = format!("^{}$", regex::escape(node));
        let servers = self
            .servers(&[("name", name.as_str()), ("status", "ACTIVE")])
            .await?;

        let mut matching = servers.iter().filter(|server| server.name == node);
        match (matching.next(), matching.next()) {
            (Some(server), None) => Ok(to_instance(server)),
            (Some(_), Some(_)) => Err(CoreError::AmbiguousResource {
                kind: ResourceKind::Instance,
                id: node.to_string(),
            }),
            (None, _) => Err(CoreError::not_found(ResourceKind::Instance, node)),
        }
    }

    async fn attached_interfaces(&self, instance_id: &str) -> Result<Vec<AttachedInterface>> {
        let url = self
            .client
            .compute_url(&format!("servers/{}/os-interface", instance_id));
        let list: InterfaceList = self
            .client
            .get(&url, &[], ResourceKind::Instance, instance_id)
            .await?;
        Ok(list.interface_attachments)
    }
}
