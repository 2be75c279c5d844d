//! In-memory cloud used by the unit tests

use crate::client::{ComputeClient, PortFilterClient, RouteTableClient};
use crate::{CoreError, ResourceKind, Result};
use async_trait::async_trait;
use router_api::{
    AddressFilterEntry, AddressRole, AttachedInterface, FixedIp, Instance, NodeAddress, PortState,
    RouteEntry, RouterState,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Fake compute and network API with write logging and failure injection
#[derive(Default)]
pub struct FakeCloud {
    instances: Mutex<Vec<Instance>>,
    interfaces: Mutex<HashMap<String, Vec<AttachedInterface>>>,
    routers: Mutex<HashMap<String, Vec<RouteEntry>>>,
    ports: Mutex<HashMap<String, Vec<AddressFilterEntry>>>,
    writes: Mutex<Vec<String>>,
    router_write_attempts: AtomicUsize,
    fail_router_writes_from: AtomicUsize,
    fail_port_writes: AtomicBool,
}

impl FakeCloud {
    /// A cloud with one empty router
    pub fn new(router_id: &str) -> Arc<Self> {
        let cloud = Self {
            fail_router_writes_from: AtomicUsize::new(usize::MAX),
            ..Default::default()
        };
        cloud.set_routes(router_id, Vec::new());
        Arc::new(cloud)
    }

    /// Add a node whose internal addresses all sit on one port
    pub fn add_node(&self, name: &str, instance_id: &str, internal: &[&str], port_id: &str) {
        let addresses = internal
            .iter()
            .filter_map(|addr| NodeAddress::parse(*addr, AddressRole::Internal))
            .collect();
        self.add_instance(name, instance_id, addresses);

        let fixed_ips = internal
            .iter()
            .map(|addr| FixedIp {
                ip_address: addr.to_string(),
                subnet_id: None,
            })
            .collect();
        self.interfaces.lock().unwrap().insert(
            instance_id.to_string(),
            vec![AttachedInterface {
                port_id: port_id.to_string(),
                fixed_ips,
            }],
        );
        self.set_port(port_id, Vec::new());
    }

    /// Add an instance without any attached interface
    pub fn add_instance(&self, name: &str, instance_id: &str, addresses: Vec<NodeAddress>) {
        self.instances.lock().unwrap().push(Instance {
            id: instance_id.to_string(),
            name: name.to_string(),
            addresses,
        });
    }

    pub fn set_routes(&self, router_id: &str, routes: Vec<RouteEntry>) {
        self.routers
            .lock()
            .unwrap()
            .insert(router_id.to_string(), routes);
    }

    pub fn remove_router(&self, router_id: &str) {
        self.routers.lock().unwrap().remove(router_id);
    }

    pub fn set_port(&self, port_id: &str, pairs: Vec<AddressFilterEntry>) {
        self.ports.lock().unwrap().insert(port_id.to_string(), pairs);
    }

    pub fn routes(&self, router_id: &str) -> Vec<RouteEntry> {
        self.routers
            .lock()
            .unwrap()
            .get(router_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn address_pairs(&self, port_id: &str) -> Vec<AddressFilterEntry> {
        self.ports
            .lock()
            .unwrap()
            .get(port_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Router write attempts numbered from `n` on fail
    pub fn fail_router_writes_from(&self, n: usize) {
        self.fail_router_writes_from.store(n, Ordering::SeqCst);
    }

    pub fn fail_port_writes(&self) {
        self.fail_port_writes.store(true, Ordering::SeqCst);
    }

    /// Every attempted write as "router:<id>" or "port:<id>", in order
    pub fn write_log(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn total_writes(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl ComputeClient for FakeCloud {
    async fn list_instances(&self) -> Result<Vec<Instance>> {
        Ok(self.instances.lock().unwrap().clone())
    }

    async fn instance_by_node(&self, node: &str) -> Result<Instance> {
        let instances = self.instances.lock().unwrap();
        let mut matching = instances.iter().filter(|i| i.name == node);
        match (matching.next(), matching.next()) {
            (Some(instance), None) => Ok(instance.clone()),
            (Some(_), Some(_)) => Err(CoreError::AmbiguousResource {
                kind: ResourceKind::Instance,
                id: node.to_string(),
            }),
            (None, _) => Err(CoreError::not_found(ResourceKind::Instance, node)),
        }
    }

    async fn attached_interfaces(&self, instance_id: &str) -> Result<Vec<AttachedInterface>> {
        Ok(self
            .interfaces
            .lock()
            .unwrap()
            .get(instance_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl RouteTableClient for FakeCloud {
    async fn get_router(&self, router_id: &str) -> Result<RouterState> {
        let routers = self.routers.lock().unwrap();
        let routes = routers
            .get(router_id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Router, router_id))?;
        Ok(RouterState {
            id: router_id.to_string(),
            routes: routes.clone(),
        })
    }

    async fn update_routes(&self, router_id: &str, routes: Vec<RouteEntry>) -> Result<RouterState> {
        self.writes.lock().unwrap().push(format!("router:{}", router_id));
        let attempt = self.router_write_attempts.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.fail_router_writes_from.load(Ordering::SeqCst) {
            return Err(CoreError::write_failed(ResourceKind::Router, router_id, "injected failure"));
        }

        self.set_routes(router_id, routes.clone());
        Ok(RouterState {
            id: router_id.to_string(),
            routes,
        })
    }
}

#[async_trait]
impl PortFilterClient for FakeCloud {
    async fn get_port(&self, port_id: &str) -> Result<PortState> {
        let ports = self.ports.lock().unwrap();
        let pairs = ports
            .get(port_id)
            .ok_or_else(|| CoreError::not_found(ResourceKind::Port, port_id))?;
        Ok(PortState {
            id: port_id.to_string(),
            allowed_address_pairs: pairs.clone(),
        })
    }

    async fn update_address_pairs(
        &self,
        port_id: &str,
        pairs: Vec<AddressFilterEntry>,
    ) -> Result<PortState> {
        self.writes.lock().unwrap().push(format!("port:{}", port_id));
        if self.fail_port_writes.load(Ordering::SeqCst) {
            return Err(CoreError::write_failed(ResourceKind::Port, port_id, "injected failure"));
        }

        self.set_port(port_id, pairs.clone());
        Ok(PortState {
            id: port_id.to_string(),
            allowed_address_pairs: pairs,
        })
    }
}
