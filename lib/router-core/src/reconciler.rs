//! Route reconciler keeping a router's routes and node port filters in step
//!
//! A route `cidr -> node` is materialized in two places:
//! - the router forwards `cidr` to the node's internal address, and
//! - the port owning that address allows `cidr` as an address pair, so the
//!   node may send and receive traffic for it.
//!
//! Both collections can only be replaced wholesale and there is no
//! transaction spanning them. Each mutating operation therefore records a
//! compensation after every committed write and unwinds them if a later
//! step fails.

use crate::address::{destination_family, AddressResolver, NextHop};
use crate::client::{ComputeClient, PortFilterClient, RouteTableClient};
use crate::compensation::{Compensation, CompensationStack};
use crate::config::RouterOpts;
use crate::Result;
use router_api::{AddressFilterEntry, Route, RouteEntry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// RouteReconciler lists, creates and deletes routes on one router.
///
/// It holds no state between calls. Concurrent mutating calls against the
/// same router are not coordinated and may overwrite each other; callers
/// must serialize them.
pub struct RouteReconciler {
    resolver: AddressResolver,
    routers: Arc<dyn RouteTableClient>,
    ports: Arc<dyn PortFilterClient>,
    opts: RouterOpts,
}

impl RouteReconciler {
    /// Create a reconciler; fails if `opts` lacks a router ID
    pub fn new(
        compute: Arc<dyn ComputeClient>,
        routers: Arc<dyn RouteTableClient>,
        ports: Arc<dyn PortFilterClient>,
        mut opts: RouterOpts,
    ) -> Result<Self> {
        opts.router_id = opts.router_id.trim().to_string();
        opts.validate()?;
        Ok(Self {
            resolver: AddressResolver::new(compute),
            routers,
            ports,
            opts,
        })
    }

    pub fn router_id(&self) -> &str {
        &self.opts.router_id
    }

    /// List every route on the router, resolving next-hops to node names
    pub async fn list_routes(&self, cluster_name: &str) -> Result<Vec<Route>> {
        debug!("list_routes({})", cluster_name);

        let nodes_by_addr = self.resolver.address_index().await?;
        self.routes_via(&nodes_by_addr).await
    }

    /// List every route on the router, resolving only internal next-hops.
    ///
    /// A route through any other address, a node's external one included, is
    /// reported as a blackhole since `create_route` never targets it.
    pub async fn list_internal_routes(&self, cluster_name: &str) -> Result<Vec<Route>> {
        debug!("list_internal_routes({})", cluster_name);

        let nodes_by_addr = self.resolver.internal_address_index().await?;
        self.routes_via(&nodes_by_addr).await
    }

    async fn routes_via(&self, nodes_by_addr: &HashMap<String, String>) -> Result<Vec<Route>> {
        let router = self.routers.get_router(self.router_id()).await?;

        let routes = router
            .routes
            .into_iter()
            .map(|entry| match nodes_by_addr.get(&entry.nexthop) {
                Some(node) => Route::new(entry.destination, node.clone()),
                None => Route::blackhole(entry.destination),
            })
            .collect();

        Ok(routes)
    }

    /// Route `route.destination_cidr` to `route.target_node`
    pub async fn create_route(&self, cluster_name: &str, name_hint: &str, route: &Route) -> Result<()> {
        debug!("create_route({}, {}, {})", cluster_name, name_hint, route);

        let next_hop = self.next_hop(route).await?;
        let mut compensations = CompensationStack::new(format!("create_route({})", route));

        match self.apply_create(route, &next_hop, &mut compensations).await {
            Ok(()) => {
                compensations.disarm();
                Ok(())
            }
            Err(e) => {
                compensations.unwind(&*self.routers, &*self.ports).await;
                Err(e)
            }
        }
    }

    /// Remove the route `route.destination_cidr -> route.target_node`
    pub async fn delete_route(&self, cluster_name: &str, route: &Route) -> Result<()> {
        debug!("delete_route({}, {})", cluster_name, route);

        let next_hop = self.next_hop(route).await?;
        let mut compensations = CompensationStack::new(format!("delete_route({})", route));

        match self.apply_delete(route, &next_hop, &mut compensations).await {
            Ok(()) => {
                compensations.disarm();
                Ok(())
            }
            Err(e) => {
                compensations.unwind(&*self.routers, &*self.ports).await;
                Err(e)
            }
        }
    }

    async fn next_hop(&self, route: &Route) -> Result<NextHop> {
        let family = destination_family(&route.destination_cidr)?;
        self.resolver.next_hop(&route.target_node, family).await
    }

    async fn apply_create(
        &self,
        route: &Route,
        next_hop: &NextHop,
        compensations: &mut CompensationStack,
    ) -> Result<()> {
        let cidr = route.destination_cidr.as_str();
        let router = self.routers.get_router(self.router_id()).await?;

        if router.routes.iter().any(|entry| entry.matches(cidr, &next_hop.address)) {
            debug!("Skipping existing route: {}", route);
            return Ok(());
        }

        let mut routes = router.routes.clone();
        routes.push(RouteEntry::new(cidr, next_hop.address.clone()));
        self.replace_routes(&router.id, router.routes, routes, compensations)
            .await?;

        let port_id = self.resolver.port_for(next_hop).await?;
        let port = self.ports.get_port(&port_id).await?;

        if port.allowed_address_pairs.iter().any(|pair| pair.ip_address == cidr) {
            debug!("Found existing allowed-address-pair {} on port {}", cidr, port.id);
        } else {
            let mut pairs = port.allowed_address_pairs.clone();
            pairs.push(AddressFilterEntry::new(cidr));
            self.replace_address_pairs(&port.id, port.allowed_address_pairs, pairs, compensations)
                .await?;
        }

        info!("Route created: {}", route);
        Ok(())
    }

    async fn apply_delete(
        &self,
        route: &Route,
        next_hop: &NextHop,
        compensations: &mut CompensationStack,
    ) -> Result<()> {
        let cidr = route.destination_cidr.as_str();
        let router = self.routers.get_router(self.router_id()).await?;

        let Some(index) = router
            .routes
            .iter()
            .position(|entry| entry.matches(cidr, &next_hop.address))
        else {
            debug!("Skipping non-existent route: {}", route);
            return Ok(());
        };

        let mut routes = router.routes.clone();
        routes.swap_remove(index);
        self.replace_routes(&router.id, router.routes, routes, compensations)
            .await?;

        let port_id = self.resolver.port_for(next_hop).await?;
        let port = self.ports.get_port(&port_id).await?;

        match port
            .allowed_address_pairs
            .iter()
            .position(|pair| pair.ip_address == cidr)
        {
            Some(index) => {
                let mut pairs = port.allowed_address_pairs.clone();
                pairs.swap_remove(index);
                self.replace_address_pairs(&port.id, port.allowed_address_pairs, pairs, compensations)
                    .await?;
            }
            None => debug!("No allowed-address-pair {} on port {}", cidr, port.id),
        }

        info!("Route deleted: {}", route);
        Ok(())
    }

    async fn replace_routes(
        &self,
        router_id: &str,
        original: Vec<RouteEntry>,
        routes: Vec<RouteEntry>,
        compensations: &mut CompensationStack,
    ) -> Result<()> {
        self.routers.update_routes(router_id, routes).await?;
        compensations.push(Compensation::restore_routes(router_id, original));
        Ok(())
    }

    async fn replace_address_pairs(
        &self,
        port_id: &str,
        original: Vec<AddressFilterEntry>,
        pairs: Vec<AddressFilterEntry>,
        compensations: &mut CompensationStack,
    ) -> Result<()> {
        self.ports.update_address_pairs(port_id, pairs).await?;
        compensations.push(Compensation::restore_address_pairs(port_id, original));
        Ok(())
    }
}
