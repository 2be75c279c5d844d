//! Route controller driving the reconciler from Kubernetes node state
//!
//! Every pass lists the cluster's nodes, derives one route per pod CIDR,
//! compares them with the router and creates or deletes the difference.
//! Passes never overlap, which keeps the reconciler's read-modify-write
//! updates of the router serialized.

use crate::metrics::ReconcileMetrics;
use ipnetwork::IpNetwork;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::{Api, Client};
use router_api::Route;
use router_core::RouteReconciler;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A route to create, with the name hint passed to the reconciler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredRoute {
    pub route: Route,
    pub name_hint: String,
}

/// Changes needed to bring the router in line with the nodes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutePlan {
    pub create: Vec<DesiredRoute>,
    pub delete: Vec<Route>,
    pub blackholes: Vec<Route>,
}

/// One route per pod CIDR of every node
pub fn desired_routes(nodes: &[Node]) -> Vec<DesiredRoute> {
    let mut desired = Vec::new();
    for node in nodes {
        let Some(name) = node.metadata.name.as_deref() else {
            continue;
        };
        let name_hint = node.metadata.uid.clone().unwrap_or_else(|| name.to_string());

        let cidrs: Vec<String> = match node.spec.as_ref() {
            Some(spec) => match (&spec.pod_cidrs, &spec.pod_cidr) {
                (Some(cidrs), _) if !cidrs.is_empty() => cidrs.clone(),
                (_, Some(cidr)) => vec![cidr.clone()],
                _ => Vec::new(),
            },
            None => Vec::new(),
        };

        if cidrs.is_empty() {
            debug!("Node {} has no pod CIDR yet", name);
        }
        for cidr in cidrs {
            desired.push(DesiredRoute {
                route: Route::new(cidr, name),
                name_hint: name_hint.clone(),
            });
        }
    }
    desired
}

/// Whether `cidr` lies inside one of the managed networks
fn is_managed(cidr: &str, managed: &[IpNetwork]) -> bool {
    let Ok(network) = cidr.parse::<IpNetwork>() else {
        return false;
    };
    managed
        .iter()
        .any(|m| m.contains(network.network()) && network.prefix() >= m.prefix())
}

/// Compute the creates and deletes for one pass.
///
/// `existing` comes from `list_internal_routes`, so a route through a node's
/// external address shows up as a blackhole and does not count as present.
/// Blackhole routes are reported but never deleted: the reconciler needs a
/// live node to resolve their next-hop.
pub fn plan_routes(desired: &[DesiredRoute], existing: &[Route], managed: &[IpNetwork]) -> RoutePlan {
    let mut plan = RoutePlan::default();

    let present: HashSet<(&str, &str)> = existing
        .iter()
        .filter(|route| !route.blackhole)
        .map(|route| (route.target_node.as_str(), route.destination_cidr.as_str()))
        .collect();
    let wanted: HashSet<(&str, &str)> = desired
        .iter()
        .map(|d| (d.route.target_node.as_str(), d.route.destination_cidr.as_str()))
        .collect();

    for d in desired {
        if !present.contains(&(d.route.target_node.as_str(), d.route.destination_cidr.as_str())) {
            plan.create.push(d.clone());
        }
    }

    for route in existing {
        if route.blackhole {
            plan.blackholes.push(route.clone());
        } else if !wanted.contains(&(route.target_node.as_str(), route.destination_cidr.as_str()))
            && is_managed(&route.destination_cidr, managed)
        {
            plan.delete.push(route.clone());
        }
    }

    plan
}

pub struct RouteController {
    client: Client,
    reconciler: RouteReconciler,
    cluster_name: String,
    managed: Vec<IpNetwork>,
    interval: Duration,
    metrics: Arc<ReconcileMetrics>,
}

impl RouteController {
    pub fn new(
        client: Client,
        reconciler: RouteReconciler,
        cluster_name: String,
        managed: Vec<IpNetwork>,
        interval: Duration,
        metrics: Arc<ReconcileMetrics>,
    ) -> Self {
        Self {
            client,
            reconciler,
            cluster_name,
            managed,
            interval,
            metrics,
        }
    }

    /// Run reconcile passes forever
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            "Starting route reconciliation for router {} every {:?}",
            self.reconciler.router_id(),
            self.interval
        );

        loop {
            match self.reconcile().await {
                Ok(plan) => {
                    self.metrics.record_pass(true);
                    info!(
                        "Reconciled routes: {} to create, {} to delete, {} blackhole",
                        plan.create.len(),
                        plan.delete.len(),
                        plan.blackholes.len()
                    );
                }
                Err(e) => {
                    self.metrics.record_pass(false);
                    error!("Error reconciling routes: {:#}", e);
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    async fn reconcile(&self) -> anyhow::Result<RoutePlan> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let nodes = nodes.list(&ListParams::default()).await?;
        let desired = desired_routes(&nodes.items);
        debug!("Found {} nodes with {} pod CIDRs", nodes.items.len(), desired.len());

        let existing = self
            .reconciler
            .list_internal_routes(&self.cluster_name)
            .await?;
        let plan = plan_routes(&desired, &existing, &self.managed);

        self.metrics.blackhole_routes.set(plan.blackholes.len() as i64);
        for route in &plan.blackholes {
            warn!(
                "Route {} points at no node's internal address",
                route.destination_cidr
            );
        }

        for d in &plan.create {
            match self
                .reconciler
                .create_route(&self.cluster_name, &d.name_hint, &d.route)
                .await
            {
                Ok(()) => self.metrics.routes_created_total.inc(),
                Err(e) => {
                    self.metrics.record_operation_error("create");
                    error!("Could not create route {}: {}", d.route, e);
                }
            }
        }

        for route in &plan.delete {
            match self.reconciler.delete_route(&self.cluster_name, route).await {
                Ok(()) => self.metrics.routes_deleted_total.inc(),
                Err(e) => {
                    self.metrics.record_operation_error("delete");
                    error!("Could not delete route {}: {}", route, e);
                }
            }
        }

        Ok(plan)
    }
}
