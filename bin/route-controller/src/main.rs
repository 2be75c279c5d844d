use anyhow::Result;
use kube::Client;
use router_core::RouteReconciler;
use router_openstack::{NeutronNetwork, NovaCompute, OpenStackClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod metrics;
mod route_controller;
mod server;

use config::ControllerConfig;
use metrics::ReconcileMetrics;
use route_controller::RouteController;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting route-controller...");

    let config = ControllerConfig::load()?;
    let managed = config.managed_networks()?;
    info!(
        "Managing routes for cluster {} on router {}",
        config.cluster_name, config.router.router_id
    );

    let openstack = OpenStackClient::new(&config.openstack)?;
    let compute = Arc::new(NovaCompute::new(openstack.clone()));
    let network = Arc::new(NeutronNetwork::new(openstack));
    let reconciler = RouteReconciler::new(compute, network.clone(), network, config.router.clone())?;

    let metrics = Arc::new(ReconcileMetrics::new()?);
    let metrics_addr = config.metrics_addr;
    let server_metrics = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(metrics_addr, server_metrics).await {
            error!("Metrics server error: {}", e);
        }
    });

    let client = Client::try_default().await?;
    let controller = RouteController::new(
        client,
        reconciler,
        config.cluster_name.clone(),
        managed,
        config.reconcile_interval(),
        metrics,
    );

    tokio::select! {
        result = controller.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received, exiting..."),
    }

    Ok(())
}

/// Log to stdout, filtered by RUST_LOG; LOG_FORMAT=json switches to JSON lines
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
