//! Prometheus metrics for reconcile passes

use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Counters describing what the controller did to the router
pub struct ReconcileMetrics {
    /// Reconcile passes by result ("success" or "error")
    pub reconcile_passes_total: IntCounterVec,
    /// Routes created
    pub routes_created_total: IntCounter,
    /// Routes deleted
    pub routes_deleted_total: IntCounter,
    /// Failed create/delete calls by operation
    pub route_operation_errors_total: IntCounterVec,
    /// Routes whose next-hop is no node's internal address, as of the last pass
    pub blackhole_routes: IntGauge,
    registry: Registry,
}

impl ReconcileMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let reconcile_passes_total = IntCounterVec::new(
            Opts::new("route_reconcile_passes_total", "Total route reconcile passes"),
            &["result"],
        )?;
        let routes_created_total = IntCounter::new("routes_created_total", "Total routes created")?;
        let routes_deleted_total = IntCounter::new("routes_deleted_total", "Total routes deleted")?;
        let route_operation_errors_total = IntCounterVec::new(
            Opts::new(
                "route_operation_errors_total",
                "Total failed route create/delete operations",
            ),
            &["operation"],
        )?;
        let blackhole_routes = IntGauge::new(
            "blackhole_routes",
            "Routes on the router whose next-hop is no node's internal address",
        )?;

        registry.register(Box::new(reconcile_passes_total.clone()))?;
        registry.register(Box::new(routes_created_total.clone()))?;
        registry.register(Box::new(routes_deleted_total.clone()))?;
        registry.register(Box::new(route_operation_errors_total.clone()))?;
        registry.register(Box::new(blackhole_routes.clone()))?;

        Ok(Self {
            reconcile_passes_total,
            routes_created_total,
            routes_deleted_total,
            route_operation_errors_total,
            blackhole_routes,
            registry,
        })
    }

    pub fn record_pass(&self, success: bool) {
        let result = if success { "success" } else { "error" };
        self.reconcile_passes_total.with_label_values(&[result]).inc();
    }

    pub fn record_operation_error(&self, operation: &str) {
        self.route_operation_errors_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Render all metrics in the text exposition format
    pub fn gather(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
