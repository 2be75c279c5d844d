//! Core route reconciliation
//!
//! This library provides:
//! - Collaborator traits for compute, router and port access
//! - Next-hop resolution from node addresses
//! - A compensation stack for undoing partially applied updates
//! - The route reconciler keeping router routes and port filters in step

pub mod address;
pub mod client;
pub mod compensation;
pub mod config;
pub mod error;
pub mod reconciler;

#[cfg(test)]
mod testing;

pub use address::{AddressResolver, NextHop};
pub use client::{ComputeClient, PortFilterClient, RouteTableClient};
pub use compensation::{Compensation, CompensationStack, Snapshot, UnwindOutcome};
pub use config::RouterOpts;
pub use error::{CoreError, ResourceKind, Result};
pub use reconciler::RouteReconciler;
