//! Compensation stack for multi-resource updates
//!
//! Every committed write of a route operation records the collection it
//! replaced. If a later step fails the records are replayed newest first,
//! writing each snapshot back; on success the stack is disarmed and the
//! records are dropped.

use crate::client::{PortFilterClient, RouteTableClient};
use crate::{ResourceKind, Result};
use router_api::{AddressFilterEntry, RouteEntry};
use tracing::{debug, warn};

/// Collection contents captured before a write
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Snapshot {
    Routes(Vec<RouteEntry>),
    AddressPairs(Vec<AddressFilterEntry>),
}

/// Restores one collection on one resource to a snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compensation {
    pub resource_id: String,
    pub snapshot: Snapshot,
}

impl Compensation {
    pub fn restore_routes(router_id: impl Into<String>, routes: Vec<RouteEntry>) -> Self {
        Self {
            resource_id: router_id.into(),
            snapshot: Snapshot::Routes(routes),
        }
    }

    pub fn restore_address_pairs(port_id: impl Into<String>, pairs: Vec<AddressFilterEntry>) -> Self {
        Self {
            resource_id: port_id.into(),
            snapshot: Snapshot::AddressPairs(pairs),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self.snapshot {
            Snapshot::Routes(_) => ResourceKind::Router,
            Snapshot::AddressPairs(_) => ResourceKind::Port,
        }
    }

    /// Write the snapshot back. Replaying is harmless: the write is a
    /// whole-collection replace with the same contents.
    pub async fn apply(
        &self,
        routers: &dyn RouteTableClient,
        ports: &dyn PortFilterClient,
    ) -> Result<()> {
        match &self.snapshot {
            Snapshot::Routes(routes) => {
                debug!("Reverting routes change to router {}", self.resource_id);
                routers.update_routes(&self.resource_id, routes.clone()).await?;
            }
            Snapshot::AddressPairs(pairs) => {
                debug!("Reverting allowed-address-pairs change to port {}", self.resource_id);
                ports
                    .update_address_pairs(&self.resource_id, pairs.clone())
                    .await?;
            }
        }
        Ok(())
    }
}

/// Result of unwinding a stack
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnwindOutcome {
    pub restored: usize,
    pub failed: usize,
}

/// LIFO stack of compensations owned by a single route operation.
///
/// Both `disarm` and `unwind` consume the stack, so it is settled exactly once.
pub struct CompensationStack {
    operation: String,
    actions: Vec<Compensation>,
}

impl CompensationStack {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            actions: Vec::new(),
        }
    }

    /// Record a committed write
    pub fn push(&mut self, compensation: Compensation) {
        self.actions.push(compensation);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Pending compensations, oldest first
    pub fn pending(&self) -> &[Compensation] {
        &self.actions
    }

    /// The operation committed; forget all compensations
    pub fn disarm(mut self) {
        self.actions.clear();
    }

    /// Restore every recorded snapshot, most recent first. Failures are
    /// logged and do not stop the remaining restores.
    pub async fn unwind(
        mut self,
        routers: &dyn RouteTableClient,
        ports: &dyn PortFilterClient,
    ) -> UnwindOutcome {
        let actions = std::mem::take(&mut self.actions);
        let mut outcome = UnwindOutcome::default();

        for compensation in actions.iter().rev() {
            match compensation.apply(routers, ports).await {
                Ok(()) => outcome.restored += 1,
                Err(e) => {
                    warn!(
                        "Unable to reset {} {} during error unwind of {}: {}",
                        compensation.kind(),
                        compensation.resource_id,
                        self.operation,
                        e
                    );
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}

impl Drop for CompensationStack {
    fn drop(&mut self) {
        if !self.actions.is_empty() {
            warn!(
                "{} dropped with {} unapplied compensations",
                self.operation,
                self.actions.len()
            );
        }
    }
}
