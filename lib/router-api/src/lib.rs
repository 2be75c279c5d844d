//! Route reconciler API types
//!
//! This library defines the data exchanged between the route reconciler and
//! the remote control plane:
//! - Route: a logical "destination CIDR -> node" route
//! - RouteEntry / RouterState: a router's extra-route table
//! - AddressFilterEntry / PortState: a port's allowed-address-pairs
//! - Instance / NodeAddress / AttachedInterface: compute-side lookups

pub mod compute;
pub mod network;
pub mod route;

pub use compute::{AddressFamily, AddressRole, AttachedInterface, FixedIp, Instance, NodeAddress};
pub use network::{AddressFilterEntry, PortState, RouteEntry, RouterState};
pub use route::Route;
