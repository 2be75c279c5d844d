//! OpenStack integration for the route reconciler
pub mod client;
pub mod compute;
pub mod network;

pub use client::{OpenStackClient, OpenStackOpts};
pub use compute::NovaCompute;
pub use network::NeutronNetwork;
