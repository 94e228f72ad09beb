//! Domain models for NIC replacement.
//!
//! - [`ReplacementRequest`] and [`AccelRequest`] - input records
//! - [`VmResource`] and [`PowerState`] - virtual machine view
//! - [`NicResource`], [`NicSpec`] and [`IpAllocation`] - network interface view
//! - [`Ipv4`] - CIDR helpers for the temporary address fallback

mod ipv4;
mod nic;
mod request;
mod vm;

// Re-export public types
pub use ipv4::Ipv4;
pub use nic::{resource_name, subnet_matches, IpAllocation, NicResource, NicSpec};
pub use request::{AccelRequest, ReplacementRequest};
pub use vm::{PowerState, VmResource};

pub(crate) use nic::{AzNicCreate, AzNicShow};
pub(crate) use vm::AzVmShow;
