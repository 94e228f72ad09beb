//! Input records, one per VM.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Replace the NIC of `vm_name` and end up with `target_ip` on the new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRequest {
    #[serde(rename = "VMName")]
    pub vm_name: String,
    #[serde(rename = "ResourceGroup")]
    pub resource_group: String,
    #[serde(rename = "VNetResourceGroup")]
    pub vnet_resource_group: String,
    #[serde(rename = "VNetName")]
    pub vnet_name: String,
    #[serde(rename = "SubnetName")]
    pub subnet_name: String,
    /// Older sheets call this column `SecondaryIPAddress`.
    #[serde(rename = "TargetIPAddress", alias = "SecondaryIPAddress")]
    pub target_ip: Ipv4Addr,
}

/// Desired accelerated networking flag for one VM's primary NIC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccelRequest {
    #[serde(rename = "VMName")]
    pub vm_name: String,
    #[serde(rename = "ResourceGroup")]
    pub resource_group: String,
    /// Kept verbatim so a bad value skips the record instead of failing the file.
    #[serde(rename = "AcceleratedNetworking")]
    pub accelerated_networking: String,
}

impl AccelRequest {
    /// `None` when the flag is not a recognisable boolean.
    pub fn desired(&self) -> Option<bool> {
        match self.accelerated_networking.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "enabled" | "enable" | "1" | "on" => Some(true),
            "false" | "no" | "disabled" | "disable" | "0" | "off" => Some(false),
            _ => None,
        }
    }
}
