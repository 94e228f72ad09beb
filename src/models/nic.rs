//! Network interface model as reported by `az network nic show`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Private address allocation of an IP configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IpAllocation {
    Static,
    #[default]
    Dynamic,
}

impl fmt::Display for IpAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpAllocation::Static => write!(f, "Static"),
            IpAllocation::Dynamic => write!(f, "Dynamic"),
        }
    }
}

/// A NIC with its primary IP configuration flattened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicResource {
    pub id: String,
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub subnet_id: String,
    pub ip_config_name: String,
    pub private_ip: Option<Ipv4Addr>,
    pub ip_allocation: IpAllocation,
    pub nsg_id: Option<String>,
    pub accelerated_networking: bool,
    pub attached_vm_id: Option<String>,
}

impl NicResource {
    pub fn is_attached(&self) -> bool {
        self.attached_vm_id.is_some()
    }
}

/// What to create for the replacement NIC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicSpec {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub subnet_id: String,
    /// Setting an explicit address makes the provider allocate it statically.
    pub private_ip: Ipv4Addr,
    pub nsg_id: Option<String>,
    pub accelerated_networking: bool,
}

/// Last path segment of an Azure resource id.
pub fn resource_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Check a subnet resource id against the VNet/subnet named on a request.
pub fn subnet_matches(subnet_id: &str, vnet_rg: &str, vnet: &str, subnet: &str) -> bool {
    let id = subnet_id.to_ascii_lowercase();
    let suffix = format!(
        "/resourcegroups/{}/providers/microsoft.network/virtualnetworks/{}/subnets/{}",
        vnet_rg.to_ascii_lowercase(),
        vnet.to_ascii_lowercase(),
        subnet.to_ascii_lowercase()
    );
    id.ends_with(&suffix)
}

/// Raw shape of `az network nic show --output json`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AzNicShow {
    id: String,
    name: String,
    resource_group: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    enable_accelerated_networking: Option<bool>,
    network_security_group: Option<AzIdRef>,
    virtual_machine: Option<AzIdRef>,
    #[serde(default)]
    ip_configurations: Vec<AzIpConfig>,
}

/// `az network nic create` wraps the NIC in a `NewNIC` object.
#[derive(Deserialize, Debug)]
pub(crate) struct AzNicCreate {
    #[serde(rename = "NewNIC")]
    pub(crate) new_nic: AzNicShow,
}

#[derive(Deserialize, Debug)]
struct AzIdRef {
    id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AzIpConfig {
    name: String,
    #[serde(default)]
    primary: Option<bool>,
    #[serde(rename = "privateIPAddress")]
    private_ip_address: Option<Ipv4Addr>,
    #[serde(rename = "privateIPAllocationMethod")]
    private_ip_allocation_method: Option<IpAllocation>,
    subnet: Option<AzIdRef>,
}

impl From<AzNicShow> for NicResource {
    fn from(raw: AzNicShow) -> Self {
        let mut configs = raw.ip_configurations;
        let primary = configs
            .iter()
            .position(|c| c.primary.unwrap_or(false))
            .unwrap_or(0);
        let ip_config = (!configs.is_empty()).then(|| configs.swap_remove(primary));

        let (ip_config_name, private_ip, ip_allocation, subnet_id) = match ip_config {
            Some(c) => (
                c.name,
                c.private_ip_address,
                c.private_ip_allocation_method.unwrap_or_default(),
                c.subnet.map(|s| s.id).unwrap_or_default(),
            ),
            None => (
                "ipconfig1".to_string(),
                None,
                IpAllocation::Dynamic,
                String::new(),
            ),
        };

        NicResource {
            id: raw.id,
            name: raw.name,
            resource_group: raw.resource_group,
            location: raw.location,
            subnet_id,
            ip_config_name,
            private_ip,
            ip_allocation,
            nsg_id: raw.network_security_group.map(|n| n.id),
            accelerated_networking: raw.enable_accelerated_networking.unwrap_or(false),
            attached_vm_id: raw.virtual_machine.map(|v| v.id),
        }
    }
}
