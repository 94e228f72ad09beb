//! Virtual machine model as reported by `az vm show --show-details`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power state of a VM, reduced to what the workflow waits for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    Running,
    Deallocated,
    /// Anything else (`VM starting`, `VM deallocating`, `VM stopped`, ...).
    Transitioning(String),
}

impl PowerState {
    /// Map the `powerState` string of `az vm show -d`.
    pub fn from_az(raw: Option<&str>) -> PowerState {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "vm running" => PowerState::Running,
            Some(s) if s == "vm deallocated" => PowerState::Deallocated,
            Some(s) => PowerState::Transitioning(s),
            None => PowerState::Transitioning("unknown".to_string()),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Running => write!(f, "running"),
            PowerState::Deallocated => write!(f, "deallocated"),
            PowerState::Transitioning(s) => write!(f, "transitioning({s})"),
        }
    }
}

/// A virtual machine and the NICs attached to it, in provider order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmResource {
    pub id: String,
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub power_state: PowerState,
    pub attached_nic_ids: Vec<String>,
}

impl VmResource {
    pub fn attached_nic_count(&self) -> usize {
        self.attached_nic_ids.len()
    }

    pub fn first_nic_id(&self) -> Option<&str> {
        self.attached_nic_ids.first().map(String::as_str)
    }

    /// True when `nic_id` is attached, ids compared case-insensitively.
    pub fn has_nic(&self, nic_id: &str) -> bool {
        self.attached_nic_ids
            .iter()
            .any(|id| id.eq_ignore_ascii_case(nic_id))
    }
}

/// Raw shape of `az vm show -d --output json`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AzVmShow {
    #[serde(default)]
    id: String,
    name: String,
    resource_group: String,
    location: String,
    power_state: Option<String>,
    network_profile: Option<AzNetworkProfile>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AzNetworkProfile {
    #[serde(default)]
    network_interfaces: Vec<AzNicRef>,
}

#[derive(Deserialize, Debug)]
struct AzNicRef {
    id: String,
}

impl From<AzVmShow> for VmResource {
    fn from(raw: AzVmShow) -> Self {
        VmResource {
            id: raw.id,
            name: raw.name,
            resource_group: raw.resource_group,
            location: raw.location,
            power_state: PowerState::from_az(raw.power_state.as_deref()),
            attached_nic_ids: raw
                .network_profile
                .map(|p| p.network_interfaces.into_iter().map(|n| n.id).collect())
                .unwrap_or_default(),
        }
    }
}
