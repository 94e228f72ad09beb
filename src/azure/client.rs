//! Control-plane operations on VMs and NICs.
//!
//! [`ControlPlane`] is the seam the workflow talks to. [`AzCli`] implements it
//! by shelling out to `az` and parsing the JSON it prints.

use super::cli;
use crate::error::CliResult;
use crate::models::{AzNicCreate, AzNicShow, AzVmShow, NicResource, NicSpec, VmResource};
use std::net::Ipv4Addr;

/// Power transition requested with `--no-wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Start,
    Deallocate,
}

/// Imperative operations against the cloud provider.
///
/// Every call is attempted once. Any failure is reported as an `Err`, the
/// caller does not distinguish transient from permanent provider errors.
pub trait ControlPlane {
    fn get_vm(&self, name: &str, resource_group: &str) -> CliResult<Option<VmResource>>;

    /// Look up a NIC by full resource id or by name within `resource_group`.
    fn get_nic(&self, id_or_name: &str, resource_group: &str) -> CliResult<Option<NicResource>>;

    fn create_nic(&self, spec: &NicSpec) -> CliResult<NicResource>;

    fn delete_nic(&self, name: &str, resource_group: &str) -> CliResult<()>;

    /// Attach `nic_id` and make it the primary NIC.
    fn attach_nic(&self, vm_name: &str, resource_group: &str, nic_id: &str) -> CliResult<()>;

    fn detach_nic(&self, vm_name: &str, resource_group: &str, nic_id: &str) -> CliResult<()>;

    /// Fire and forget, completion is observed by polling [`ControlPlane::get_vm`].
    fn set_power(&self, vm_name: &str, resource_group: &str, action: PowerAction)
        -> CliResult<()>;

    /// Set the primary IP configuration to `ip` with static allocation.
    fn update_nic_ip_config(&self, nic: &NicResource, ip: Ipv4Addr) -> CliResult<()>;

    fn set_accelerated_networking(
        &self,
        nic_name: &str,
        resource_group: &str,
        enabled: bool,
    ) -> CliResult<()>;

    /// Free addresses in a subnet, possibly none.
    fn list_available_ips(&self, subnet_id: &str) -> CliResult<Vec<Ipv4Addr>>;
}

/// [`ControlPlane`] backed by the `az` command-line client.
#[derive(Debug, Default, Clone)]
pub struct AzCli;

impl AzCli {
    pub fn new() -> Self {
        AzCli
    }
}

/// Map a provider "not found" failure to `Ok(None)`.
fn optional<T>(result: CliResult<T>) -> CliResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn nic_selector(id_or_name: &str, resource_group: &str) -> String {
    if id_or_name.starts_with("/subscriptions/") {
        format!("--ids {id_or_name}")
    } else {
        format!("-g '{resource_group}' -n '{id_or_name}'")
    }
}

impl ControlPlane for AzCli {
    fn get_vm(&self, name: &str, resource_group: &str) -> CliResult<Option<VmResource>> {
        let cmd = format!("az vm show -d -g '{resource_group}' -n '{name}' --output json");
        let raw: Option<AzVmShow> = optional(cli::run_json(&cmd))?;
        Ok(raw.map(VmResource::from))
    }

    fn get_nic(&self, id_or_name: &str, resource_group: &str) -> CliResult<Option<NicResource>> {
        let cmd = format!(
            "az network nic show {} --output json",
            nic_selector(id_or_name, resource_group)
        );
        let raw: Option<AzNicShow> = optional(cli::run_json(&cmd))?;
        Ok(raw.map(NicResource::from))
    }

    fn create_nic(&self, spec: &NicSpec) -> CliResult<NicResource> {
        let mut cmd = format!(
            "az network nic create -g '{rg}' -n '{name}' --location '{location}' --subnet {subnet} --private-ip-address {ip} --accelerated-networking {accel} --output json",
            rg = spec.resource_group,
            name = spec.name,
            location = spec.location,
            subnet = spec.subnet_id,
            ip = spec.private_ip,
            accel = spec.accelerated_networking,
        );
        if let Some(nsg) = &spec.nsg_id {
            cmd.push_str(&format!(" --network-security-group {nsg}"));
        }
        let raw: AzNicCreate = cli::run_json(&cmd)?;
        Ok(NicResource::from(raw.new_nic))
    }

    fn delete_nic(&self, name: &str, resource_group: &str) -> CliResult<()> {
        cli::run(&format!(
            "az network nic delete -g '{resource_group}' -n '{name}'"
        ))?;
        Ok(())
    }

    fn attach_nic(&self, vm_name: &str, resource_group: &str, nic_id: &str) -> CliResult<()> {
        cli::run(&format!(
            "az vm nic add -g '{resource_group}' --vm-name '{vm_name}' --nics {nic_id} --primary-nic {nic_id} --output none"
        ))?;
        Ok(())
    }

    fn detach_nic(&self, vm_name: &str, resource_group: &str, nic_id: &str) -> CliResult<()> {
        cli::run(&format!(
            "az vm nic remove -g '{resource_group}' --vm-name '{vm_name}' --nics {nic_id} --output none"
        ))?;
        Ok(())
    }

    fn set_power(
        &self,
        vm_name: &str,
        resource_group: &str,
        action: PowerAction,
    ) -> CliResult<()> {
        let verb = match action {
            PowerAction::Start => "start",
            PowerAction::Deallocate => "deallocate",
        };
        cli::run(&format!(
            "az vm {verb} -g '{resource_group}' -n '{vm_name}' --no-wait"
        ))?;
        Ok(())
    }

    fn update_nic_ip_config(&self, nic: &NicResource, ip: Ipv4Addr) -> CliResult<()> {
        cli::run(&format!(
            "az network nic ip-config update -g '{rg}' --nic-name '{nic}' -n '{config}' --private-ip-address {ip} --output none",
            rg = nic.resource_group,
            nic = nic.name,
            config = nic.ip_config_name,
        ))?;
        Ok(())
    }

    fn set_accelerated_networking(
        &self,
        nic_name: &str,
        resource_group: &str,
        enabled: bool,
    ) -> CliResult<()> {
        cli::run(&format!(
            "az network nic update -g '{resource_group}' -n '{nic_name}' --accelerated-networking {enabled} --output none"
        ))?;
        Ok(())
    }

    fn list_available_ips(&self, subnet_id: &str) -> CliResult<Vec<Ipv4Addr>> {
        let cmd = format!("az network vnet subnet list-available-ips --ids {subnet_id} --output json");
        let ips: Option<Vec<Ipv4Addr>> = cli::run_json(&cmd)?;
        Ok(ips.unwrap_or_default())
    }
}
