//! In-memory control plane used by the integration tests.
#![allow(dead_code)]

use azure_nic_replace::azure::{ControlPlane, PowerAction};
use azure_nic_replace::error::{CliError, CliResult};
use azure_nic_replace::models::{
    resource_name, IpAllocation, NicResource, NicSpec, PowerState, ReplacementRequest,
    VmResource,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;

pub const SUB: &str = "/subscriptions/00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetVm,
    GetNic,
    CreateNic,
    DeleteNic,
    AttachNic,
    DetachNic,
    Start,
    Deallocate,
    UpdateIp,
    SetAccel,
    ListIps,
}

impl Op {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Op::GetVm | Op::GetNic | Op::ListIps)
    }
}

#[derive(Debug, Default)]
pub struct CloudState {
    pub vms: BTreeMap<String, VmResource>,
    pub nics: BTreeMap<String, NicResource>,
    /// `None` makes the subnet query fail.
    pub available_ips: Option<Vec<Ipv4Addr>>,
    pub fail: HashSet<(Op, String)>,
    /// Calls that report success without changing anything.
    pub ignore: HashSet<(Op, String)>,
    /// After this call, the next `n` VM reads find nothing.
    pub vm_unreadable_after: Option<(Op, String, u32)>,
    pub hidden_vm_reads: u32,
    /// Power state never changes, every poll times out.
    pub stuck_power: bool,
    pub calls: Vec<(Op, String)>,
    /// Deletes requested for a NIC that was attached at the time.
    pub unsafe_deletes: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeCloud {
    pub state: RefCell<CloudState>,
}

pub fn subnet_id() -> String {
    format!("{SUB}/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/Subnet-App")
}

pub fn vm_id(rg: &str, name: &str) -> String {
    format!("{SUB}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachines/{name}")
}

pub fn nic_id(rg: &str, name: &str) -> String {
    format!("{SUB}/resourceGroups/{rg}/providers/Microsoft.Network/networkInterfaces/{name}")
}

pub fn request(vm: &str, target: &str) -> ReplacementRequest {
    ReplacementRequest {
        vm_name: vm.to_string(),
        resource_group: "rg1".to_string(),
        vnet_resource_group: "rg-net".to_string(),
        vnet_name: "vnet1".to_string(),
        subnet_name: "Subnet-App".to_string(),
        target_ip: target.parse().expect("bad test IP"),
    }
}

fn key(name: &str) -> String {
    resource_name(name).to_ascii_lowercase()
}

impl FakeCloud {
    pub fn new() -> Self {
        let cloud = FakeCloud::default();
        cloud.state.borrow_mut().available_ips = Some(vec!["10.0.0.4".parse().unwrap()]);
        cloud
    }

    /// Running VM `vm` in rg1 with one NIC named `nic_name` holding `ip`.
    pub fn with_vm(self, vm: &str, nic_name: &str, ip: &str) -> Self {
        let vm_id = vm_id("rg1", vm);
        let nic = NicResource {
            id: nic_id("rg1", nic_name),
            name: nic_name.to_string(),
            resource_group: "rg1".to_string(),
            location: "australiaeast".to_string(),
            subnet_id: subnet_id(),
            ip_config_name: "ipconfig1".to_string(),
            private_ip: Some(ip.parse().unwrap()),
            ip_allocation: IpAllocation::Dynamic,
            nsg_id: Some(format!(
                "{SUB}/resourceGroups/rg1/providers/Microsoft.Network/networkSecurityGroups/{vm}-nsg"
            )),
            accelerated_networking: true,
            attached_vm_id: Some(vm_id.clone()),
        };
        {
            let mut state = self.state.borrow_mut();
            state.vms.insert(
                key(vm),
                VmResource {
                    id: vm_id,
                    name: vm.to_string(),
                    resource_group: "rg1".to_string(),
                    location: "australiaeast".to_string(),
                    power_state: PowerState::Running,
                    attached_nic_ids: vec![nic.id.clone()],
                },
            );
            state.nics.insert(key(nic_name), nic);
        }
        self
    }

    /// Extra NIC, attached to `attached_to` when given.
    pub fn with_nic(self, name: &str, ip: &str, attached_to: Option<&str>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let nic = NicResource {
                id: nic_id("rg1", name),
                name: name.to_string(),
                resource_group: "rg1".to_string(),
                location: "australiaeast".to_string(),
                subnet_id: subnet_id(),
                ip_config_name: "ipconfig1".to_string(),
                private_ip: Some(ip.parse().unwrap()),
                ip_allocation: IpAllocation::Static,
                nsg_id: None,
                accelerated_networking: false,
                attached_vm_id: attached_to.map(|vm| vm_id("rg1", vm)),
            };
            if let Some(vm) = attached_to {
                if let Some(vm) = state.vms.get_mut(&key(vm)) {
                    vm.attached_nic_ids.push(nic.id.clone());
                }
            }
            state.nics.insert(key(name), nic);
        }
        self
    }

    pub fn fail_on(self, op: Op, target: &str) -> Self {
        self.state.borrow_mut().fail.insert((op, key(target)));
        self
    }

    pub fn ignore_on(self, op: Op, target: &str) -> Self {
        self.state.borrow_mut().ignore.insert((op, key(target)));
        self
    }

    pub fn vm_unreadable_after(self, op: Op, target: &str, reads: u32) -> Self {
        self.state.borrow_mut().vm_unreadable_after = Some((op, key(target), reads));
        self
    }

    pub fn without_available_ips(self) -> Self {
        self.state.borrow_mut().available_ips = None;
        self
    }

    pub fn stuck_power(self) -> Self {
        self.state.borrow_mut().stuck_power = true;
        self
    }

    pub fn vm(&self, name: &str) -> VmResource {
        self.state.borrow().vms[&key(name)].clone()
    }

    pub fn nic(&self, name: &str) -> Option<NicResource> {
        self.state.borrow().nics.get(&key(name)).cloned()
    }

    pub fn calls(&self) -> Vec<(Op, String)> {
        self.state.borrow().calls.clone()
    }

    pub fn called(&self, op: Op, target: &str) -> bool {
        self.position(op, target).is_some()
    }

    pub fn position(&self, op: Op, target: &str) -> Option<usize> {
        let target = key(target);
        self.state
            .borrow()
            .calls
            .iter()
            .position(|(o, t)| *o == op && *t == target)
    }

    pub fn unsafe_deletes(&self) -> Vec<String> {
        self.state.borrow().unsafe_deletes.clone()
    }

    /// Log the call and apply failure injection. `Ok(false)` means the call
    /// is accepted but has no effect.
    fn enter(&self, op: Op, target: &str) -> CliResult<bool> {
        let target = key(target);
        let mut state = self.state.borrow_mut();
        state.calls.push((op, target.clone()));
        if state.fail.contains(&(op, target.clone())) {
            return Err(failed(op, &target, "ERROR: (InjectedFailure) simulated provider error"));
        }
        if let Some((trigger_op, trigger_target, reads)) = state.vm_unreadable_after.clone() {
            if trigger_op == op && trigger_target == target {
                state.hidden_vm_reads = reads;
                state.vm_unreadable_after = None;
            }
        }
        Ok(!state.ignore.contains(&(op, target)))
    }
}

fn failed(op: Op, target: &str, stderr: &str) -> CliError {
    CliError::Failed {
        cmd: format!("fake {op:?} {target}"),
        code: Some(1),
        stderr: stderr.to_string(),
    }
}

impl ControlPlane for FakeCloud {
    fn get_vm(&self, name: &str, _resource_group: &str) -> CliResult<Option<VmResource>> {
        self.enter(Op::GetVm, name)?;
        let mut state = self.state.borrow_mut();
        if state.hidden_vm_reads > 0 {
            state.hidden_vm_reads -= 1;
            return Ok(None);
        }
        Ok(state.vms.get(&key(name)).cloned())
    }

    fn get_nic(&self, id_or_name: &str, _resource_group: &str) -> CliResult<Option<NicResource>> {
        self.enter(Op::GetNic, id_or_name)?;
        Ok(self.state.borrow().nics.get(&key(id_or_name)).cloned())
    }

    fn create_nic(&self, spec: &NicSpec) -> CliResult<NicResource> {
        self.enter(Op::CreateNic, &spec.name)?;
        let mut state = self.state.borrow_mut();
        if state.nics.contains_key(&key(&spec.name)) {
            return Err(failed(Op::CreateNic, &spec.name, "ERROR: (Conflict) exists"));
        }
        if state
            .nics
            .values()
            .any(|n| n.private_ip == Some(spec.private_ip))
        {
            return Err(failed(
                Op::CreateNic,
                &spec.name,
                "ERROR: (PrivateIPAddressInUse) address in use",
            ));
        }
        let nic = NicResource {
            id: nic_id(&spec.resource_group, &spec.name),
            name: spec.name.clone(),
            resource_group: spec.resource_group.clone(),
            location: spec.location.clone(),
            subnet_id: spec.subnet_id.clone(),
            ip_config_name: "ipconfig1".to_string(),
            private_ip: Some(spec.private_ip),
            ip_allocation: IpAllocation::Static,
            nsg_id: spec.nsg_id.clone(),
            accelerated_networking: spec.accelerated_networking,
            attached_vm_id: None,
        };
        state.nics.insert(key(&spec.name), nic.clone());
        Ok(nic)
    }

    fn delete_nic(&self, name: &str, _resource_group: &str) -> CliResult<()> {
        {
            let mut state = self.state.borrow_mut();
            let attached = state
                .nics
                .get(&key(name))
                .map(|n| n.is_attached())
                .unwrap_or(false);
            if attached {
                state.unsafe_deletes.push(key(name));
            }
        }
        self.enter(Op::DeleteNic, name)?;
        let mut state = self.state.borrow_mut();
        match state.nics.get(&key(name)) {
            None => Err(failed(Op::DeleteNic, name, "ERROR: (NotFound) NIC not found")),
            Some(n) if n.is_attached() => {
                Err(failed(Op::DeleteNic, name, "ERROR: (NicInUse) attached"))
            }
            Some(_) => {
                state.nics.remove(&key(name));
                Ok(())
            }
        }
    }

    fn attach_nic(&self, vm_name: &str, _resource_group: &str, nic_id: &str) -> CliResult<()> {
        if !self.enter(Op::AttachNic, nic_id)? {
            return Ok(());
        }
        let mut state = self.state.borrow_mut();
        let vm_id = state.vms[&key(vm_name)].id.clone();
        let nic = state
            .nics
            .get_mut(&key(nic_id))
            .ok_or_else(|| failed(Op::AttachNic, nic_id, "ERROR: (NotFound)"))?;
        nic.attached_vm_id = Some(vm_id);
        let nic_id = nic.id.clone();
        // Attached as primary, so first in the list.
        if let Some(vm) = state.vms.get_mut(&key(vm_name)) {
            vm.attached_nic_ids.insert(0, nic_id);
        }
        Ok(())
    }

    fn detach_nic(&self, vm_name: &str, _resource_group: &str, nic_id: &str) -> CliResult<()> {
        if !self.enter(Op::DetachNic, nic_id)? {
            return Ok(());
        }
        let mut state = self.state.borrow_mut();
        let vm = state
            .vms
            .get_mut(&key(vm_name))
            .ok_or_else(|| failed(Op::DetachNic, vm_name, "ERROR: (NotFound)"))?;
        let before = vm.attached_nic_ids.len();
        vm.attached_nic_ids
            .retain(|id| key(id) != key(nic_id));
        if vm.attached_nic_ids.len() == before {
            return Err(failed(Op::DetachNic, nic_id, "ERROR: NIC not attached"));
        }
        if let Some(nic) = state.nics.get_mut(&key(nic_id)) {
            nic.attached_vm_id = None;
        }
        Ok(())
    }

    fn set_power(&self, vm_name: &str, _resource_group: &str, action: PowerAction) -> CliResult<()> {
        let op = match action {
            PowerAction::Start => Op::Start,
            PowerAction::Deallocate => Op::Deallocate,
        };
        self.enter(op, vm_name)?;
        let mut state = self.state.borrow_mut();
        if state.stuck_power {
            return Ok(());
        }
        if let Some(vm) = state.vms.get_mut(&key(vm_name)) {
            vm.power_state = match action {
                PowerAction::Start => PowerState::Running,
                PowerAction::Deallocate => PowerState::Deallocated,
            };
        }
        Ok(())
    }

    fn update_nic_ip_config(&self, nic: &NicResource, ip: Ipv4Addr) -> CliResult<()> {
        self.enter(Op::UpdateIp, &nic.name)?;
        let mut state = self.state.borrow_mut();
        if state
            .nics
            .values()
            .any(|n| n.private_ip == Some(ip) && key(&n.name) != key(&nic.name))
        {
            return Err(failed(
                Op::UpdateIp,
                &nic.name,
                "ERROR: (PrivateIPAddressInUse) address in use",
            ));
        }
        let nic = state
            .nics
            .get_mut(&key(&nic.name))
            .ok_or_else(|| failed(Op::UpdateIp, &nic.name, "ERROR: (NotFound)"))?;
        nic.private_ip = Some(ip);
        nic.ip_allocation = IpAllocation::Static;
        Ok(())
    }

    fn set_accelerated_networking(
        &self,
        nic_name: &str,
        _resource_group: &str,
        enabled: bool,
    ) -> CliResult<()> {
        self.enter(Op::SetAccel, nic_name)?;
        let mut state = self.state.borrow_mut();
        let nic = state
            .nics
            .get_mut(&key(nic_name))
            .ok_or_else(|| failed(Op::SetAccel, nic_name, "ERROR: (NotFound)"))?;
        nic.accelerated_networking = enabled;
        Ok(())
    }

    fn list_available_ips(&self, subnet_id: &str) -> CliResult<Vec<Ipv4Addr>> {
        self.enter(Op::ListIps, subnet_id)?;
        self.state
            .borrow()
            .available_ips
            .clone()
            .ok_or_else(|| failed(Op::ListIps, subnet_id, "ERROR: (AuthorizationFailed)"))
    }
}
