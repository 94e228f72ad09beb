//! Accelerated networking reconciliation.
//!
//! Independent of NIC replacement. Updates the flag in place on the VM's first
//! NIC, no deallocation needed.

use crate::azure::ControlPlane;
use crate::models::AccelRequest;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySet(bool),
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccelOutcome {
    Updated { nic: String, enabled: bool },
    Skipped(SkipReason),
    Failed(String),
}

impl fmt::Display for AccelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccelOutcome::Updated { nic, enabled } => {
                write!(f, "updated {nic} to accelerated networking={enabled}")
            }
            AccelOutcome::Skipped(SkipReason::AlreadySet(v)) => {
                write!(f, "no change, already {v}")
            }
            AccelOutcome::Skipped(SkipReason::InvalidInput(v)) => {
                write!(f, "skipped, invalid value '{v}'")
            }
            AccelOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccelReport {
    pub vm_name: String,
    pub resource_group: String,
    pub outcome: AccelOutcome,
}

pub fn reconcile_accelerated_networking<C: ControlPlane + ?Sized>(
    client: &C,
    request: &AccelRequest,
) -> AccelReport {
    let outcome = reconcile(client, request);
    match &outcome {
        AccelOutcome::Failed(_) => log::error!("{}: {outcome}", request.vm_name),
        _ => log::info!("{}: {outcome}", request.vm_name),
    }
    AccelReport {
        vm_name: request.vm_name.clone(),
        resource_group: request.resource_group.clone(),
        outcome,
    }
}

fn reconcile<C: ControlPlane + ?Sized>(client: &C, request: &AccelRequest) -> AccelOutcome {
    let Some(desired) = request.desired() else {
        return AccelOutcome::Skipped(SkipReason::InvalidInput(
            request.accelerated_networking.clone(),
        ));
    };

    let vm = match client.get_vm(&request.vm_name, &request.resource_group) {
        Ok(Some(vm)) => vm,
        Ok(None) => return AccelOutcome::Failed(format!("VM {} not found", request.vm_name)),
        Err(e) => return AccelOutcome::Failed(format!("cannot read VM: {e}")),
    };
    let Some(nic_id) = vm.first_nic_id() else {
        return AccelOutcome::Failed(format!("VM {} has no NIC", vm.name));
    };
    let nic = match client.get_nic(nic_id, &request.resource_group) {
        Ok(Some(nic)) => nic,
        Ok(None) => return AccelOutcome::Failed(format!("NIC {nic_id} not found")),
        Err(e) => return AccelOutcome::Failed(format!("cannot read NIC: {e}")),
    };

    if nic.accelerated_networking == desired {
        return AccelOutcome::Skipped(SkipReason::AlreadySet(desired));
    }
    match client.set_accelerated_networking(&nic.name, &nic.resource_group, desired) {
        Ok(()) => AccelOutcome::Updated {
            nic: nic.name,
            enabled: desired,
        },
        Err(e) => AccelOutcome::Failed(format!("update rejected: {e}")),
    }
}
