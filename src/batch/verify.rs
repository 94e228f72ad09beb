//! Post-run verification.
//!
//! Re-reads the new NIC of every VM that was not a failure and compares the
//! address and allocation method with the requested target.

use super::BatchSummary;
use crate::azure::ControlPlane;
use crate::models::{resource_name, IpAllocation, ReplacementRequest};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub vm_name: String,
    pub resource_group: String,
    pub nic_name: String,
    pub expected_ip: Ipv4Addr,
    pub observed_ip: Option<Ipv4Addr>,
    pub observed_allocation: Option<IpAllocation>,
    pub passed: bool,
    pub detail: String,
}

/// Check that `nic_name` holds `expected_ip` with static allocation.
pub fn verify_nic<C: ControlPlane + ?Sized>(
    client: &C,
    vm_name: &str,
    nic_name: &str,
    resource_group: &str,
    expected_ip: Ipv4Addr,
) -> Verification {
    let mut verification = Verification {
        vm_name: vm_name.to_string(),
        resource_group: resource_group.to_string(),
        nic_name: nic_name.to_string(),
        expected_ip,
        observed_ip: None,
        observed_allocation: None,
        passed: false,
        detail: String::new(),
    };

    match client.get_nic(nic_name, resource_group) {
        Ok(Some(nic)) => {
            verification.observed_ip = nic.private_ip;
            verification.observed_allocation = Some(nic.ip_allocation);
            verification.passed =
                nic.private_ip == Some(expected_ip) && nic.ip_allocation == IpAllocation::Static;
            verification.detail = match nic.private_ip {
                Some(ip) => format!("{ip} ({})", nic.ip_allocation),
                None => format!("no address ({})", nic.ip_allocation),
            };
        }
        Ok(None) => verification.detail = "NIC not found".to_string(),
        Err(e) => verification.detail = format!("cannot read NIC: {e}"),
    }

    if verification.passed {
        log::info!("verify {vm_name}/{nic_name}: PASS {}", verification.detail);
    } else {
        log::warn!(
            "verify {vm_name}/{nic_name}: FAIL expected {expected_ip} (Static), got {}",
            verification.detail
        );
    }
    verification
}

/// Verify every VM of a finished batch that did not fail.
pub fn verify_batch<C: ControlPlane + ?Sized>(
    client: &C,
    summary: &BatchSummary,
) -> Vec<Verification> {
    summary
        .reports
        .iter()
        .filter(|r| !r.is_failed())
        .filter_map(|r| {
            let nic = r.new_nic.as_deref()?;
            Some(verify_nic(
                client,
                &r.vm_name,
                nic,
                &r.resource_group,
                r.target_ip,
            ))
        })
        .collect()
}

/// Verify requests without a preceding run, using each VM's current first NIC.
pub fn verify_requests<C: ControlPlane + ?Sized>(
    client: &C,
    requests: &[ReplacementRequest],
) -> Vec<Verification> {
    requests
        .iter()
        .map(|req| {
            let nic_id = match client.get_vm(&req.vm_name, &req.resource_group) {
                Ok(Some(vm)) => vm.first_nic_id().map(str::to_string),
                _ => None,
            };
            match nic_id {
                Some(id) => {
                    let mut v =
                        verify_nic(client, &req.vm_name, &id, &req.resource_group, req.target_ip);
                    v.nic_name = resource_name(&id).to_string();
                    v
                }
                None => Verification {
                    vm_name: req.vm_name.clone(),
                    resource_group: req.resource_group.clone(),
                    nic_name: String::new(),
                    expected_ip: req.target_ip,
                    observed_ip: None,
                    observed_allocation: None,
                    passed: false,
                    detail: "VM or NIC not found".to_string(),
                },
            }
        })
        .collect()
}
