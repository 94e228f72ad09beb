//! Replacement NIC naming across re-runs.
//!
//! The preferred name is `{vm}-nic-new`. A VM whose live NIC already carries
//! that name went through an earlier run, so the alternate
//! `{vm}-nic-replacement` is used instead. There is no numeric suffixing.

use crate::azure::ControlPlane;
use crate::error::CliResult;
use crate::models::NicResource;

pub fn new_nic_name(vm_name: &str) -> String {
    format!("{vm_name}-nic-new")
}

pub fn replacement_nic_name(vm_name: &str) -> String {
    format!("{vm_name}-nic-replacement")
}

/// Pick the name for the NIC about to be created, never equal to the original.
pub fn resolve_candidate_name(vm_name: &str, original_nic_name: &str) -> String {
    let preferred = new_nic_name(vm_name);
    if original_nic_name.eq_ignore_ascii_case(&preferred) {
        log::info!(
            "Original NIC of {vm_name} is already '{preferred}', using '{}'",
            replacement_nic_name(vm_name)
        );
        replacement_nic_name(vm_name)
    } else {
        preferred
    }
}

/// What already exists under the candidate name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateCheck {
    Free,
    /// Detached NIC left behind by an earlier failed run, safe to delete.
    Leftover(NicResource),
    /// Attached to some VM, needs manual intervention.
    Attached(NicResource),
}

pub fn check_candidate<C: ControlPlane + ?Sized>(
    client: &C,
    name: &str,
    resource_group: &str,
) -> CliResult<CandidateCheck> {
    Ok(match client.get_nic(name, resource_group)? {
        None => CandidateCheck::Free,
        Some(nic) if nic.is_attached() => CandidateCheck::Attached(nic),
        Some(nic) => CandidateCheck::Leftover(nic),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_candidate_name_fresh() {
        assert_eq!(resolve_candidate_name("vm1", "vm1-nic"), "vm1-nic-new");
        assert_eq!(
            resolve_candidate_name("vm1", "vm1-nic-replacement"),
            "vm1-nic-new"
        );
    }

    #[test]
    fn test_resolve_candidate_name_rerun() {
        assert_eq!(
            resolve_candidate_name("vm1", "vm1-nic-new"),
            "vm1-nic-replacement"
        );
        assert_eq!(
            resolve_candidate_name("VM1", "vm1-nic-new"),
            "VM1-nic-replacement"
        );
    }

    #[test]
    fn test_resolve_candidate_name_never_collides() {
        for vm in ["a", "web-01", "db_primary", "x-nic-new"] {
            let first = resolve_candidate_name(vm, &format!("{vm}-nic"));
            let second = resolve_candidate_name(vm, &first);
            assert_ne!(first, second);
            assert_eq!(second, replacement_nic_name(vm));
        }
    }
}
