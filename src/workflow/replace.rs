//! The per-VM NIC replacement state machine.
//!
//! Forward order:
//! `Inspecting -> Deallocating -> AwaitingDeallocated -> NamingResolved ->
//! TempNicCreated -> NewNicAttached -> OldNicDetached -> OldNicDeleted ->
//! IpFinalized -> Starting -> AwaitingRunning -> Done`.
//!
//! A failure up to and including `OldNicDetached` is fatal for the VM and runs
//! the compensation for that phase. Past that point the VM already runs on
//! its new NIC, so failures only add warnings.

use super::naming::{check_candidate, resolve_candidate_name, CandidateCheck};
use super::poller::await_power_state;
use super::session::{Session, VmReport};
use super::temp_ip::choose_temporary_ip;
use super::Phase;
use crate::azure::{ControlPlane, PowerAction};
use crate::config::Timings;
use crate::error::{CliError, Warning, WorkflowError};
use crate::models::{subnet_matches, NicSpec, PowerState, ReplacementRequest};
use colored::Colorize;

/// Result of a guarded NIC deletion.
#[derive(Debug, PartialEq, Eq)]
enum Deletion {
    Deleted,
    AlreadyGone,
    /// Refused, the NIC is attached to this VM id.
    StillAttached(String),
}

/// Runs the replacement for one request at a time.
pub struct ReplaceWorkflow<'a, C: ControlPlane + ?Sized> {
    client: &'a C,
    timings: &'a Timings,
}

impl<'a, C: ControlPlane + ?Sized> ReplaceWorkflow<'a, C> {
    pub fn new(client: &'a C, timings: &'a Timings) -> Self {
        ReplaceWorkflow { client, timings }
    }

    /// Process one VM end to end. Never panics or returns early, every
    /// outcome is in the report.
    pub fn run(&self, request: &ReplacementRequest) -> VmReport {
        let mut session = Session::new();
        let result = self.drive(request, &mut session);
        if let Err(e) = &result {
            log::error!(
                "{} {}: {e}",
                "FAILED".on_red(),
                request.vm_name
            );
            self.compensate(request, &mut session);
        }
        VmReport::new(request, session, result)
    }

    fn drive(&self, req: &ReplacementRequest, s: &mut Session) -> Result<(), WorkflowError> {
        self.inspect(req, s)?;
        self.deallocate(req, s)?;
        self.resolve_naming(s)?;
        self.create_temp_nic(req, s)?;
        self.attach_new_nic(req, s)?;
        self.detach_old_nic(req, s)?;

        if self.delete_old_nic(s) {
            self.finalize_ip(req, s);
        } else {
            s.warn(Warning::PostCritical {
                phase: Phase::IpFinalized,
                detail: format!(
                    "skipped, old NIC still present, new NIC keeps {}",
                    display_ip(s.temporary_ip)
                ),
            });
        }

        self.start(req, s);
        s.enter(Phase::Done);
        log::info!("{} {}", "DONE".green(), req.vm_name);
        Ok(())
    }

    /// Read the VM and its first NIC, then make sure the replacement name is
    /// usable. Nothing is modified.
    fn inspect(&self, req: &ReplacementRequest, s: &mut Session) -> Result<(), WorkflowError> {
        s.enter(Phase::Inspecting);
        let precondition = |reason: String| WorkflowError::Precondition {
            phase: Phase::Inspecting,
            reason,
        };

        let vm = self
            .client
            .get_vm(&req.vm_name, &req.resource_group)
            .map_err(|e| precondition(format!("cannot read VM: {e}")))?
            .ok_or_else(|| {
                precondition(format!(
                    "VM {} not found in {}",
                    req.vm_name, req.resource_group
                ))
            })?;

        let nic_id = vm
            .first_nic_id()
            .ok_or_else(|| precondition(format!("VM {} has no NIC attached", vm.name)))?
            .to_string();
        if vm.attached_nic_count() != 1 {
            return Err(precondition(format!(
                "VM {} has {} NICs attached, only single-NIC VMs are replaced",
                vm.name,
                vm.attached_nic_count()
            )));
        }

        let original = self
            .client
            .get_nic(&nic_id, &req.resource_group)
            .map_err(|e| precondition(format!("cannot read NIC {nic_id}: {e}")))?
            .ok_or_else(|| precondition(format!("NIC {nic_id} not found")))?;
        log::info!(
            "{}: location={} nic={} ip={} subnet={} nsg={}",
            vm.name,
            vm.location,
            original.name,
            display_ip(original.private_ip),
            original.subnet_id,
            original.nsg_id.as_deref().unwrap_or("none")
        );

        if !subnet_matches(
            &original.subnet_id,
            &req.vnet_resource_group,
            &req.vnet_name,
            &req.subnet_name,
        ) {
            s.warn(Warning::Input(format!(
                "request names {}/{}/{} but NIC is in {}, using the NIC's subnet",
                req.vnet_resource_group, req.vnet_name, req.subnet_name, original.subnet_id
            )));
        }

        let candidate = resolve_candidate_name(&req.vm_name, &original.name);
        match check_candidate(self.client, &candidate, &req.resource_group)
            .map_err(|e| precondition(format!("cannot check NIC {candidate}: {e}")))?
        {
            CandidateCheck::Attached(nic) => {
                return Err(WorkflowError::Precondition {
                    phase: Phase::NamingResolved,
                    reason: format!(
                        "NIC {} already exists and is attached to {}, manual intervention required",
                        nic.name,
                        nic.attached_vm_id.as_deref().unwrap_or("a VM")
                    ),
                });
            }
            CandidateCheck::Leftover(nic) => {
                log::warn!("Found detached leftover NIC {} from an earlier run", nic.name);
                s.leftover = Some(nic);
            }
            CandidateCheck::Free => {}
        }

        s.new_nic_name = Some(candidate);
        s.vm = Some(vm);
        s.original_nic = Some(original);
        Ok(())
    }

    /// Deallocate and wait. A timeout is only a warning.
    fn deallocate(&self, req: &ReplacementRequest, s: &mut Session) -> Result<(), WorkflowError> {
        s.enter(Phase::Deallocating);
        self.client
            .set_power(&req.vm_name, &req.resource_group, PowerAction::Deallocate)
            .map_err(|source| WorkflowError::Transitional {
                phase: Phase::Deallocating,
                source,
            })?;

        s.enter(Phase::AwaitingDeallocated);
        let policy = &self.timings.poll;
        if !await_power_state(
            self.client,
            &req.vm_name,
            &req.resource_group,
            PowerState::Deallocated,
            policy,
        )
        .reached()
        {
            // Proceeds anyway, NIC operations may fail if the VM is not yet down.
            s.warn(Warning::Timeout {
                phase: Phase::AwaitingDeallocated,
                waited: policy.max_wait(),
            });
        }
        Ok(())
    }

    /// Remove a detached leftover under the candidate name.
    fn resolve_naming(&self, s: &mut Session) -> Result<(), WorkflowError> {
        s.enter(Phase::NamingResolved);
        let Some(leftover) = s.leftover.take() else {
            return Ok(());
        };
        match self.delete_detached_nic(&leftover.name, &leftover.resource_group) {
            Ok(Deletion::Deleted) | Ok(Deletion::AlreadyGone) => {
                log::info!(
                    "Removed leftover NIC {}, waiting {}s for the provider to release it",
                    leftover.name,
                    self.timings.name_release.as_secs()
                );
                pause(self.timings.name_release);
                Ok(())
            }
            Ok(Deletion::StillAttached(vm_id)) => Err(WorkflowError::Inconsistent {
                phase: Phase::NamingResolved,
                reason: format!(
                    "leftover NIC {} became attached to {vm_id}",
                    leftover.name
                ),
            }),
            Err(source) => Err(WorkflowError::Transitional {
                phase: Phase::NamingResolved,
                source,
            }),
        }
    }

    fn create_temp_nic(&self, req: &ReplacementRequest, s: &mut Session) -> Result<(), WorkflowError> {
        s.enter(Phase::TempNicCreated);
        let (Some(vm), Some(original), Some(name)) = (&s.vm, &s.original_nic, &s.new_nic_name)
        else {
            return Err(missing_state(Phase::TempNicCreated));
        };

        let (ip, source) =
            choose_temporary_ip(self.client, &original.subnet_id, &req.vm_name, req.target_ip);
        let spec = NicSpec {
            name: name.clone(),
            resource_group: req.resource_group.clone(),
            location: vm.location.clone(),
            subnet_id: original.subnet_id.clone(),
            private_ip: ip,
            nsg_id: original.nsg_id.clone(),
            accelerated_networking: original.accelerated_networking,
        };
        s.temporary_ip = Some(ip);
        s.temp_ip_source = Some(source);

        let nic = self
            .client
            .create_nic(&spec)
            .map_err(|source| WorkflowError::Transitional {
                phase: Phase::TempNicCreated,
                source,
            })?;
        log::info!("Created {} with temporary IP {ip}", nic.name);
        s.new_nic = Some(nic);
        Ok(())
    }

    fn attach_new_nic(&self, req: &ReplacementRequest, s: &mut Session) -> Result<(), WorkflowError> {
        s.enter(Phase::NewNicAttached);
        let nic_id = match &s.new_nic {
            Some(nic) => nic.id.clone(),
            None => return Err(missing_state(Phase::NewNicAttached)),
        };
        self.client
            .attach_nic(&req.vm_name, &req.resource_group, &nic_id)
            .map_err(|source| WorkflowError::Transitional {
                phase: Phase::NewNicAttached,
                source,
            })
    }

    /// Detach the original, then check the VM carries exactly the new NIC.
    fn detach_old_nic(&self, req: &ReplacementRequest, s: &mut Session) -> Result<(), WorkflowError> {
        s.enter(Phase::OldNicDetached);
        let (original_id, new_id, new_name) = match (&s.original_nic, &s.new_nic) {
            (Some(original), Some(new_nic)) => (
                original.id.clone(),
                new_nic.id.clone(),
                new_nic.name.clone(),
            ),
            _ => return Err(missing_state(Phase::OldNicDetached)),
        };
        self.client
            .detach_nic(&req.vm_name, &req.resource_group, &original_id)
            .map_err(|source| WorkflowError::Transitional {
                phase: Phase::OldNicDetached,
                source,
            })?;
        s.original_detached = true;

        match self.client.get_vm(&req.vm_name, &req.resource_group) {
            Ok(Some(vm)) if vm.attached_nic_count() == 1 && vm.has_nic(&new_id) => Ok(()),
            Ok(Some(vm)) => Err(WorkflowError::Inconsistent {
                phase: Phase::OldNicDetached,
                reason: format!(
                    "expected only {new_name} attached, VM reports {:?}",
                    vm.attached_nic_ids
                ),
            }),
            Ok(None) => Err(WorkflowError::Inconsistent {
                phase: Phase::OldNicDetached,
                reason: format!("VM {} disappeared", req.vm_name),
            }),
            Err(e) => {
                let detail = format!("could not re-read VM after detach: {e}");
                s.warn(Warning::PostCritical {
                    phase: Phase::OldNicDetached,
                    detail,
                });
                Ok(())
            }
        }
    }

    /// True when the original NIC no longer exists.
    fn delete_old_nic(&self, s: &mut Session) -> bool {
        s.enter(Phase::OldNicDeleted);
        let Some(original) = s.original_nic.clone() else {
            return false;
        };
        let detail = match self.delete_detached_nic(&original.name, &original.resource_group) {
            Ok(Deletion::Deleted) => {
                log::info!("Deleted old NIC {}", original.name);
                return true;
            }
            Ok(Deletion::AlreadyGone) => return true,
            Ok(Deletion::StillAttached(vm_id)) => {
                format!("old NIC {} still attached to {vm_id}, not deleted", original.name)
            }
            Err(e) => format!("old NIC {} not deleted: {e}", original.name),
        };
        s.warn(Warning::PostCritical {
            phase: Phase::OldNicDeleted,
            detail,
        });
        false
    }

    /// Move the new NIC from its temporary address to the target.
    fn finalize_ip(&self, req: &ReplacementRequest, s: &mut Session) {
        s.enter(Phase::IpFinalized);
        let Some(new_nic) = s.new_nic.clone() else {
            return;
        };
        if s.temporary_ip == Some(req.target_ip) {
            s.final_ip = Some(req.target_ip);
            return;
        }

        log::info!(
            "Waiting {}s for {} to be released",
            self.timings.ip_settle.as_secs(),
            req.target_ip
        );
        pause(self.timings.ip_settle);
        match self.client.update_nic_ip_config(&new_nic, req.target_ip) {
            Ok(()) => {
                log::info!("{} now holds {} (Static)", new_nic.name, req.target_ip);
                s.final_ip = Some(req.target_ip);
            }
            Err(e) => s.warn(Warning::PostCritical {
                phase: Phase::IpFinalized,
                detail: format!(
                    "could not set {} on {}, keeps {}: {e}",
                    req.target_ip,
                    new_nic.name,
                    display_ip(s.temporary_ip)
                ),
            }),
        }
    }

    fn start(&self, req: &ReplacementRequest, s: &mut Session) {
        s.enter(Phase::Starting);
        if let Err(e) = self
            .client
            .set_power(&req.vm_name, &req.resource_group, PowerAction::Start)
        {
            s.warn(Warning::PostCritical {
                phase: Phase::Starting,
                detail: format!("start request failed: {e}"),
            });
            return;
        }

        s.enter(Phase::AwaitingRunning);
        let policy = &self.timings.poll;
        if !await_power_state(
            self.client,
            &req.vm_name,
            &req.resource_group,
            PowerState::Running,
            policy,
        )
        .reached()
        {
            s.warn(Warning::Timeout {
                phase: Phase::AwaitingRunning,
                waited: policy.max_wait(),
            });
        }
    }

    /// Best-effort undo for the phase that failed. Rollback steps are
    /// attempted once and not verified.
    fn compensate(&self, req: &ReplacementRequest, s: &mut Session) {
        match s.phase {
            Phase::Start | Phase::Inspecting => {}
            Phase::Deallocating
            | Phase::AwaitingDeallocated
            | Phase::NamingResolved
            | Phase::TempNicCreated => {
                self.restart_vm(req, s);
            }
            Phase::NewNicAttached => {
                self.remove_new_nic(s);
                self.restart_vm(req, s);
            }
            Phase::OldNicDetached => {
                if !self.reattach_original(req, s) {
                    // Leave the new NIC in place, the VM would otherwise have none.
                    self.restart_vm(req, s);
                    return;
                }
                if let Some(nic) = s.new_nic.clone() {
                    match self
                        .client
                        .detach_nic(&req.vm_name, &req.resource_group, &nic.id)
                    {
                        Ok(()) => s.note_rollback(format!("detached {}", nic.name)),
                        Err(e) => s.note_rollback(format!("detach {} failed: {e}", nic.name)),
                    }
                }
                self.remove_new_nic(s);
                self.restart_vm(req, s);
            }
            Phase::OldNicDeleted
            | Phase::IpFinalized
            | Phase::Starting
            | Phase::AwaitingRunning
            | Phase::Done => {}
        }
    }

    /// Make sure the original NIC is attached again as primary. True when the
    /// VM carries it afterwards.
    fn reattach_original(&self, req: &ReplacementRequest, s: &mut Session) -> bool {
        let Some(original) = s.original_nic.clone() else {
            return false;
        };
        let attached = match self.client.get_vm(&req.vm_name, &req.resource_group) {
            Ok(Some(vm)) => vm.has_nic(&original.id),
            Ok(None) => false,
            Err(e) => {
                s.note_rollback(format!("could not re-read {}: {e}", req.vm_name));
                !s.original_detached
            }
        };
        if attached {
            return true;
        }
        match self
            .client
            .attach_nic(&req.vm_name, &req.resource_group, &original.id)
        {
            Ok(()) => {
                s.original_detached = false;
                s.note_rollback(format!("reattached {}", original.name));
                true
            }
            Err(e) => {
                s.note_rollback(format!("reattach {} failed: {e}", original.name));
                false
            }
        }
    }

    fn remove_new_nic(&self, s: &mut Session) {
        let Some(nic) = s.new_nic.clone() else {
            return;
        };
        let note = match self.delete_detached_nic(&nic.name, &nic.resource_group) {
            Ok(Deletion::Deleted) => format!("deleted {}", nic.name),
            Ok(Deletion::AlreadyGone) => format!("{} already gone", nic.name),
            Ok(Deletion::StillAttached(vm_id)) => {
                format!("{} left in place, still attached to {vm_id}", nic.name)
            }
            Err(e) => format!("delete {} failed: {e}", nic.name),
        };
        s.note_rollback(note);
    }

    /// Power the VM back on with whatever NIC it still has.
    fn restart_vm(&self, req: &ReplacementRequest, s: &mut Session) {
        match self
            .client
            .set_power(&req.vm_name, &req.resource_group, PowerAction::Start)
        {
            Ok(()) => {
                let outcome = await_power_state(
                    self.client,
                    &req.vm_name,
                    &req.resource_group,
                    PowerState::Running,
                    &self.timings.poll,
                );
                let state = if outcome.reached() { "running" } else { "start requested, not yet running" };
                s.note_rollback(format!("restarted {}: {state}", req.vm_name));
            }
            Err(e) => s.note_rollback(format!("restart {} failed: {e}", req.vm_name)),
        }
    }

    /// Delete a NIC only after re-reading it and confirming it is detached.
    fn delete_detached_nic(&self, name: &str, resource_group: &str) -> Result<Deletion, CliError> {
        let Some(nic) = self.client.get_nic(name, resource_group)? else {
            return Ok(Deletion::AlreadyGone);
        };
        if let Some(vm_id) = nic.attached_vm_id {
            log::warn!("Refusing to delete {name}, attached to {vm_id}");
            return Ok(Deletion::StillAttached(vm_id));
        }
        self.client.delete_nic(name, resource_group)?;
        Ok(Deletion::Deleted)
    }
}

fn missing_state(phase: Phase) -> WorkflowError {
    WorkflowError::Inconsistent {
        phase,
        reason: "session is missing data from an earlier phase".to_string(),
    }
}

fn pause(duration: std::time::Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

fn display_ip(ip: Option<std::net::Ipv4Addr>) -> String {
    ip.map(|ip| ip.to_string())
        .unwrap_or_else(|| "no address".to_string())
}
