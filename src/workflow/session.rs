//! Per-VM scratch state and the report it turns into.

use super::{Phase, TempIpSource};
use crate::error::{ErrorKind, Warning, WorkflowError};
use crate::models::{NicResource, ReplacementRequest, VmResource};
use std::fmt;
use std::net::Ipv4Addr;

/// State owned by one workflow run. Never persisted, dropped once the
/// [`VmReport`] is built.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) phase: Phase,
    pub(crate) vm: Option<VmResource>,
    pub(crate) original_nic: Option<NicResource>,
    pub(crate) new_nic_name: Option<String>,
    pub(crate) leftover: Option<NicResource>,
    pub(crate) new_nic: Option<NicResource>,
    /// The detach of the original NIC was accepted by the provider.
    pub(crate) original_detached: bool,
    pub(crate) temporary_ip: Option<Ipv4Addr>,
    pub(crate) temp_ip_source: Option<TempIpSource>,
    pub(crate) final_ip: Option<Ipv4Addr>,
    pub(crate) warnings: Vec<Warning>,
    pub(crate) rollback: Vec<String>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Session {
            phase: Phase::Start,
            vm: None,
            original_nic: None,
            new_nic_name: None,
            leftover: None,
            new_nic: None,
            original_detached: false,
            temporary_ip: None,
            temp_ip_source: None,
            final_ip: None,
            warnings: Vec::new(),
            rollback: Vec::new(),
        }
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        log::debug!("phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    pub(crate) fn warn(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub(crate) fn note_rollback(&mut self, note: impl Into<String>) {
        let note = note.into();
        log::info!("rollback: {note}");
        self.rollback.push(note);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmStatus {
    Succeeded,
    SucceededWithWarnings,
    Failed,
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmStatus::Succeeded => write!(f, "success"),
            VmStatus::SucceededWithWarnings => write!(f, "success-with-warnings"),
            VmStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one VM's replacement.
#[derive(Debug)]
pub struct VmReport {
    pub vm_name: String,
    pub resource_group: String,
    pub status: VmStatus,
    /// `Done` on success, otherwise the phase that failed.
    pub phase: Phase,
    pub original_nic: Option<String>,
    pub new_nic: Option<String>,
    pub target_ip: Ipv4Addr,
    pub temporary_ip: Option<Ipv4Addr>,
    pub temp_ip_source: Option<TempIpSource>,
    /// Set once the new NIC holds the target address.
    pub final_ip: Option<Ipv4Addr>,
    pub warnings: Vec<Warning>,
    pub error: Option<WorkflowError>,
    pub rollback: Vec<String>,
}

impl VmReport {
    pub(crate) fn new(
        request: &ReplacementRequest,
        session: Session,
        result: Result<(), WorkflowError>,
    ) -> Self {
        let phase = match &result {
            Ok(()) => session.phase,
            Err(e) => e.phase(),
        };
        let (status, error) = match result {
            Ok(()) if session.warnings.is_empty() => (VmStatus::Succeeded, None),
            Ok(()) => (VmStatus::SucceededWithWarnings, None),
            Err(e) => (VmStatus::Failed, Some(e)),
        };
        VmReport {
            vm_name: request.vm_name.clone(),
            resource_group: request.resource_group.clone(),
            status,
            phase,
            original_nic: session.original_nic.map(|n| n.name),
            new_nic: session
                .new_nic
                .map(|n| n.name)
                .or(session.new_nic_name),
            target_ip: request.target_ip,
            temporary_ip: session.temporary_ip,
            temp_ip_source: session.temp_ip_source,
            final_ip: session.final_ip,
            warnings: session.warnings,
            error,
            rollback: session.rollback,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == VmStatus::Failed
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(WorkflowError::kind)
    }
}
