//! NIC replacement workflow.
//!
//! - [`poller`] - bounded wait for a provider state
//! - [`naming`] - replacement NIC name resolution across re-runs
//! - [`temp_ip`] - temporary address staging
//! - [`replace`] - the per-VM state machine with rollback
//! - [`accel`] - accelerated networking reconciliation
//! - [`session`] - per-VM scratch state and the resulting report

mod accel;
mod naming;
mod poller;
mod replace;
mod session;
mod temp_ip;

use std::fmt;

pub use accel::{reconcile_accelerated_networking, AccelOutcome, AccelReport, SkipReason};
pub use naming::{
    check_candidate, new_nic_name, replacement_nic_name, resolve_candidate_name, CandidateCheck,
};
pub use poller::{await_power_state, await_state, PollOutcome, PollPolicy};
pub use replace::ReplaceWorkflow;
pub use session::{VmReport, VmStatus};
pub use temp_ip::{choose_temporary_ip, fallback_ip, TempIpSource};

/// Position in the replacement state machine, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Start,
    Inspecting,
    Deallocating,
    AwaitingDeallocated,
    NamingResolved,
    TempNicCreated,
    NewNicAttached,
    OldNicDetached,
    OldNicDeleted,
    IpFinalized,
    Starting,
    AwaitingRunning,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Start => "Start",
            Phase::Inspecting => "Inspecting",
            Phase::Deallocating => "Deallocating",
            Phase::AwaitingDeallocated => "AwaitingDeallocated",
            Phase::NamingResolved => "NamingResolved",
            Phase::TempNicCreated => "TempNicCreated",
            Phase::NewNicAttached => "NewNicAttached",
            Phase::OldNicDetached => "OldNicDetached",
            Phase::OldNicDeleted => "OldNicDeleted",
            Phase::IpFinalized => "IPFinalized",
            Phase::Starting => "Starting",
            Phase::AwaitingRunning => "AwaitingRunning",
            Phase::Done => "Done",
        };
        f.write_str(name)
    }
}
