//! Sequential batch driver.
//!
//! VMs are processed one at a time, depth first. A failed VM never stops the
//! batch, the next record is processed regardless.

use crate::azure::ControlPlane;
use crate::config::Timings;
use crate::models::{AccelRequest, ReplacementRequest};
use crate::workflow::{
    reconcile_accelerated_networking, AccelOutcome, AccelReport, ReplaceWorkflow, VmReport,
    VmStatus,
};
use colored::Colorize;

/// Per-batch tallies, returned by the driver instead of kept in globals.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<VmReport>,
    pub succeeded: usize,
    pub with_warnings: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, report: VmReport) {
        match report.status {
            VmStatus::Succeeded => self.succeeded += 1,
            VmStatus::SucceededWithWarnings => self.with_warnings += 1,
            VmStatus::Failed => self.failed += 1,
        }
        self.reports.push(report);
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

pub fn run_replacements<C: ControlPlane + ?Sized>(
    client: &C,
    requests: &[ReplacementRequest],
    timings: &Timings,
) -> BatchSummary {
    let workflow = ReplaceWorkflow::new(client, timings);
    let mut summary = BatchSummary::default();
    let total = requests.len();

    for (i, request) in requests.iter().enumerate() {
        log::info!(
            "{} [{}/{total}] {} in {} -> {}",
            "#Start".on_blue(),
            i + 1,
            request.vm_name,
            request.resource_group,
            request.target_ip
        );
        let report = workflow.run(request);
        let status = report.status;
        summary.record(report);
        log::info!(
            "#End [{}/{total}] {} {status} (ok={} warn={} failed={})",
            i + 1,
            request.vm_name,
            summary.succeeded,
            summary.with_warnings,
            summary.failed,
        );
    }
    summary
}

#[derive(Debug, Default)]
pub struct AccelSummary {
    pub reports: Vec<AccelReport>,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl AccelSummary {
    pub fn record(&mut self, report: AccelReport) {
        match report.outcome {
            AccelOutcome::Updated { .. } => self.updated += 1,
            AccelOutcome::Skipped(_) => self.skipped += 1,
            AccelOutcome::Failed(_) => self.failed += 1,
        }
        self.reports.push(report);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

pub fn run_accel_batch<C: ControlPlane + ?Sized>(
    client: &C,
    requests: &[AccelRequest],
) -> AccelSummary {
    let mut summary = AccelSummary::default();
    for (i, request) in requests.iter().enumerate() {
        log::info!(
            "[{}/{}] accelerated networking {} -> '{}'",
            i + 1,
            requests.len(),
            request.vm_name,
            request.accelerated_networking
        );
        summary.record(reconcile_accelerated_networking(client, request));
    }
    summary
}
