//! Terminal output utilities.
//!
//! Provides formatting helpers for terminal output.

use crate::batch::{AccelSummary, BatchSummary, Verification};
use crate::workflow::{AccelOutcome, VmReport, VmStatus};
use colored::Colorize;
use itertools::Itertools;

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    let quoted = format!("\"{value_str}\"");
    let quoted_len = quoted.len();

    if quoted_len >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

fn ip_or_dash(ip: Option<std::net::Ipv4Addr>) -> String {
    ip.map(|ip| ip.to_string()).unwrap_or_else(|| "-".to_string())
}

/// One line per VM, without colour, used by [`print_summary`].
pub(crate) fn summary_line(report: &VmReport) -> String {
    let mut line = format!(
        "{vm},{status},{phase},{nic},{temp},{final_ip}",
        vm = format_field(&report.vm_name, 16),
        status = format_field(report.status, 23),
        phase = format_field(report.phase, 21),
        nic = format_field(report.new_nic.as_deref().unwrap_or("-"), 28),
        temp = format_field(ip_or_dash(report.temporary_ip), 17),
        final_ip = format_field(ip_or_dash(report.final_ip), 17),
    );
    if let Some(e) = &report.error {
        line.push_str(&format!(" error: {e}"));
    }
    if !report.warnings.is_empty() {
        line.push_str(&format!(" warnings: {}", report.warnings.iter().join("; ")));
    }
    if !report.rollback.is_empty() {
        line.push_str(&format!(" rollback: {}", report.rollback.iter().join("; ")));
    }
    line
}

pub fn print_summary(summary: &BatchSummary) {
    println!("#Summary NIC replacement");
    for report in &summary.reports {
        let line = summary_line(report);
        match report.status {
            VmStatus::Succeeded => println!("{}", line.green()),
            VmStatus::SucceededWithWarnings => println!("{}", line.yellow()),
            VmStatus::Failed => println!("{}", line.red()),
        }
    }
    println!(
        "#Total {} VM(s): {} succeeded, {} with warnings, {}",
        summary.total(),
        summary.succeeded.to_string().green(),
        summary.with_warnings.to_string().yellow(),
        if summary.failed > 0 {
            format!("{} failed", summary.failed).on_red()
        } else {
            "0 failed".normal()
        }
    );
}

pub fn print_verifications(verifications: &[Verification]) {
    if verifications.is_empty() {
        return;
    }
    println!("#Verification");
    for v in verifications {
        let verdict = if v.passed { "PASS".green() } else { "FAIL".red() };
        println!(
            "{verdict} {vm},{nic},expected={expected},observed={detail}",
            vm = format_field(&v.vm_name, 16),
            nic = format_field(&v.nic_name, 28),
            expected = v.expected_ip,
            detail = v.detail,
        );
    }
    let passed = verifications.iter().filter(|v| v.passed).count();
    println!("#Verified {passed}/{} passed", verifications.len());
}

pub fn print_accel_summary(summary: &AccelSummary) {
    println!("#Summary accelerated networking");
    for report in &summary.reports {
        let line = format!("{} {}", format_field(&report.vm_name, 16), report.outcome);
        match report.outcome {
            AccelOutcome::Updated { .. } => println!("{}", line.green()),
            AccelOutcome::Skipped(_) => println!("{line}"),
            AccelOutcome::Failed(_) => println!("{}", line.red()),
        }
    }
    println!(
        "#Total {}: {} updated, {} skipped, {} failed",
        summary.reports.len(),
        summary.updated,
        summary.skipped,
        summary.failed
    );
}
