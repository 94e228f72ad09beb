//! CSV result report, one row per VM.

use crate::batch::{BatchSummary, Verification};
use crate::workflow::VmReport;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ReportRow {
    #[serde(rename = "VMName")]
    pub vm_name: String,
    #[serde(rename = "ResourceGroup")]
    pub resource_group: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Phase")]
    pub phase: String,
    #[serde(rename = "OriginalNIC")]
    pub original_nic: String,
    #[serde(rename = "NewNIC")]
    pub new_nic: String,
    #[serde(rename = "TargetIPAddress")]
    pub target_ip: String,
    #[serde(rename = "TemporaryIPAddress")]
    pub temporary_ip: String,
    #[serde(rename = "FinalIPAddress")]
    pub final_ip: String,
    #[serde(rename = "Verification")]
    pub verification: String,
    #[serde(rename = "Error")]
    pub error: String,
    #[serde(rename = "Warnings")]
    pub warnings: String,
    #[serde(rename = "Rollback")]
    pub rollback: String,
}

impl ReportRow {
    pub fn new(report: &VmReport, verification: Option<&Verification>) -> Self {
        let opt = |v: Option<String>| v.unwrap_or_default();
        ReportRow {
            vm_name: report.vm_name.clone(),
            resource_group: report.resource_group.clone(),
            status: report.status.to_string(),
            phase: report.phase.to_string(),
            original_nic: opt(report.original_nic.clone()),
            new_nic: opt(report.new_nic.clone()),
            target_ip: report.target_ip.to_string(),
            temporary_ip: opt(report.temporary_ip.map(|ip| ip.to_string())),
            final_ip: opt(report.final_ip.map(|ip| ip.to_string())),
            verification: match verification {
                Some(v) if v.passed => "pass".to_string(),
                Some(v) => format!("fail: {}", v.detail),
                None => "not verified".to_string(),
            },
            error: opt(report.error.as_ref().map(|e| e.to_string())),
            warnings: report.warnings.iter().join("; "),
            rollback: report.rollback.iter().join("; "),
        }
    }
}

/// `nic-replace-results_<timestamp>.csv`, timestamp in `tz`.
pub fn report_file_name(now: DateTime<Utc>, tz: Tz) -> String {
    format!(
        "nic-replace-results_{}.csv",
        now.with_timezone(&tz).format("%Y-%m-%d_%H%M%S")
    )
}

/// VM names are only unique within a resource group.
fn verification_for<'a>(
    report: &VmReport,
    verifications: &'a [Verification],
) -> Option<&'a Verification> {
    verifications.iter().find(|v| {
        v.vm_name.eq_ignore_ascii_case(&report.vm_name)
            && v.resource_group.eq_ignore_ascii_case(&report.resource_group)
    })
}

/// Write the report into `dir` and return its path.
pub fn write_report(
    dir: &Path,
    tz: Tz,
    summary: &BatchSummary,
    verifications: &[Verification],
) -> Result<PathBuf, Box<dyn Error>> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Error creating report dir {}: {e}", dir.display()))?;
    let path = dir.join(report_file_name(Utc::now(), tz));

    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| format!("Error creating report {}: {e}", path.display()))?;
    for report in &summary.reports {
        writer.serialize(ReportRow::new(report, verification_for(report, verifications)))?;
    }
    writer.flush()?;

    log::info!("Report written to {}", path.display());
    Ok(path)
}
