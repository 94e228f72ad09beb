//! Replace the NIC of Azure VMs while keeping their private address.
//!
//! Each VM is moved onto a freshly created NIC in the same subnet, staged on a
//! temporary address, and switched to its target address once the old NIC is
//! gone. Network security group and accelerated networking carry over.
//!
//! The `az` command-line client does the provider calls, see [`azure`].

pub mod azure;
pub mod batch;
pub mod config;
pub mod error;
pub mod input;
pub mod models;
pub mod output;
pub mod workflow;

use azure::ControlPlane;
use batch::{AccelSummary, BatchSummary, Verification};
use config::Settings;
use std::error::Error;
use std::path::Path;

/// Run the replacement for every record in `input`, print the summary,
/// verify and write the CSV report.
pub fn replace_from_file<C: ControlPlane + ?Sized>(
    client: &C,
    input: &Path,
    settings: &Settings,
    verify: bool,
) -> Result<BatchSummary, Box<dyn Error>> {
    let requests = input::read_requests(input)?;
    let summary = batch::run_replacements(client, &requests, &settings.timings);
    output::print_summary(&summary);

    let verifications: Vec<Verification> = if verify {
        batch::verify_batch(client, &summary)
    } else {
        Vec::new()
    };
    output::print_verifications(&verifications);

    output::write_report(
        &settings.report_dir,
        settings.report_tz,
        &summary,
        &verifications,
    )?;
    Ok(summary)
}

/// Reconcile accelerated networking for every record in `input`.
pub fn accel_from_file<C: ControlPlane + ?Sized>(
    client: &C,
    input: &Path,
) -> Result<AccelSummary, Box<dyn Error>> {
    let requests = input::read_accel_requests(input)?;
    let summary = batch::run_accel_batch(client, &requests);
    output::print_accel_summary(&summary);
    Ok(summary)
}

/// Check the current NIC of every VM in `input` against its target address.
pub fn verify_from_file<C: ControlPlane + ?Sized>(
    client: &C,
    input: &Path,
) -> Result<Vec<Verification>, Box<dyn Error>> {
    let requests = input::read_requests(input)?;
    let verifications = batch::verify_requests(client, &requests);
    output::print_verifications(&verifications);
    Ok(verifications)
}
