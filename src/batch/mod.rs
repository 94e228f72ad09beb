//! Batch processing of input records.
//!
//! - [`driver`] - sequential per-VM processing with an explicit result accumulator
//! - [`verify`] - post-run check of each new NIC's address

mod driver;
mod verify;

pub use driver::{run_accel_batch, run_replacements, AccelSummary, BatchSummary};
pub use verify::{verify_batch, verify_nic, verify_requests, Verification};
