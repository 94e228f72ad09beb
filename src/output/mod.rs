//! Output of batch results.
//!
//! - [`terminal`] - coloured per-VM summary lines
//! - [`report`] - CSV result file

mod report;
mod terminal;

pub use report::{report_file_name, write_report, ReportRow};
pub use terminal::{format_field, print_accel_summary, print_summary, print_verifications};
