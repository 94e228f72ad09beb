//! Input records.
//!
//! - [`records`] - CSV loading of replacement and accelerated networking requests

mod records;

pub use records::{read_accel_requests, read_records, read_requests};
