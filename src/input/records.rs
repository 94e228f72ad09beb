//! CSV loading.
//!
//! Headers and values are trimmed. Any malformed row fails the whole file,
//! nothing is processed from a partially readable sheet.

use crate::error::InputError;
use crate::models::{AccelRequest, ReplacementRequest};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

/// Deserialize every row of a CSV source.
pub fn read_records<T: DeserializeOwned, R: Read>(
    reader: R,
    source: &str,
) -> Result<Vec<T>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source_err| InputError::Csv {
            path: source.to_string(),
            source: source_err,
        })?;

    if records.is_empty() {
        return Err(InputError::Empty {
            path: source.to_string(),
        });
    }
    log::info!("Read {} record(s) from {source}", records.len());
    Ok(records)
}

fn open(path: &Path) -> Result<std::fs::File, InputError> {
    std::fs::File::open(path).map_err(|e| InputError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn read_requests(path: &Path) -> Result<Vec<ReplacementRequest>, InputError> {
    read_records(open(path)?, &path.display().to_string())
}

pub fn read_accel_requests(path: &Path) -> Result<Vec<AccelRequest>, InputError> {
    read_records(open(path)?, &path.display().to_string())
}
