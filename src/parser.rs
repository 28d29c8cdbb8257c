//! CSV reader for normalized leg records.
//!
//! One row per leg, with a header naming the [`LegRecord`] fields. Times are
//! ISO-8601 local date-times (`2024-03-04T06:12:30`); an empty actual-time cell
//! means the time was not observed.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use tracing::debug;

use crate::records::LegRecord;

/// Decodes every leg record from CSV.
///
/// # Errors
///
/// Returns an error naming the offending line if a row does not deserialize.
pub fn parse_legs<R: Read>(reader: R) -> Result<Vec<LegRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut legs = Vec::new();

    for (i, result) in rdr.deserialize().enumerate() {
        let record: LegRecord = result.with_context(|| format!("invalid leg record on data row {}", i + 1))?;
        legs.push(record);
    }

    Ok(legs)
}

/// Reads leg records from the CSV file at `path`.
pub fn load_legs(path: &str) -> Result<Vec<LegRecord>> {
    let file = File::open(path).with_context(|| format!("opening leg records '{path}'"))?;
    let legs = parse_legs(file)?;
    debug!(path, legs = legs.len(), "Leg records loaded");
    Ok(legs)
}
