//! Emissions record store
//!
//! Turns the raw emissions export into typed [`CarbonEmission`] records,
//! writes/reads the normalized intermediate CSV, and deduplicates records by
//! their normalized model identifier.
//!
//! Two CSV layouts are understood:
//!
//! - [`CsvLayout::Raw`]: the upstream export with fixed column positions and a
//!   metrics blob in column 9
//! - [`CsvLayout::Normalized`]: one column per [`CarbonEmission`] field, in
//!   declaration order, as written by [`write_normalized`]

mod metrics;

pub use metrics::{parse_performance_metrics, PerformanceMetrics};

use crate::error::{Error, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Raw export column positions
mod raw_columns {
    pub const MODEL_ID: usize = 0;
    pub const DATASETS_SIZE: usize = 2;
    pub const CO2_EMISSION: usize = 3;
    pub const CO2_REPORTED: usize = 4;
    pub const GEOGRAPHICAL_LOCATION: usize = 7;
    pub const PERFORMANCE_METRICS: usize = 9;
    pub const DOMAIN: usize = 14;
    pub const SIZE: usize = 15;
    pub const AUTO: usize = 19;
}

/// The only token accepted as `auto = true`
pub const TRUE_TOKEN: &str = "True";

/// One trained model's emissions record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonEmission {
    pub model_id: String,
    pub datasets_size: u64,
    pub co2_emission: f64,
    pub co2_reported: f64,
    pub geographical_location: String,
    pub accuracy: f64,
    pub f1: f64,
    pub rouge_1: f64,
    pub rouge_l: f64,
    pub domain: String,
    pub size: i64,
    #[serde(serialize_with = "serialize_flag")]
    pub auto: bool,
}

fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(if *flag { TRUE_TOKEN } else { "False" })
}

impl CarbonEmission {
    /// Identifier used for deduplication: trimmed and lower-cased
    pub fn key(&self) -> String {
        normalized_key(&self.model_id)
    }

    /// CO2 grams per model parameter, defined only for positive sizes
    pub fn emission_rate(&self) -> Option<f64> {
        (self.size > 0).then(|| self.co2_emission / self.size as f64)
    }

    /// Whether the record takes part in efficiency rankings
    pub fn is_rankable(&self) -> bool {
        self.size > 0 && self.co2_emission > 0.0
    }

    /// Parse a row of the raw export
    pub fn from_raw(row: &StringRecord, line: u64) -> Result<Self> {
        let field = |index: usize| column(row, index, line);
        let metrics = parse_performance_metrics(field(raw_columns::PERFORMANCE_METRICS)?, line)?;

        Ok(Self {
            model_id: field(raw_columns::MODEL_ID)?.to_string(),
            datasets_size: parse_count(field(raw_columns::DATASETS_SIZE)?, "datasets_size", line)?,
            co2_emission: parse_float(field(raw_columns::CO2_EMISSION)?, "co2_emission", line)?,
            co2_reported: parse_float(field(raw_columns::CO2_REPORTED)?, "co2_reported", line)?,
            geographical_location: field(raw_columns::GEOGRAPHICAL_LOCATION)?.to_string(),
            accuracy: metrics.accuracy,
            f1: metrics.f1,
            rouge_1: metrics.rouge_1,
            rouge_l: metrics.rouge_l,
            domain: field(raw_columns::DOMAIN)?.to_string(),
            size: parse_signed(field(raw_columns::SIZE)?, "size", line)?,
            auto: field(raw_columns::AUTO)? == TRUE_TOKEN,
        })
    }

    /// Parse a row of the normalized CSV
    pub fn from_normalized(row: &StringRecord, line: u64) -> Result<Self> {
        let field = |index: usize| column(row, index, line);

        Ok(Self {
            model_id: field(0)?.to_string(),
            datasets_size: parse_count(field(1)?, "datasets_size", line)?,
            co2_emission: parse_float(field(2)?, "co2_emission", line)?,
            co2_reported: parse_float(field(3)?, "co2_reported", line)?,
            geographical_location: field(4)?.to_string(),
            accuracy: parse_float(field(5)?, "accuracy", line)?,
            f1: parse_float(field(6)?, "f1", line)?,
            rouge_1: parse_float(field(7)?, "rouge_1", line)?,
            rouge_l: parse_float(field(8)?, "rouge_l", line)?,
            domain: field(9)?.to_string(),
            size: parse_signed(field(10)?, "size", line)?,
            auto: field(11)? == TRUE_TOKEN,
        })
    }
}

/// Trimmed, lower-cased model identifier
pub fn normalized_key(model_id: &str) -> String {
    model_id.trim().to_lowercase()
}

fn column<'r>(row: &'r StringRecord, index: usize, line: u64) -> Result<&'r str> {
    row.get(index).ok_or_else(|| {
        Error::malformed(
            line,
            format!("expected at least {} columns, found {}", index + 1, row.len()),
        )
    })
}

fn parse_float(raw: &str, name: &str, line: u64) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse::<f64>()
        .map_err(|_| Error::malformed(line, format!("{} is not a number: {:?}", name, raw)))
}

fn parse_signed(raw: &str, name: &str, line: u64) -> Result<i64> {
    let value = parse_float(raw, name, line)?;
    if !value.is_finite() {
        return Err(Error::malformed(
            line,
            format!("{} must be finite, got {}", name, raw),
        ));
    }
    // Counts may be exported as floats ("1.2e9"); truncate like an int cast
    Ok(value.trunc() as i64)
}

fn parse_count(raw: &str, name: &str, line: u64) -> Result<u64> {
    let value = parse_signed(raw, name, line)?;
    u64::try_from(value)
        .map_err(|_| Error::malformed(line, format!("{} must be non-negative, got {}", name, raw)))
}

/// Which column layout a CSV source uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    Raw,
    Normalized,
}

/// Resolution policy for records sharing a normalized identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Later rows overwrite earlier ones
    #[default]
    #[serde(rename = "last")]
    LastWins,
    /// The first row is kept, later ones ignored
    #[serde(rename = "first")]
    FirstWins,
}

/// Deduplicated, immutable set of emission records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<CarbonEmission>,
}

impl RecordSet {
    /// Deduplicate by normalized identifier
    ///
    /// A surviving record occupies the position where its key first
    /// appeared, whichever row's data wins.
    pub fn from_records(
        records: impl IntoIterator<Item = CarbonEmission>,
        policy: DuplicatePolicy,
    ) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut unique: Vec<CarbonEmission> = Vec::new();
        let mut duplicates = 0usize;

        for record in records {
            match positions.get(&record.key()) {
                Some(&position) => {
                    duplicates += 1;
                    if policy == DuplicatePolicy::LastWins {
                        unique[position] = record;
                    }
                }
                None => {
                    positions.insert(record.key(), unique.len());
                    unique.push(record);
                }
            }
        }

        if duplicates > 0 {
            tracing::debug!(
                "Collapsed {} duplicate identifiers ({:?})",
                duplicates,
                policy
            );
        }

        Self { records: unique }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CarbonEmission> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[CarbonEmission] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a CarbonEmission;
    type IntoIter = std::slice::Iter<'a, CarbonEmission>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Parse every data row of a CSV source, header skipped, no deduplication
pub fn read_records<R: Read>(reader: R, layout: CsvLayout) -> Result<Vec<CarbonEmission>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let record = match layout {
            CsvLayout::Raw => CarbonEmission::from_raw(&row, line)?,
            CsvLayout::Normalized => CarbonEmission::from_normalized(&row, line)?,
        };
        records.push(record);
    }

    Ok(records)
}

/// Load and deduplicate a CSV file
pub fn load(path: impl AsRef<Path>, layout: CsvLayout, policy: DuplicatePolicy) -> Result<RecordSet> {
    let path = path.as_ref();
    let records = read_records(File::open(path)?, layout)?;
    let parsed = records.len();
    let set = RecordSet::from_records(records, policy);

    tracing::info!(
        "Loaded {} records ({} rows) from {}",
        set.len(),
        parsed,
        path.display()
    );
    Ok(set)
}

/// Write records in the normalized layout (header = field names)
pub fn write_normalized<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a CarbonEmission>,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Clean a raw export into the normalized CSV; returns the rows written
///
/// Every raw row is kept; deduplication happens when the normalized file is
/// loaded for analysis.
pub fn strip(raw_path: impl AsRef<Path>, normalized_path: impl AsRef<Path>) -> Result<usize> {
    let raw_path = raw_path.as_ref();
    let normalized_path = normalized_path.as_ref();

    let records = read_records(File::open(raw_path)?, CsvLayout::Raw)?;
    write_normalized(File::create(normalized_path)?, &records)?;

    tracing::info!(
        "Normalized {} rows from {} into {}",
        records.len(),
        raw_path.display(),
        normalized_path.display()
    );
    Ok(records.len())
}

#[cfg(test)]
mod tests;
