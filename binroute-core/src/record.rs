//! Raw telemetry records and their validation into domain types.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::model::{Bin, BinId, Coordinates, Telemetry, Van, VanId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Which kind of record was rejected.
pub enum RecordKind {
    /// A bin record.
    Bin,
    /// A van record.
    Van,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bin => formatter.write_str("bin"),
            Self::Van => formatter.write_str("van"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
/// Why a record could not be used.
pub enum RecordDefect {
    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A numeric field is NaN or infinite.
    #[error("field `{0}` is not a finite number")]
    NotFinite(&'static str),
    /// A numeric field lies outside its valid range.
    #[error("field `{field}` = {value} is outside {min}..={max}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Another record in the same snapshot already uses this id.
    #[error("duplicate id `{0}`")]
    DuplicateId(String),
    /// The store entry could not be decoded into a record.
    #[error("unreadable entry: {0}")]
    Unreadable(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
#[error("{kind} record `{key}`: {defect}")]
/// A record skipped during validation, kept for reporting.
pub struct RecordIssue {
    /// Bin or van.
    pub kind: RecordKind,
    /// Store key or id of the record.
    pub key: String,
    /// What was wrong.
    pub defect: RecordDefect,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Bin fields as read from the store, before validation.
pub struct BinRecord {
    /// Store key, used when the id itself is missing.
    pub key: String,
    /// Bin identifier.
    pub id: Option<String>,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Fill level in percent.
    pub fill_level: Option<f64>,
    /// Tilt flag or proxy.
    pub tilt: Option<f64>,
    /// Temperature in Celsius.
    pub temperature: Option<f64>,
    /// Humidity in percent.
    pub humidity: Option<f64>,
}

impl BinRecord {
    /// Check every field and build a [`Bin`].
    ///
    /// # Errors
    ///
    /// Returns a [`RecordIssue`] naming the first missing or invalid field.
    pub fn validate(self) -> Result<Bin, RecordIssue> {
        let key = self.id.clone().unwrap_or_else(|| self.key.clone());
        self.checked()
            .map_err(|defect| RecordIssue {
                kind: RecordKind::Bin,
                key,
                defect,
            })
    }

    fn checked(self) -> Result<Bin, RecordDefect> {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(RecordDefect::MissingField("id"))?;
        let location = location(self.latitude, self.longitude)?;
        let fill_level = bounded(self.fill_level, "fill_level", 0.0, 100.0)?;
        let tilt = bounded(self.tilt, "tilt", 0.0, 1.0)?;
        let temperature = finite(self.temperature, "temperature")?;
        let humidity = finite(self.humidity, "humidity")?;

        Ok(Bin {
            id: BinId(id),
            location,
            telemetry: Telemetry {
                fill_level,
                tilt,
                temperature,
                humidity,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Van fields as read from the store, before validation.
pub struct VanRecord {
    /// Store key, used when the id itself is missing.
    pub key: String,
    /// Van identifier.
    pub id: Option<String>,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Optional bin capacity.
    pub capacity: Option<usize>,
}

impl VanRecord {
    /// Check every field and build a [`Van`].
    ///
    /// # Errors
    ///
    /// Returns a [`RecordIssue`] naming the first missing or invalid field.
    pub fn validate(self) -> Result<Van, RecordIssue> {
        let key = self.id.clone().unwrap_or_else(|| self.key.clone());
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(RecordDefect::MissingField("id"));

        id.and_then(|id| {
            Ok(Van {
                id: VanId(id),
                location: location(self.latitude, self.longitude)?,
                capacity: self.capacity,
            })
        })
        .map_err(|defect| RecordIssue {
            kind: RecordKind::Van,
            key,
            defect,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Valid records of one snapshot together with the rejected ones.
pub struct TelemetryBatch<T> {
    /// Records that passed validation, in store order.
    pub records: Vec<T>,
    /// Records that were skipped.
    pub rejected: Vec<RecordIssue>,
}

impl<T> Default for TelemetryBatch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Validate raw bin records, rejecting invalid ones and repeated ids.
pub fn collect_bins<I>(records: I) -> TelemetryBatch<Bin>
where
    I: IntoIterator<Item = BinRecord>,
{
    collect(
        records.into_iter().map(BinRecord::validate),
        RecordKind::Bin,
        |bin: &Bin| bin.id.0.clone(),
    )
}

/// Validate raw van records, rejecting invalid ones and repeated ids.
pub fn collect_vans<I>(records: I) -> TelemetryBatch<Van>
where
    I: IntoIterator<Item = VanRecord>,
{
    collect(
        records.into_iter().map(VanRecord::validate),
        RecordKind::Van,
        |van: &Van| van.id.0.clone(),
    )
}

fn collect<T, I, F>(results: I, kind: RecordKind, id_of: F) -> TelemetryBatch<T>
where
    I: Iterator<Item = Result<T, RecordIssue>>,
    F: Fn(&T) -> String,
{
    let mut batch = TelemetryBatch::default();
    let mut seen = HashSet::new();

    for result in results {
        match result {
            Ok(record) => {
                let id = id_of(&record);
                if seen.insert(id.clone()) {
                    batch.records.push(record);
                } else {
                    batch.rejected.push(RecordIssue {
                        kind,
                        key: id.clone(),
                        defect: RecordDefect::DuplicateId(id),
                    });
                }
            }
            Err(issue) => batch.rejected.push(issue),
        }
    }

    batch
}

fn location(latitude: Option<f64>, longitude: Option<f64>) -> Result<Coordinates, RecordDefect> {
    Ok(Coordinates::new(
        bounded(latitude, "latitude", -90.0, 90.0)?,
        bounded(longitude, "longitude", -180.0, 180.0)?,
    ))
}

fn finite(value: Option<f64>, field: &'static str) -> Result<f64, RecordDefect> {
    let value = value.ok_or(RecordDefect::MissingField(field))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RecordDefect::NotFinite(field))
    }
}

fn bounded(
    value: Option<f64>,
    field: &'static str,
    min: f64,
    max: f64,
) -> Result<f64, RecordDefect> {
    let value = finite(value, field)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(RecordDefect::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
