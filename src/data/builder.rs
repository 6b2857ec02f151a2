use chrono::NaiveDate;
use rayon::prelude::*;

use super::extended::ExtendedDecoder;
use super::flags::Spectrometer;
use super::model::{columns, FieldValue, Measurement, RawRow};
use crate::error::DecodeError;

// ---------------------------------------------------------------------------
// Build outcome
// ---------------------------------------------------------------------------

/// Result of turning one row into a measurement. Both variants carry a
/// measurement, so downstream writers treat them alike.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Decoded(Measurement),
    Fallback {
        measurement: Measurement,
        reason: DecodeError,
    },
}

impl RowOutcome {
    pub fn measurement(&self) -> &Measurement {
        match self {
            RowOutcome::Decoded(m) => m,
            RowOutcome::Fallback { measurement, .. } => measurement,
        }
    }

    pub fn into_measurement(self) -> Measurement {
        match self {
            RowOutcome::Decoded(m) => m,
            RowOutcome::Fallback { measurement, .. } => measurement,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RowOutcome::Fallback { .. })
    }
}

// ---------------------------------------------------------------------------
// MeasurementBuilder
// ---------------------------------------------------------------------------

/// Maps raw rows of one source table into measurements.
pub struct MeasurementBuilder<'a> {
    decoder: &'a dyn ExtendedDecoder,
    source: String,
    spectrometer: Spectrometer,
}

impl<'a> MeasurementBuilder<'a> {
    pub fn new(decoder: &'a dyn ExtendedDecoder, source: impl Into<String>, spectrometer: Spectrometer) -> Self {
        Self {
            decoder,
            source: source.into(),
            spectrometer,
        }
    }

    /// Build one row. Never fails: a row that cannot be decoded becomes a
    /// fallback record.
    pub fn build(&self, row: &RawRow) -> RowOutcome {
        match self.try_build(row) {
            Ok(m) => RowOutcome::Decoded(m),
            Err(reason) => RowOutcome::Fallback {
                measurement: Measurement::fallback(self.source.clone()),
                reason,
            },
        }
    }

    /// Build every row, in parallel, keeping row order. Failed rows are
    /// reported with their position and replaced by fallback records.
    pub fn build_all(&self, rows: &[RawRow]) -> Vec<RowOutcome> {
        let outcomes: Vec<RowOutcome> = rows.par_iter().map(|row| self.build(row)).collect();
        for (index, outcome) in outcomes.iter().enumerate() {
            if let RowOutcome::Fallback { reason, .. } = outcome {
                log::warn!(
                    "Error extracting record {} (id {}) from {}: {reason}",
                    index + 1,
                    rows[index].id().map_or_else(|| "?".to_string(), |id| id.to_string()),
                    self.source
                );
            }
        }
        outcomes
    }

    fn try_build(&self, row: &RawRow) -> Result<Measurement, DecodeError> {
        let bytes = match required(row, columns::SPECTRUM)? {
            FieldValue::Bytes(b) => b.as_slice(),
            other => return Err(invalid(columns::SPECTRUM, other)),
        };
        let channels = integer(row, columns::CHANNELS)?;
        let spectrum = self.decoder.decode(bytes, channels)?;

        let integrate1 = integer(row, columns::INTEGRATE1)?;
        let integrate2 = integer(row, columns::INTEGRATE2)?;
        let integration = integrate1.checked_mul(integrate2).ok_or_else(|| DecodeError::InvalidField {
            field: columns::INTEGRATE2,
            value: format!("{integrate1} * {integrate2} overflows"),
        })?;

        Ok(Measurement {
            source: self.source.clone(),
            date: date(row)?,
            time: text(row, columns::TIME)?,
            gas: text(row, columns::GAS)?,
            integration,
            integration_time: integer(row, columns::INTEGRATE_MS)?,
            elevation: angle(row, columns::ELEVATION)?,
            azimuth: angle(row, columns::AZIMUTH)?,
            spectrometer: self.spectrometer.name().to_string(),
            spectrum,
        })
    }
}

// -- field helpers --

fn required<'r>(row: &'r RawRow, field: &'static str) -> Result<&'r FieldValue, DecodeError> {
    row.get(field).ok_or(DecodeError::MissingField(field))
}

fn invalid(field: &'static str, value: &FieldValue) -> DecodeError {
    DecodeError::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn integer(row: &RawRow, field: &'static str) -> Result<i64, DecodeError> {
    let value = required(row, field)?;
    value.as_i64().ok_or_else(|| invalid(field, value))
}

fn angle(row: &RawRow, field: &'static str) -> Result<f64, DecodeError> {
    let value = required(row, field)?;
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(field, value))
}

/// Text columns are opaque; numbers are accepted and printed as-is.
fn text(row: &RawRow, field: &'static str) -> Result<String, DecodeError> {
    match required(row, field)? {
        FieldValue::String(s) => Ok(s.trim_end().to_string()),
        FieldValue::Integer(i) => Ok(i.to_string()),
        FieldValue::Float(v) => Ok(v.to_string()),
        other => Err(invalid(field, other)),
    }
}

fn date(row: &RawRow) -> Result<NaiveDate, DecodeError> {
    match required(row, columns::DATE)? {
        FieldValue::Date(d) => Ok(*d),
        FieldValue::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
                .map_err(|_| invalid(columns::DATE, &FieldValue::String(s.to_string())))
        }
        other => Err(invalid(columns::DATE, other)),
    }
}
