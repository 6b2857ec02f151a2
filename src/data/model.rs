use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FieldValue – a single cell of a raw table row
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as delivered by the data source.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    /// Raw binary column content (the packed spectrum).
    Bytes(Vec<u8>),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "'{s}'"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Date(d) => write!(f, "{d}"),
            FieldValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            FieldValue::Null => write!(f, "<null>"),
        }
    }
}

impl FieldValue {
    /// Interpret the value as an integer. Floats qualify only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(*v as i64),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as an `f64` (numeric drivers often hand out
    /// decimals as text).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RawRow – one record as returned by the query
// ---------------------------------------------------------------------------

/// Column names of the measurement table.
pub mod columns {
    pub const ID: &str = "id";
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const SPECTRUM: &str = "spectrum";
    pub const INTEGRATE1: &str = "integrate1";
    pub const INTEGRATE2: &str = "integrate2";
    pub const INTEGRATE_MS: &str = "integrate_ms";
    pub const ELEVATION: &str = "elevation";
    pub const AZIMUTH: &str = "azimuth";
    pub const GAS: &str = "gas";
    pub const CHANNELS: &str = "noOfChannels";
    pub const VERSION: &str = "version";
    pub const SIGNAL_MODE: &str = "aosmode";
    pub const FRONTEND_MODE: &str = "femode";
    pub const UNIT: &str = "unit";
    pub const RECORD_KIND: &str = "misc";

    /// Columns fetched for every measurement, in query order.
    pub const SELECTED: [&str; 11] = [
        DATE, TIME, SPECTRUM, INTEGRATE1, INTEGRATE2, INTEGRATE_MS, ELEVATION, AZIMUTH, GAS,
        CHANNELS, VERSION,
    ];
}

/// A single table row: column name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub fields: BTreeMap<String, FieldValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for sources and tests.
    pub fn with(mut self, column: &str, value: FieldValue) -> Self {
        self.fields.insert(column.to_string(), value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column).filter(|v| **v != FieldValue::Null)
    }

    /// Record identifier used for ordering.
    pub fn id(&self) -> Option<i64> {
        self.get(columns::ID).and_then(FieldValue::as_i64)
    }
}

// ---------------------------------------------------------------------------
// Measurement – one extracted record
// ---------------------------------------------------------------------------

/// Marker used for gas and spectrometer of a fallback record.
pub const FALLBACK_MARKER: &str = "none";

/// One decoded measurement, ready for a SUM file or the record stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub source: String,
    #[serde(with = "crate::output::stream::dotted_date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "crate::output::stream::opaque_time")]
    pub time: String,
    pub gas: String,
    pub integration: i64,
    #[serde(rename = "integrationtime")]
    pub integration_time: i64,
    pub elevation: f64,
    pub azimuth: f64,
    pub spectrometer: String,
    #[serde(with = "crate::output::stream::spectrum_values")]
    pub spectrum: Vec<f64>,
}

impl Measurement {
    /// Sentinel record substituted for a row that failed to decode.
    pub fn fallback(source: impl Into<String>) -> Self {
        Measurement {
            source: source.into(),
            date: NaiveDate::default(),
            time: "0".to_string(),
            gas: FALLBACK_MARKER.to_string(),
            integration: 0,
            integration_time: 0,
            elevation: 0.0,
            azimuth: 0.0,
            spectrometer: FALLBACK_MARKER.to_string(),
            spectrum: Vec::new(),
        }
    }

    /// Whether this record carries the fallback sentinels.
    pub fn is_fallback(&self) -> bool {
        self.spectrum.is_empty()
            && self.spectrometer == FALLBACK_MARKER
            && self.gas == FALLBACK_MARKER
            && self.date == NaiveDate::default()
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.spectrum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectrum.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_uses_sentinels() {
        let m = Measurement::fallback("Data.DBF");
        assert_eq!(m.date, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(m.time, "0");
        assert_eq!(m.source, "Data.DBF");
        assert!(m.is_fallback());
        assert!(m.is_empty());
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(FieldValue::String(" 12.5 ".into()).as_f64(), Some(12.5));
        assert_eq!(FieldValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(FieldValue::Float(4.5).as_i64(), None);
        assert_eq!(FieldValue::Bool(true).as_f64(), None);
    }

    #[test]
    fn null_cells_read_as_missing() {
        let row = RawRow::new()
            .with(columns::ID, FieldValue::Integer(7))
            .with(columns::GAS, FieldValue::Null);
        assert_eq!(row.id(), Some(7));
        assert!(row.get(columns::GAS).is_none());
    }
}
