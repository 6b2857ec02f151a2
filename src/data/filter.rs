use std::fmt;

use super::flags::{DataUnit, FrontendMode, RecordKind, SignalMode, Spectrometer};
use super::model::{columns, FieldValue, RawRow};
use crate::error::{Result, SpextractError};

// ---------------------------------------------------------------------------
// Extraction mode
// ---------------------------------------------------------------------------

/// Which records of a table to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Every matching record, oldest first.
    All,
    /// Only the most recent matching record.
    Latest,
}

impl ExtractionMode {
    /// Resolve the numeric mode used on the command line (1 or 3).
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(ExtractionMode::All),
            3 => Ok(ExtractionMode::Latest),
            other => Err(SpextractError::InvalidExtractionMode(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ExtractionMode::All => 1,
            ExtractionMode::Latest => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("ASC"),
            SortOrder::Descending => f.write_str("DESC"),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordSelector
// ---------------------------------------------------------------------------

/// What a data source must return for one extraction: the four flag
/// values every row must carry, the order by record id and a row limit.
///
/// The selector does no I/O itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSelector {
    pub spectrometer: Spectrometer,
    pub signal_mode: SignalMode,
    pub frontend: FrontendMode,
    pub unit: DataUnit,
    pub kind: RecordKind,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl RecordSelector {
    /// Selector for calibrated sky spectra of `spectrometer`.
    pub fn new(spectrometer: Spectrometer, mode: ExtractionMode) -> Self {
        let (order, limit) = match mode {
            ExtractionMode::All => (SortOrder::Ascending, None),
            ExtractionMode::Latest => (SortOrder::Descending, Some(1)),
        };
        RecordSelector {
            spectrometer,
            signal_mode: spectrometer.signal_mode(),
            frontend: FrontendMode::Signal,
            unit: DataUnit::Kelvin,
            kind: RecordKind::TOTAL_INTEGRATED,
            order,
            limit,
        }
    }

    /// Parse the caller's raw inputs; rejects unknown names and modes
    /// before anything is queried.
    pub fn from_args(spectrometer: &str, mode_code: i64) -> Result<Self> {
        let spectrometer = Spectrometer::parse(spectrometer)?;
        let mode = ExtractionMode::from_code(mode_code)?;
        Ok(Self::new(spectrometer, mode))
    }

    /// Whether a row carries exactly the selected flag values.
    pub fn matches(&self, row: &RawRow) -> bool {
        let flag = |column: &str| row.get(column).and_then(FieldValue::as_i64);
        flag(columns::SIGNAL_MODE) == Some(self.signal_mode.bits() as i64)
            && flag(columns::FRONTEND_MODE) == Some(self.frontend.bits() as i64)
            && flag(columns::UNIT) == Some(self.unit.bits() as i64)
            && flag(columns::RECORD_KIND) == Some(self.kind.bits() as i64)
    }

    /// Apply the selector to an in-memory row set: filter, order by record
    /// id only (stable, so equal ids keep source order), then limit.
    ///
    /// Rows without a usable id rank below every id.
    pub fn apply(&self, rows: Vec<RawRow>) -> Vec<RawRow> {
        let mut selected: Vec<RawRow> = rows.into_iter().filter(|r| self.matches(r)).collect();
        match self.order {
            SortOrder::Ascending => selected.sort_by_key(|r| r.id()),
            SortOrder::Descending => selected.sort_by(|a, b| b.id().cmp(&a.id())),
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }

    /// The equivalent query against the measurement table, for sources
    /// that speak SQL.
    pub fn to_sql(&self, table: &str) -> String {
        let limit = match self.limit {
            Some(n) => format!(" LIMIT {n}"),
            None => String::new(),
        };
        format!(
            "SELECT {} FROM '{}' WHERE {}={} AND {}={} AND {}={} AND {}={} ORDER BY {} {}{}",
            columns::SELECTED.join(","),
            table,
            columns::SIGNAL_MODE,
            self.signal_mode.bits(),
            columns::FRONTEND_MODE,
            self.frontend.bits(),
            columns::UNIT,
            self.unit.bits(),
            columns::RECORD_KIND,
            self.kind.bits(),
            columns::ID,
            self.order,
            limit
        )
    }
}
