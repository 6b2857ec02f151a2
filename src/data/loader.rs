use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BinaryArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, Int8Array, LargeBinaryArray, StringArray, UInt8Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::filter::RecordSelector;
use super::model::{columns, FieldValue, RawRow};
use crate::error::SpextractError;

// ---------------------------------------------------------------------------
// RowSource – anything that can answer a RecordSelector
// ---------------------------------------------------------------------------

/// A data source for measurement rows.
///
/// Implementations must return exactly the rows matching the selector, in
/// its order and no more than its limit.
pub trait RowSource {
    /// Identifier written to the `source` field of every measurement.
    fn source_name(&self) -> String;

    fn fetch(&self, selector: &RecordSelector) -> crate::error::Result<Vec<RawRow>>;
}

/// Table formats a [`TableFile`] can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Parquet,
    Json,
    Csv,
}

impl TableFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "parquet" | "pq" => Some(TableFormat::Parquet),
            "json" => Some(TableFormat::Json),
            "csv" => Some(TableFormat::Csv),
            _ => None,
        }
    }
}

/// An exported measurement table on disk.
#[derive(Debug, Clone)]
pub struct TableFile {
    path: PathBuf,
    format: TableFormat,
}

impl TableFile {
    /// Check the file exists and has a supported format. Nothing is read yet.
    pub fn open(path: impl Into<PathBuf>) -> crate::error::Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(SpextractError::SourceNotFound(path));
        }
        let format = TableFormat::from_path(&path).ok_or_else(|| SpextractError::UnsupportedSource(path.clone()))?;
        Ok(TableFile { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    /// Read every row of the table, unfiltered.
    pub fn load_rows(&self) -> crate::error::Result<Vec<RawRow>> {
        let rows = match self.format {
            TableFormat::Parquet => load_parquet(&self.path),
            TableFormat::Json => load_json(&self.path),
            TableFormat::Csv => load_csv(&self.path),
        };
        rows.map_err(|e| SpextractError::Table {
            path: self.path.clone(),
            message: format!("{e:#}"),
        })
    }
}

impl RowSource for TableFile {
    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self, selector: &RecordSelector) -> crate::error::Result<Vec<RawRow>> {
        let rows = self.load_rows()?;
        let total = rows.len();
        let selected = selector.apply(rows);
        log::debug!(
            "{}: {} of {total} rows selected ({})",
            self.path.display(),
            selected.len(),
            selector.to_sql(&table_name(&self.path))
        );
        Ok(selected)
    }
}

/// Table name for a file: its base name without extension.
pub fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Every readable table file directly inside `dir`, sorted by name.
pub fn list_tables(dir: &Path) -> crate::error::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|_| SpextractError::SourceNotFound(dir.to_path_buf()))?;
    let mut tables: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && TableFormat::from_path(p).is_some())
        .collect();
    tables.sort();
    Ok(tables)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, one object per row:
///
/// ```json
/// [
///   { "id": 1, "date": "2020-01-03", "time": "13:22:46",
///     "spectrum": "0000000000000080ff3f...", "noOfChannels": 2048,
///     "aosmode": 32, "femode": 1, "unit": 2, "misc": 1, ... },
///   ...
/// ]
/// ```
///
/// `spectrum` is a hex string or an array of byte values.
fn load_json(path: &Path) -> Result<Vec<RawRow>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut row = RawRow::new();
        for (key, val) in obj {
            let value = if key == columns::SPECTRUM {
                json_to_bytes(val).with_context(|| format!("Row {i}: invalid '{key}'"))?
            } else {
                json_to_field(val)
            };
            row.fields.insert(key.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn json_to_bytes(val: &JsonValue) -> Result<FieldValue> {
    match val {
        JsonValue::String(s) => Ok(FieldValue::Bytes(hex::decode(s.trim()).context("not a hex string")?)),
        JsonValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(j, v)| {
                v.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .with_context(|| format!("byte {j} is not in 0..=255"))
            })
            .collect::<Result<Vec<u8>>>()
            .map(FieldValue::Bytes),
        JsonValue::Null => Ok(FieldValue::Null),
        other => bail!("expected hex string or byte array, got {other}"),
    }
}

fn json_to_field(val: &JsonValue) -> FieldValue {
    match val {
        JsonValue::String(s) => FieldValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => FieldValue::Bool(*b),
        JsonValue::Null => FieldValue::Null,
        other => FieldValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, `spectrum` hex-encoded.
/// Other cells are typed by content.
fn load_csv(path: &Path) -> Result<Vec<RawRow>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let mut row = RawRow::new();
        for (col_idx, value) in record.iter().enumerate() {
            let Some(col_name) = headers.get(col_idx) else {
                bail!("CSV row {row_no}: more cells than headers");
            };
            let field = if col_name == columns::SPECTRUM {
                // Bad hex is a per-row decode problem, not a table error.
                hex::decode(value.trim())
                    .map(FieldValue::Bytes)
                    .unwrap_or_else(|_| FieldValue::String(value.to_string()))
            } else {
                guess_field_type(value)
            };
            row.fields.insert(col_name.clone(), field);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn guess_field_type(s: &str) -> FieldValue {
    if s.is_empty() {
        return FieldValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return FieldValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return FieldValue::Float(f);
    }
    if s == "true" || s == "false" {
        return FieldValue::Bool(s == "true");
    }
    FieldValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet export of the measurement table.
///
/// `spectrum` must be a Binary / LargeBinary column; `date` may be Date32
/// or text. All other columns are read as scalars.
fn load_parquet(path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let cols: Vec<(String, &Arc<dyn Array>)> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().clone(), batch.column(i)))
            .collect();

        for row_idx in 0..batch.num_rows() {
            let mut row = RawRow::new();
            for (name, col) in &cols {
                let value = extract_field_value(col, row_idx)
                    .with_context(|| format!("Row {row_idx}: failed to read '{name}'"))?;
                row.fields.insert(name.clone(), value);
            }
            rows.push(row);
        }
    }

    Ok(rows)
}

// -- Parquet / Arrow helpers --

fn downcast<'a, T: 'static>(col: &'a Arc<dyn Array>) -> Result<&'a T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array type for {:?}", col.data_type()))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_field_value(col: &Arc<dyn Array>, row: usize) -> Result<FieldValue> {
    if col.is_null(row) {
        return Ok(FieldValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => FieldValue::String(downcast::<StringArray>(col)?.value(row).to_string()),
        DataType::LargeUtf8 => FieldValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Binary => FieldValue::Bytes(downcast::<BinaryArray>(col)?.value(row).to_vec()),
        DataType::LargeBinary => FieldValue::Bytes(downcast::<LargeBinaryArray>(col)?.value(row).to_vec()),
        DataType::Int8 => FieldValue::Integer(downcast::<Int8Array>(col)?.value(row) as i64),
        DataType::UInt8 => FieldValue::Integer(downcast::<UInt8Array>(col)?.value(row) as i64),
        DataType::Int16 => FieldValue::Integer(downcast::<Int16Array>(col)?.value(row) as i64),
        DataType::Int32 => FieldValue::Integer(downcast::<Int32Array>(col)?.value(row) as i64),
        DataType::Int64 => FieldValue::Integer(downcast::<Int64Array>(col)?.value(row)),
        DataType::Float32 => FieldValue::Float(downcast::<Float32Array>(col)?.value(row) as f64),
        DataType::Float64 => FieldValue::Float(downcast::<Float64Array>(col)?.value(row)),
        DataType::Boolean => FieldValue::Bool(downcast::<BooleanArray>(col)?.value(row)),
        DataType::Date32 => match downcast::<Date32Array>(col)?.value_as_date(row) {
            Some(d) => FieldValue::Date(d),
            None => FieldValue::Null,
        },
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}
