use std::path::{Path, PathBuf};

use crate::data::builder::{MeasurementBuilder, RowOutcome};
use crate::data::extended::ExtendedDecoder;
use crate::data::filter::RecordSelector;
use crate::data::loader::{list_tables, RowSource, TableFile};
use crate::data::model::Measurement;
use crate::error::Result;
use crate::output::sum::{SumFileWriter, WriteReport};

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Everything one extraction produced, in row order.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub outcomes: Vec<RowOutcome>,
}

impl Extraction {
    /// Number of rows that fell back to sentinel records.
    pub fn fallback_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_fallback()).count()
    }

    pub fn into_measurements(self) -> Vec<Measurement> {
        self.outcomes.into_iter().map(RowOutcome::into_measurement).collect()
    }
}

/// Fetch the selected rows from `source` and build a measurement for each.
///
/// The decoder's capability check runs first, so an unusable decoder fails
/// before any row is read.
pub fn extract(source: &dyn RowSource, selector: &RecordSelector, decoder: &dyn ExtendedDecoder) -> Result<Extraction> {
    decoder.check_capability()?;

    let rows = source.fetch(selector)?;
    let builder = MeasurementBuilder::new(decoder, source.source_name(), selector.spectrometer);
    let extraction = Extraction {
        outcomes: builder.build_all(&rows),
    };
    log::info!(
        "{}: {} {} record(s) extracted, {} failed",
        source.source_name(),
        extraction.outcomes.len(),
        selector.spectrometer,
        extraction.fallback_count()
    );
    Ok(extraction)
}

/// Convert one table file into SUM files.
pub fn convert_file(
    infile: &Path,
    selector: &RecordSelector,
    decoder: &dyn ExtendedDecoder,
    writer: &SumFileWriter,
) -> Result<WriteReport> {
    let table = TableFile::open(infile)?;
    let measurements = extract(&table, selector, decoder)?.into_measurements();
    writer.write_all(&measurements)
}

/// Convert every table file in `input_dir`, writing into `output_dir`
/// with generated names. Stops at the first batch-level error.
pub fn convert_directory(
    input_dir: &Path,
    output_dir: &Path,
    selector: &RecordSelector,
    decoder: &dyn ExtendedDecoder,
) -> Result<Vec<(PathBuf, WriteReport)>> {
    let writer = SumFileWriter::new(output_dir, None);
    let tables = list_tables(input_dir)?;
    log::info!("{}: {} table file(s)", input_dir.display(), tables.len());

    let mut reports = Vec::with_capacity(tables.len());
    for table in tables {
        let report = convert_file(&table, selector, decoder, &writer)?;
        reports.push((table, report));
    }
    Ok(reports)
}
