//! End-to-end extraction tests: table file → selector → builder → output.

mod common;

use std::fs;

use common::{file_names, sky_row, write_table};
use spextract::data::extended::SLOT_SIZE;
use spextract::output::stream;
use spextract::output::sum::{read_sum, SumFileWriter};
use spextract::pipeline::{convert_directory, convert_file, extract};
use spextract::{
    data::loader::TableFile, ExtendedDecoder, ExtractionMode, RecordSelector, SoftwareDecoder, Spectrometer,
    SpextractError,
};

fn selector(mode: ExtractionMode) -> RecordSelector {
    RecordSelector::new(Spectrometer::RpgFfts, mode)
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn all_mode_writes_every_record_numbered() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let rows = vec![sky_row(3, 4), sky_row(1, 4), sky_row(2, 4)];
    let table = write_table(src.path(), "Data_2020-01-03_13-22-46.json", &rows);

    let writer = SumFileWriter::new(out.path(), None);
    let report = convert_file(&table, &selector(ExtractionMode::All), &SoftwareDecoder, &writer).unwrap();

    assert_eq!(report.written.len(), 3);
    assert_eq!(
        file_names(out.path()),
        vec![
            "Data_2020-01-03_13-22-46_RPGFFTS_00001.SUM",
            "Data_2020-01-03_13-22-46_RPGFFTS_00002.SUM",
            "Data_2020-01-03_13-22-46_RPGFFTS_00003.SUM",
        ]
    );
    // Ascending by id: the first file holds record 1.
    let first = read_sum(&out.path().join("Data_2020-01-03_13-22-46_RPGFFTS_00001.SUM")).unwrap();
    assert_eq!(first.header[0], "date: 03.01.2020  13:22:01");
    assert_eq!(first.spectrum.len(), 4);
    assert_eq!(first.spectrum[0], 100.0);
}

#[test]
fn latest_mode_writes_single_unnumbered_file() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let rows: Vec<_> = [4, 1, 5, 2, 3].iter().map(|id| sky_row(*id, 2)).collect();
    let table = write_table(src.path(), "Data.json", &rows);

    let writer = SumFileWriter::new(out.path(), Some("latest.sum".into()));
    convert_file(&table, &selector(ExtractionMode::Latest), &SoftwareDecoder, &writer).unwrap();

    assert_eq!(file_names(out.path()), vec!["latest.sum"]);
    let sum = read_sum(&out.path().join("latest.sum")).unwrap();
    assert_eq!(sum.header_value("spectrometer"), Some("RPGFFTS"));
    assert_eq!(sum.spectrum[0], 500.0);
}

#[test]
fn other_backends_and_calibration_records_are_ignored() {
    let src = tempfile::tempdir().unwrap();
    let mut ffts = sky_row(2, 2);
    ffts["aosmode"] = 0x08.into();
    let mut hot = sky_row(3, 2);
    hot["femode"] = 0x02.into();
    let table = write_table(src.path(), "t.json", &[sky_row(1, 2), ffts, hot]);

    let table = TableFile::open(&table).unwrap();
    let extraction = extract(&table, &selector(ExtractionMode::All), &SoftwareDecoder).unwrap();
    assert_eq!(extraction.outcomes.len(), 1);
}

// ============================================================================
// Partial failure
// ============================================================================

#[test]
fn corrupt_row_is_skipped_without_renumbering() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut broken = sky_row(2, 3);
    // One byte short of three slots.
    broken["spectrum"] = hex::encode(vec![0u8; 3 * SLOT_SIZE - 1]).into();
    let table = write_table(src.path(), "Data.json", &[sky_row(1, 3), broken, sky_row(3, 3)]);

    let table = TableFile::open(&table).unwrap();
    let extraction = extract(&table, &selector(ExtractionMode::All), &SoftwareDecoder).unwrap();
    assert_eq!(extraction.fallback_count(), 1);

    let measurements = extraction.into_measurements();
    assert!(measurements[1].is_fallback());
    let report = SumFileWriter::new(out.path(), None).write_all(&measurements).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        file_names(out.path()),
        vec!["Data_RPGFFTS_00001.SUM", "Data_RPGFFTS_00003.SUM"]
    );
}

#[test]
fn incapable_decoder_fails_before_reading_rows() {
    struct Truncating;
    impl ExtendedDecoder for Truncating {
        fn exponent_bits(&self) -> u32 {
            15
        }
        fn fraction_bits(&self) -> u32 {
            63
        }
        fn decode_slot(&self, _slot: &[u8; SLOT_SIZE]) -> f64 {
            0.0
        }
    }

    let src = tempfile::tempdir().unwrap();
    let table = write_table(src.path(), "t.json", &[sky_row(1, 2)]);
    let table = TableFile::open(&table).unwrap();
    let err = extract(&table, &selector(ExtractionMode::All), &Truncating).unwrap_err();
    assert!(matches!(err, SpextractError::Capability(_)));
}

// ============================================================================
// Output errors
// ============================================================================

#[test]
fn missing_output_directory_is_reported() {
    let src = tempfile::tempdir().unwrap();
    let table = write_table(src.path(), "t.json", &[sky_row(1, 2)]);
    let writer = SumFileWriter::new(src.path().join("missing"), None);
    let err = convert_file(&table, &selector(ExtractionMode::All), &SoftwareDecoder, &writer).unwrap_err();
    assert_eq!(err.exit_code(), 40);
}

#[test]
fn unwritable_target_is_a_write_error() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    // A directory where the first file should go.
    fs::create_dir(out.path().join("t_RPGFFTS_00001.SUM")).unwrap();

    let table = write_table(src.path(), "t.json", &[sky_row(1, 2), sky_row(2, 2)]);
    let writer = SumFileWriter::new(out.path(), None);
    let err = convert_file(&table, &selector(ExtractionMode::All), &SoftwareDecoder, &writer).unwrap_err();

    match &err {
        SpextractError::Write { path, .. } => assert_eq!(path, &out.path().join("t_RPGFFTS_00001.SUM")),
        other => panic!("expected a write error, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 60);
    // The run stops at the first failure.
    assert!(!out.path().join("t_RPGFFTS_00002.SUM").exists());
}

#[test]
fn existing_files_are_overwritten() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("t_RPGFFTS.SUM");
    fs::write(&target, "stale content that is longer than nothing\n".repeat(100)).unwrap();

    let table = write_table(src.path(), "t.json", &[sky_row(1, 2)]);
    let writer = SumFileWriter::new(out.path(), None);
    convert_file(&table, &selector(ExtractionMode::All), &SoftwareDecoder, &writer).unwrap();

    let text = fs::read_to_string(&target).unwrap();
    assert!(text.starts_with("date: 03.01.2020"));
    assert!(!text.contains("stale"));
}

// ============================================================================
// Stream transport
// ============================================================================

#[test]
fn stream_hand_off_produces_same_files() {
    let src = tempfile::tempdir().unwrap();
    let direct = tempfile::tempdir().unwrap();
    let relayed = tempfile::tempdir().unwrap();
    let table = write_table(src.path(), "t.json", &[sky_row(1, 5), sky_row(2, 5)]);

    let sel = selector(ExtractionMode::All);
    convert_file(&table, &sel, &SoftwareDecoder, &SumFileWriter::new(direct.path(), None)).unwrap();

    let opened = TableFile::open(&table).unwrap();
    let measurements = extract(&opened, &sel, &SoftwareDecoder).unwrap().into_measurements();
    let text = stream::encode(&measurements).unwrap();
    let received = stream::decode(&text).unwrap();
    assert_eq!(received, measurements);
    SumFileWriter::new(relayed.path(), None).write_all(&received).unwrap();

    for name in file_names(direct.path()) {
        assert_eq!(
            fs::read(direct.path().join(&name)).unwrap(),
            fs::read(relayed.path().join(&name)).unwrap()
        );
    }
}

#[test]
fn month_directory_is_converted_table_by_table() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_table(src.path(), "a.json", &[sky_row(1, 2)]);
    write_table(src.path(), "b.json", &[sky_row(1, 2), sky_row(2, 2)]);
    fs::write(src.path().join("readme.txt"), "not a table").unwrap();

    let reports = convert_directory(src.path(), out.path(), &selector(ExtractionMode::All), &SoftwareDecoder).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(
        file_names(out.path()),
        vec!["a_RPGFFTS.SUM", "b_RPGFFTS_00001.SUM", "b_RPGFFTS_00002.SUM"]
    );
}
