//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::json;
use spextract::data::extended::encode_spectrum;

/// A matching RPGFFTS sky row with `channels` channels.
pub fn sky_row(id: i64, channels: usize) -> serde_json::Value {
    let spectrum: Vec<f64> = (0..channels).map(|ch| id as f64 * 100.0 + ch as f64 / 3.0).collect();
    json!({
        "id": id,
        "date": "2020-01-03",
        "time": format!("13:22:{:02}", id),
        "spectrum": hex::encode(encode_spectrum(&spectrum)),
        "integrate1": 100,
        "integrate2": 30,
        "integrate_ms": 60000,
        "elevation": 12.345,
        "azimuth": 98.7,
        "gas": "O3",
        "noOfChannels": channels,
        "version": 20151106,
        "aosmode": 0x20,
        "femode": 0x01,
        "unit": 0x02,
        "misc": 0x01,
    })
}

/// Write `rows` as a JSON table file and return its path.
pub fn write_table(dir: &Path, name: &str, rows: &[serde_json::Value]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(rows).unwrap()).unwrap();
    path
}

/// File names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
