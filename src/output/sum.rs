use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::data::model::Measurement;
use crate::error::{Result, SpextractError};

/// Extension appended to generated file names.
pub const SUM_EXTENSION: &str = "SUM";

/// Header lines preceding the channel line.
pub const HEADER_LINES: usize = 9;

const LINE_END: &str = "\r\n";

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// Default file name: source base name without extension, spectrometer
/// name and the `.SUM` suffix.
pub fn default_file_name(measurement: &Measurement) -> String {
    let base = Path::new(&measurement.source)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, _) = split_extension(&base);
    format!("{stem}_{}.{SUM_EXTENSION}", measurement.spectrometer)
}

/// Split `name` at the extension of its last path component. The dot stays
/// with the extension; leading dots are part of the stem.
fn split_extension(name: &str) -> (&str, &str) {
    let last_component = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let file = &name[last_component..];
    let stem_len = file.trim_start_matches('.').len();
    let leading = file.len() - stem_len;
    match file[leading..].rfind('.') {
        Some(dot) => name.split_at(last_component + leading + dot),
        None => (name, ""),
    }
}

/// Insert a 5-digit, 1-based sequence number before the extension.
pub fn numbered_file_name(name: &str, sequence: usize) -> String {
    let (stem, ext) = split_extension(name);
    format!("{stem}_{sequence:05}{ext}")
}

/// Output file name of every measurement of one run, by list position.
///
/// With more than one measurement every name is numbered, explicit or not.
pub fn output_file_names(measurements: &[Measurement], explicit: Option<&str>) -> Vec<String> {
    let numbered = measurements.len() > 1;
    measurements
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let name = match explicit {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => default_file_name(m),
            };
            if numbered {
                numbered_file_name(&name, i + 1)
            } else {
                name
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Text layout
// ---------------------------------------------------------------------------

/// Render a measurement in the SUM layout (CRLF line endings).
pub fn format_sum(m: &Measurement) -> String {
    let mut out = String::with_capacity(400 + 29 * m.spectrum.len());
    let mut line = |text: String| {
        out.push_str(&text);
        out.push_str(LINE_END);
    };
    line(format!("date: {}  {}", m.date.format("%d.%m.%Y"), m.time));
    line(format!("gas: {}", m.gas));
    line(format!("integration: {} samples", m.integration));
    line(format!("integration-time: {} ms", m.integration_time));
    line(format!("elevation: {:.2} deg", m.elevation));
    line(format!("azimuth: {:.2} deg", m.azimuth));
    line(format!("spectrometer: {}", m.spectrometer));
    line(format!("source: {}", m.source));
    line("record-no: -1".to_string());
    line(format!(
        "data from channel {} to {} follows",
        0,
        m.spectrum.len() as i64 - 1
    ));
    for value in &m.spectrum {
        line(format_channel(*value));
    }
    out
}

/// One channel value: width 27, 19 fractional digits. Non-finite values
/// print as `nan` / `inf` / `-inf`.
fn format_channel(value: f64) -> String {
    if value.is_nan() {
        format!("{:>27}", "nan")
    } else if value.is_infinite() {
        format!("{:>27}", if value > 0.0 { "inf" } else { "-inf" })
    } else {
        format!("{value:27.19}")
    }
}

// ---------------------------------------------------------------------------
// SumFileWriter
// ---------------------------------------------------------------------------

/// What a [`SumFileWriter::write_all`] run did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    /// Names of records skipped because their spectrum was empty.
    pub skipped: Vec<String>,
}

/// Writes measurements as SUM files into one output directory.
#[derive(Debug, Clone)]
pub struct SumFileWriter {
    outdir: PathBuf,
    outfile: Option<String>,
}

impl SumFileWriter {
    pub fn new(outdir: impl Into<PathBuf>, outfile: Option<String>) -> Self {
        Self {
            outdir: outdir.into(),
            outfile: outfile.filter(|f| !f.is_empty()),
        }
    }

    /// Write every measurement. Stops at the first directory or write
    /// error; files already written stay in place.
    pub fn write_all(&self, measurements: &[Measurement]) -> Result<WriteReport> {
        let names = output_file_names(measurements, self.outfile.as_deref());
        let mut report = WriteReport::default();

        for (m, name) in measurements.iter().zip(names) {
            let path = self.outdir.join(&name);
            let dir = path.parent().unwrap_or(Path::new("."));
            let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
            if !dir.is_dir() {
                return Err(SpextractError::OutputDirectory(dir.to_path_buf()));
            }

            if m.spectrum.is_empty() {
                log::debug!("{name}: empty spectrum, not written");
                report.skipped.push(name);
                continue;
            }

            write_file(&path, m)?;
            log::info!("wrote {} ({} channels)", path.display(), m.spectrum.len());
            report.written.push(path);
        }
        Ok(report)
    }
}

/// Write one SUM file, truncating any existing file.
pub fn write_file(path: &Path, m: &Measurement) -> Result<()> {
    let write_err = |source: std::io::Error| SpextractError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(format_sum(m).as_bytes()).map_err(write_err)?;
    writer.flush().map_err(write_err)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A SUM file split into its header lines and channel values.
#[derive(Debug, Clone, PartialEq)]
pub struct SumFile {
    /// The nine `key: value` lines, trimmed.
    pub header: Vec<String>,
    pub spectrum: Vec<f64>,
}

impl SumFile {
    /// Value of a header entry, e.g. `gas` or `spectrometer`.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header.iter().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            (k.trim() == key).then(|| v.trim())
        })
    }
}

/// Read a SUM file back: nine header lines, the channel line, then one
/// value per line.
pub fn read_sum(path: &Path) -> anyhow::Result<SumFile> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut header = Vec::with_capacity(HEADER_LINES);
    for i in 0..HEADER_LINES {
        let line = lines
            .next()
            .with_context(|| format!("header ends after {i} lines"))??;
        header.push(line.trim().to_string());
    }
    lines.next().context("missing channel line")??;

    let mut spectrum = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let value = token
            .parse::<f64>()
            .with_context(|| format!("channel {i}: '{token}' is not a number"))?;
        spectrum.push(value);
    }
    Ok(SumFile { header, spectrum })
}
