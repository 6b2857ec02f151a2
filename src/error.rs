use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Batch-level errors
// ---------------------------------------------------------------------------

/// Errors that stop an extraction run.
///
/// Each variant maps to the process exit code reported by the command line
/// tool (see [`SpextractError::exit_code`]). Per-row decode problems are not
/// represented here: they are [`DecodeError`]s and get replaced by a
/// fallback measurement instead of aborting the run.
#[derive(Error, Debug)]
pub enum SpextractError {
    #[error("spectrometer type '{0}' is unset or unknown")]
    UnknownSpectrometer(String),

    #[error("extraction mode {0} is not supported (use 1 for all spectra or 3 for the latest)")]
    InvalidExtractionMode(i64),

    #[error("input file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("input file is not a supported table format: {}", .0.display())]
    UnsupportedSource(PathBuf),

    #[error("failed to read table {}: {message}", .path.display())]
    Table { path: PathBuf, message: String },

    #[error("cannot access output directory {}", .0.display())]
    OutputDirectory(PathBuf),

    #[error("cannot write to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extended precision decoding is unavailable: {0}")]
    Capability(String),

    #[error("record stream error: {0}")]
    Stream(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Input(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, SpextractError>;

impl SpextractError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SpextractError::UnknownSpectrometer(_) => 10,
            SpextractError::SourceNotFound(_) => 20,
            SpextractError::UnsupportedSource(_) | SpextractError::Table { .. } => 30,
            SpextractError::OutputDirectory(_) => 40,
            SpextractError::Write { .. } => 60,
            _ => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Row-level errors
// ---------------------------------------------------------------------------

/// Why a single row could not be turned into a measurement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("spectrum has {len} bytes, not a multiple of the {slot}-byte slot size")]
    Misaligned { len: usize, slot: usize },

    #[error("spectrum has {len} bytes, {channels} channels need {needed}")]
    Truncated {
        len: usize,
        channels: usize,
        needed: usize,
    },

    #[error("spectrum has {len} bytes, not a multiple of {channels} channels")]
    ChannelMismatch { len: usize, channels: usize },

    #[error("invalid channel count {0}")]
    ChannelCount(i64),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has unexpected value {value}")]
    InvalidField { field: &'static str, value: String },
}
