//! Extraction of total-integrated spectrometer records.
//!
//! Rows of a measurement table are selected by their mode flags, their
//! packed 80-bit spectra are narrowed to `f64`, and the resulting
//! measurements are written as SUM text files or as a JSON record stream.

pub mod config;
pub mod data;
pub mod error;
pub mod output;
pub mod pipeline;

pub use data::builder::{MeasurementBuilder, RowOutcome};
pub use data::extended::{ExtendedDecoder, SoftwareDecoder};
pub use data::filter::{ExtractionMode, RecordSelector};
pub use data::flags::Spectrometer;
pub use data::model::Measurement;
pub use error::{DecodeError, Result, SpextractError};
