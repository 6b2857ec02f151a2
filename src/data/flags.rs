use std::fmt;
use std::ops::BitOr;

use crate::error::{Result, SpextractError};

// ---------------------------------------------------------------------------
// SignalMode – which backend was connected to what (`aosmode` column)
// ---------------------------------------------------------------------------

/// Spectrometer signal mode as stored in the `aosmode` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SignalMode {
    /// Set without a valid spectrum (e.g. environment data only).
    None = 0x00,
    AosZero = 0x01,
    /// AOS set to frequency calibration.
    AosComb = 0x02,
    AosSignal = 0x04,
    FftsSignal = 0x08,
    FftsZero = 0x10,
    RpgFftsSignal = 0x20,
    /// RPG FFTS, second backend.
    RpgFfts2Signal = 0x21,
    RpgFftsZero = 0x40,
    RpgFfts2Zero = 0x41,
    OfftsZero = 0x80,
    OfftsSignal = 0x81,
}

// ---------------------------------------------------------------------------
// FrontendMode – where the frontend points (`femode` column)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrontendMode {
    /// Frontend watches the sky.
    Signal = 0x01,
    HotLoad = 0x02,
    ColdLoad = 0x03,
    MixLoad = 0x04,
    /// External cold load.
    ColdExt = 0x05,
    FlashLight = 0x06,
    /// Spectrum holds the receiver noise temperature.
    Trec = 0x10,
}

// ---------------------------------------------------------------------------
// DataUnit (`unit` column)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataUnit {
    Counts = 0x01,
    Kelvin = 0x02,
    Hertz = 0x04,
}

// ---------------------------------------------------------------------------
// RecordKind – combinable flags (`misc` column)
// ---------------------------------------------------------------------------

/// Record kind bits. Unlike the other families these combine, e.g. a
/// total-integrated record whose accumulator overflowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RecordKind(u8);

impl RecordKind {
    pub const TOTAL_INTEGRATED: RecordKind = RecordKind(0x01);
    pub const PART_INTEGRATED: RecordKind = RecordKind(0x02);
    /// Data faulty due to accumulator overflow.
    pub const ACCUMULATOR_OVERFLOW: RecordKind = RecordKind(0x04);
    /// Data faulty due to A/D converter overflow.
    pub const ADC_OVERFLOW: RecordKind = RecordKind(0x08);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: RecordKind) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RecordKind {
    type Output = RecordKind;

    fn bitor(self, rhs: RecordKind) -> RecordKind {
        RecordKind(self.0 | rhs.0)
    }
}

impl SignalMode {
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

impl FrontendMode {
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

impl DataUnit {
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Spectrometer – the backends a query can target
// ---------------------------------------------------------------------------

/// A supported spectrometer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Spectrometer {
    Aos,
    Ffts,
    RpgFfts,
    RpgFfts2,
    Offts,
}

impl Spectrometer {
    pub const ALL: [Spectrometer; 5] = [
        Spectrometer::Aos,
        Spectrometer::Ffts,
        Spectrometer::RpgFfts,
        Spectrometer::RpgFfts2,
        Spectrometer::Offts,
    ];

    /// Resolve a spectrometer name, ignoring case.
    ///
    /// Unknown names are an error; there is no default backend.
    pub fn parse(name: &str) -> Result<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|s| s.name() == upper)
            .ok_or_else(|| SpextractError::UnknownSpectrometer(name.to_string()))
    }

    /// Canonical uppercase name, as written to output files.
    pub fn name(self) -> &'static str {
        match self {
            Spectrometer::Aos => "AOS",
            Spectrometer::Ffts => "FFTS",
            Spectrometer::RpgFfts => "RPGFFTS",
            Spectrometer::RpgFfts2 => "RPGFFTS2",
            Spectrometer::Offts => "OFFTS",
        }
    }

    /// Signal mode a record must carry to belong to this spectrometer.
    pub fn signal_mode(self) -> SignalMode {
        match self {
            Spectrometer::Aos => SignalMode::AosSignal,
            Spectrometer::Ffts => SignalMode::FftsSignal,
            Spectrometer::RpgFfts => SignalMode::RpgFftsSignal,
            Spectrometer::RpgFfts2 => SignalMode::RpgFfts2Signal,
            Spectrometer::Offts => SignalMode::OfftsSignal,
        }
    }
}

impl fmt::Display for Spectrometer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Spectrometer {
    type Err = SpextractError;

    fn from_str(s: &str) -> Result<Self> {
        Spectrometer::parse(s)
    }
}
