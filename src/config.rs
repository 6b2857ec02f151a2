use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::flags::Spectrometer;
use crate::error::{Result, SpextractError};

/// File name searched for when no `--config` is given.
pub const SETTINGS_FILE: &str = "spextract.toml";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Site settings: where raw tables live and where SUM files go.
///
/// ```toml
/// default_spectrometer = "rpgffts"
/// basedir = "/data/sum"
///
/// [instruments.kimra]
/// path = "/data/raw/kimra"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub default_spectrometer: String,
    /// Root of the SUM output tree.
    pub basedir: PathBuf,
    pub instruments: BTreeMap<String, Instrument>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Instrument {
    /// Root of the raw table tree (`<path>/<YYYY>/<YYYY>-<MM>`).
    pub path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_spectrometer: "rpgffts".to_string(),
            basedir: PathBuf::from("."),
            instruments: BTreeMap::new(),
        }
    }
}

/// Input and output directories of one month of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthLayout {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).map_err(|e| SpextractError::Config(e.to_string()))?;
        Spectrometer::parse(&settings.default_spectrometer)?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SpextractError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Load from an explicit path, else the first `spextract.toml` found in
    /// `start` or one of its parents, else the defaults.
    pub fn discover(explicit: Option<&Path>, start: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match start.ancestors().map(|dir| dir.join(SETTINGS_FILE)).find(|p| p.is_file()) {
            Some(path) => {
                log::debug!("using settings from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Directories for `instrument` in `year`/`month`.
    pub fn month_layout(
        &self,
        instrument: &str,
        year: i32,
        month: u32,
        spectrometer: Spectrometer,
    ) -> Result<MonthLayout> {
        if !(1..=12).contains(&month) {
            return Err(SpextractError::Input(format!("month {month} is not in 1..=12")));
        }
        let key = instrument.to_ascii_lowercase();
        let entry = self
            .instruments
            .get(&key)
            .ok_or_else(|| SpextractError::Input(format!("instrument '{instrument}' not supported")))?;

        Ok(MonthLayout {
            input_dir: entry.path.join(year.to_string()).join(format!("{year}-{month:02}")),
            output_dir: self
                .basedir
                .join(instrument.to_ascii_uppercase())
                .join(spectrometer.name().to_ascii_lowercase()),
        })
    }
}
