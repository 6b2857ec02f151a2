//! JSON record stream for moving measurements between processes.
//!
//! The stream is an array of objects with the keys `source`, `date`,
//! `time`, `gas`, `integration`, `integrationtime`, `elevation`,
//! `azimuth`, `spectrometer` and `spectrum`.

use std::io::{Read, Write};

use crate::data::model::Measurement;
use crate::error::Result;

/// Encode measurements as a JSON array.
pub fn encode(measurements: &[Measurement]) -> Result<String> {
    Ok(serde_json::to_string(measurements)?)
}

/// Decode a JSON array produced by [`encode`].
pub fn decode(text: &str) -> Result<Vec<Measurement>> {
    Ok(serde_json::from_str(text)?)
}

/// Stream measurements to `writer` (e.g. stdout) and flush it.
pub fn write_to<W: Write>(mut writer: W, measurements: &[Measurement]) -> Result<()> {
    serde_json::to_writer(&mut writer, measurements)?;
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}

/// Read a whole measurement stream from `reader` (e.g. stdin).
pub fn read_from<R: Read>(reader: R) -> Result<Vec<Measurement>> {
    Ok(serde_json::from_reader(std::io::BufReader::new(reader))?)
}

// ---------------------------------------------------------------------------
// Field representations
// ---------------------------------------------------------------------------

/// `date` as `DD.MM.YYYY`.
pub(crate) mod dotted_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%d.%m.%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(d)?;
        NaiveDate::parse_from_str(&text, FORMAT).map_err(D::Error::custom)
    }
}

/// `time` is opaque text; older producers wrote a bare `0` for fallback
/// records, so numbers are accepted too.
pub(crate) fn opaque_time<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Time {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Time::deserialize(d)? {
        Time::Text(s) => s,
        Time::Integer(i) => i.to_string(),
        Time::Float(v) => v.to_string(),
    })
}

/// Spectrum values: finite numbers as JSON numbers, the rest as the
/// strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
pub(crate) mod spectrum_values {
    use serde::de::Error;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Value {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for v in values {
            if v.is_finite() {
                seq.serialize_element(v)?;
            } else if v.is_nan() {
                seq.serialize_element("NaN")?;
            } else if *v > 0.0 {
                seq.serialize_element("Infinity")?;
            } else {
                seq.serialize_element("-Infinity")?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Value>::deserialize(d)?
            .into_iter()
            .map(|v| match v {
                Value::Number(n) => Ok(n),
                Value::Text(t) => match t.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "Infinity" => Ok(f64::INFINITY),
                    "-Infinity" => Ok(f64::NEG_INFINITY),
                    other => Err(D::Error::custom(format!("invalid spectrum value '{other}'"))),
                },
            })
            .collect()
    }
}
