use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BinaryBuilder, Date32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;

use spextract::data::extended::encode_spectrum;
use spextract::data::flags::{DataUnit, FrontendMode, RecordKind, SignalMode};

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Brightness temperature spectrum: baseline plus one emission line.
fn generate_spectrum(channels: usize, line_height: f64, noise_level: f64, rng: &mut SimpleRng) -> Vec<f64> {
    let centre = channels as f64 / 2.0;
    (0..channels)
        .map(|ch| 80.0 + gaussian(ch as f64, centre, channels as f64 / 40.0, line_height) + rng.gauss(0.0, noise_level))
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One row of the sample table.
struct SampleRow {
    signal_mode: SignalMode,
    frontend: FrontendMode,
    spectrum: Vec<f64>,
    gas: &'static str,
    elevation: f64,
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let channels = 2048;
    let date = NaiveDate::from_ymd_opt(2020, 1, 3).context("sample date")?;

    // Sky spectra of two backends, interleaved with hot-load calibration records.
    let mut rows = Vec::new();
    for i in 0..12 {
        let (signal_mode, gas) = if i % 2 == 0 {
            (SignalMode::RpgFftsSignal, "O3")
        } else {
            (SignalMode::FftsSignal, "CLO")
        };
        let frontend = if i % 3 == 2 { FrontendMode::HotLoad } else { FrontendMode::Signal };
        rows.push(SampleRow {
            signal_mode,
            frontend,
            spectrum: generate_spectrum(channels, 5.0 + i as f64, 0.05, &mut rng),
            gas,
            elevation: 10.0 + 2.5 * i as f64,
        });
    }

    let n = rows.len();
    let ids: Vec<i64> = (1..=n as i64).collect();
    let days = date.signed_duration_since(NaiveDate::default()).num_days() as i32;
    let mut spectrum_builder = BinaryBuilder::new();
    for row in &rows {
        spectrum_builder.append_value(encode_spectrum(&row.spectrum));
    }
    let int_column = |f: &dyn Fn(&SampleRow) -> i32| -> ArrayRef {
        Arc::new(Int32Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let columns: Vec<(&str, DataType, ArrayRef)> = vec![
        ("id", DataType::Int64, Arc::new(Int64Array::from(ids))),
        ("date", DataType::Date32, Arc::new(Date32Array::from(vec![days; n]))),
        (
            "time",
            DataType::Utf8,
            Arc::new(StringArray::from(
                (0..n).map(|i| format!("13:{:02}:46", i * 5)).collect::<Vec<_>>(),
            )),
        ),
        ("spectrum", DataType::Binary, Arc::new(spectrum_builder.finish())),
        ("integrate1", DataType::Int32, int_column(&|_| 100)),
        ("integrate2", DataType::Int32, int_column(&|_| 30)),
        ("integrate_ms", DataType::Int32, int_column(&|_| 60000)),
        (
            "elevation",
            DataType::Float64,
            Arc::new(Float64Array::from(rows.iter().map(|r| r.elevation).collect::<Vec<_>>())),
        ),
        ("azimuth", DataType::Float64, Arc::new(Float64Array::from(vec![98.7; n]))),
        (
            "gas",
            DataType::Utf8,
            Arc::new(StringArray::from(rows.iter().map(|r| r.gas).collect::<Vec<_>>())),
        ),
        ("noOfChannels", DataType::Int32, int_column(&|r| r.spectrum.len() as i32)),
        ("version", DataType::Int32, int_column(&|_| 20151106)),
        ("aosmode", DataType::Int32, int_column(&|r| r.signal_mode.bits() as i32)),
        ("femode", DataType::Int32, int_column(&|r| r.frontend.bits() as i32)),
        ("unit", DataType::Int32, int_column(&|_| DataUnit::Kelvin.bits() as i32)),
        ("misc", DataType::Int32, int_column(&|_| RecordKind::TOTAL_INTEGRATED.bits() as i32)),
    ];

    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, dtype, _)| Field::new(*name, dtype.clone(), false))
            .collect::<Vec<_>>(),
    ));
    let batch = RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, _, a)| a).collect())
        .context("Failed to create RecordBatch")?;

    // Write Parquet
    let output_path = "sample_table.parquet";
    let file = std::fs::File::create(output_path).context("Failed to create output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;

    println!("Wrote {n} records ({channels} channels each) to {output_path}");
    Ok(())
}
