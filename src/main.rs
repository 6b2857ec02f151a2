use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use spextract::config::Settings;
use spextract::data::loader::TableFile;
use spextract::output::stream;
use spextract::output::sum::SumFileWriter;
use spextract::pipeline;
use spextract::{ExtractionMode, RecordSelector, Result, SoftwareDecoder, Spectrometer, SpextractError};

/// Extracts all or just the last total-integrated spectrum from a
/// measurement table into SUM files.
///
/// Any existing output file is overwritten.
#[derive(Parser)]
#[command(name = "spextract", version)]
struct Cli {
    /// Settings file (default: spextract.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one table file (or a JSON record stream) into SUM files
    Extract(ExtractArgs),

    /// Convert every table file of one instrument month
    Month(MonthArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// aos, ffts, rpgffts, rpgffts2 or offts (required unless --jsonin)
    #[arg(short, long)]
    spectrometer: Option<String>,

    /// Table file to read
    #[arg(short, long, required_unless_present = "jsonin")]
    infile: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    outdir: PathBuf,

    /// Output file name (numbered when several records are written)
    #[arg(short = 'f', long)]
    outfile: Option<String>,

    /// 1 for all spectra, 3 for just the latest
    #[arg(short = 'x', long, required_unless_present = "jsonin")]
    extractmode: Option<i64>,

    /// Write the records to stdout as JSON instead of SUM files
    #[arg(long, conflicts_with = "jsonin")]
    jsonout: bool,

    /// Read the records as JSON from stdin instead of a table file
    #[arg(long)]
    jsonin: bool,
}

#[derive(Args)]
struct MonthArgs {
    /// Instrument name as configured in the settings file
    instrument: String,

    year: i32,

    month: u32,

    #[arg(short, long)]
    spectrometer: Option<String>,

    /// Output directory (default: <basedir>/<INSTRUMENT>/<spectrometer>)
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    #[arg(short = 'x', long, default_value_t = 1)]
    extractmode: i64,
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings = Settings::discover(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Month(args) => run_month(args, &settings),
    }
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let writer = SumFileWriter::new(&args.outdir, args.outfile.clone());

    if args.jsonin {
        let measurements = stream::read_from(io::stdin().lock())?;
        log::info!("read {} record(s) from stdin", measurements.len());
        writer.write_all(&measurements)?;
        return Ok(());
    }

    // No settings default here: a table conversion needs an explicit backend.
    let spectrometer = args
        .spectrometer
        .ok_or_else(|| SpextractError::UnknownSpectrometer(String::new()))?;
    let selector = RecordSelector::from_args(&spectrometer, args.extractmode.unwrap_or_default())?;
    let infile = args.infile.unwrap_or_default();

    if args.jsonout {
        let table = TableFile::open(&infile)?;
        let extraction = pipeline::extract(&table, &selector, &SoftwareDecoder)?;
        stream::write_to(io::stdout().lock(), &extraction.into_measurements())?;
    } else {
        let report = pipeline::convert_file(&infile, &selector, &SoftwareDecoder, &writer)?;
        log::info!("{} file(s) written, {} skipped", report.written.len(), report.skipped.len());
    }
    Ok(())
}

fn run_month(args: MonthArgs, settings: &Settings) -> Result<()> {
    let spectrometer = Spectrometer::parse(args.spectrometer.as_deref().unwrap_or(&settings.default_spectrometer))?;
    let mode = ExtractionMode::from_code(args.extractmode)?;
    let layout = settings.month_layout(&args.instrument, args.year, args.month, spectrometer)?;
    let output_dir = args.outdir.unwrap_or(layout.output_dir);

    let selector = RecordSelector::new(spectrometer, mode);
    let reports = pipeline::convert_directory(&layout.input_dir, &output_dir, &selector, &SoftwareDecoder)?;
    let written: usize = reports.iter().map(|(_, r)| r.written.len()).sum();
    log::info!("{} table(s) converted, {written} file(s) written", reports.len());
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        log::error!("{e}");
        process::exit(e.exit_code());
    }
}
