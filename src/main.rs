use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use tifgrid::bbox::BoundingBox;
use tifgrid::config::{Config, parse_datetime};
use tifgrid::points::read_points;
use tifgrid::readers::{GeoTiffReader, ReadOutcome, SampleFormat};
use tifgrid::sampler::{format_value, sample_points};
use tifgrid::writers::{GeoTiffWriter, Provenance};

/// Load GeoTIFF grids, sample them at points and export windows.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: SubCmd,
}

#[derive(Clone, Debug, Subcommand)]
enum SubCmd {
    /// Print the value of every point, taken from the first raster with data.
    Sample(SampleArgs),
    /// Write the part of a raster overlapping a window as a new GeoTIFF.
    Clip(ClipArgs),
    /// Print a raster's layout and extent.
    Info(InfoArgs),
}

#[derive(Args, Clone, Debug)]
struct SampleArgs {
    /// JSON config holding points, rasters and an optional bbox.
    #[arg(short, long, conflicts_with_all = ["points", "rasters"])]
    config: Option<PathBuf>,

    /// File of `name;lat;lon` lines.
    #[arg(required_unless_present = "config")]
    points: Option<PathBuf>,

    /// Raster files, directories or glob patterns, consulted in order.
    #[arg(required_unless_present = "config")]
    rasters: Vec<String>,

    /// Write results here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct ClipArgs {
    /// Source GeoTIFF.
    src: PathBuf,

    /// Destination GeoTIFF.
    dest: PathBuf,

    /// Window as `top,bottom,left,right` in degrees.
    #[arg(long, required = true, value_delimiter = ',', num_args = 4, allow_negative_numbers = true)]
    bbox: Vec<f64>,

    #[arg(long)]
    artist: Option<String>,

    #[arg(long)]
    copyright: Option<String>,

    /// `YYYY-MM-DD HH:MM:SS`
    #[arg(long)]
    datetime: Option<String>,
}

#[derive(Args, Clone, Debug)]
struct InfoArgs {
    src: PathBuf,

    /// Load the whole raster and print its value range.
    #[arg(long)]
    stats: bool,
}

fn sample(args: SampleArgs) -> Result<ExitCode> {
    let config = match (args.config, args.points) {
        (Some(path), _) => Config::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        (None, Some(points)) => Config::new(points, args.rasters),
        (None, None) => bail!("either --config or a points file is required"),
    }
    .with_output(args.output);

    let points = read_points(config.points())?;
    let rasters = config.raster_paths()?;
    let run = sample_points(&points, &rasters, config.bbox().copied())?;

    let mut out: Box<dyn Write> = match config.output() {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for (point, value) in points.iter().zip(&run.values) {
        writeln!(
            out,
            "{};{};{};{}",
            point.name,
            point.lat,
            point.lon,
            format_value(*value)
        )?;
    }
    out.flush()?;

    if !run.has_data() && !run.stack.all_outside() {
        warn!("{} rasters could not be read", run.stack.failed);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn clip(args: ClipArgs) -> Result<ExitCode> {
    let window = match args.bbox.as_slice() {
        &[top, bottom, left, right] => BoundingBox::checked(top, bottom, left, right)?,
        _ => bail!("--bbox takes exactly four values"),
    };
    let provenance = Provenance {
        artist: args.artist,
        copyright: args.copyright,
        datetime: args.datetime.as_deref().map(parse_datetime).transpose()?,
    };

    let reader = GeoTiffReader::new(&args.src);
    let grid = match reader.read_window::<f32>(&window, None)? {
        ReadOutcome::Loaded(grid) => grid,
        ReadOutcome::OutsideWindow { .. } => {
            warn!("{} does not overlap the window", args.src.display());
            return Ok(ExitCode::FAILURE);
        }
    };
    info!("{grid}");

    let report = GeoTiffWriter::new(&grid)
        .provenance(provenance)
        .write(&args.dest)?;
    info!(
        "wrote {} rows to {}, {} of them as nodata",
        report.rows_written,
        args.dest.display(),
        report.missing_rows.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn raster_info(args: InfoArgs) -> Result<ExitCode> {
    let reader = GeoTiffReader::new(&args.src);
    let raster = reader.info()?;
    println!("{raster}");

    if args.stats {
        match raster.sample_format {
            SampleFormat::Int => println!("{}", reader.read_all::<i32>()?),
            _ => println!("{}", reader.read_all::<f32>()?),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        SubCmd::Sample(args) => sample(args),
        SubCmd::Clip(args) => clip(args),
        SubCmd::Info(args) => raster_info(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
