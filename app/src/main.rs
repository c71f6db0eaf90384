use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::mem;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Local;
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use log::LevelFilter;
use thiserror::Error;

use pcs_core::pointcloud::{BufferHeader, FullCloudAccess, GenericValue};
use pcs_io::{
    open_point_cloud, write_las, write_pcd, OpenError, PcdDataStorage, ReaderStatus, WriteError,
};
use pcs_stages::{
    AliasHeader, AttributeFilter, AttributeSelector, AttributeSetSelector, Comparator,
    CrsConversion, PointLimit, RoiSelector, SetMode, SetupError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    PcdAscii,
    PcdBin,
    Lasv14,
}

#[derive(Parser, Debug)]
#[command(
    name = "lidarstream",
    about = "Process lidar data on the fly",
    version = "0.1"
)]
struct Cli {
    /// Path to a point cloud or point cloud-like file.
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file path.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Override the CRS of the input data (any string PROJ can parse,
    /// e.g. a WKT string or an "EPSG:####" code).
    #[arg(long)]
    incrs: Option<String>,

    /// The CRS to use for the output data. If not specified, no CRS
    /// transform is done.
    #[arg(long)]
    outcrs: Option<String>,

    /// A region of interest formatted as "x0,y0,z0,dx,dy,dz,rx,ry,rz", with
    /// x0,y0,z0 the origin of the cuboid, dx,dy,dz the spans of the
    /// unrotated cuboid and rx,ry,rz the axis angle of the rotation around
    /// the origin.
    #[arg(long)]
    roi: Option<String>,

    /// The maximal density of the point cloud, as points per m^2.
    #[arg(short, long)]
    density: Option<f64>,

    /// The maximal number of points in the output point cloud.
    #[arg(short, long)]
    number: Option<u64>,

    /// Keep one point out of this many when limiting the point count.
    #[arg(long, default_value_t = 1)]
    stride: u64,

    /// The maximal return index to use.
    #[arg(short, long)]
    returns: Option<i64>,

    /// The index of a line to export (repeatable).
    #[arg(short, long)]
    line: Vec<i64>,

    /// A range of line indices to export, formatted as start-end, both
    /// included (repeatable).
    #[arg(long = "line-range", value_name = "START-END")]
    line_range: Vec<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::PcdAscii)]
    format: OutputFormat,

    /// Remove the color data, if present.
    #[arg(long)]
    remove_color: bool,

    /// Remove all data that is not geometry.
    #[arg(long)]
    remove_all_attributes: bool,

    /// Filter out an attribute in the data (repeatable).
    #[arg(long, value_name = "NAME")]
    remove_attribute: Vec<String>,

    /// Time the export and print statistics at the end.
    #[arg(short, long)]
    benchmark: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("could not parse line range {0:?}, expected start-end")]
    BadLineRange(String),

    #[error("could not get input crs info, crs conversion error")]
    MissingInputCrs,

    #[error("could not open input: {0}")]
    Open(#[from] OpenError),

    #[error("could not read the full input: {0}")]
    Read(String),

    #[error("could not build the processing stack: {0}")]
    Setup(#[from] SetupError),

    #[error("could not write point cloud data: {0}")]
    Write(#[from] WriteError),
}

impl AppError {
    /// Argument and open failures, stack-construction failures and write
    /// failures each get their own exit code.
    fn exit_code(&self) -> u8 {
        match self {
            AppError::BadLineRange(_)
            | AppError::MissingInputCrs
            | AppError::Open(_)
            | AppError::Read(_) => 1,
            AppError::Setup(_) => 2,
            AppError::Write(_) => 3,
        }
    }
}

fn parse_line_range(range: &str) -> Result<(i64, i64), AppError> {
    let (a, b) = range
        .split_once('-')
        .ok_or_else(|| AppError::BadLineRange(range.to_string()))?;
    let a: i64 = a
        .trim()
        .parse()
        .map_err(|_| AppError::BadLineRange(range.to_string()))?;
    let b: i64 = b
        .trim()
        .parse()
        .map_err(|_| AppError::BadLineRange(range.to_string()))?;
    Ok((a.min(b), a.max(b)))
}

/// Collects `-l` indices and expanded `--line-range` ranges.
fn collect_line_indices(args: &Cli) -> Result<Vec<i64>, AppError> {
    let mut lines = args.line.clone();
    for range in &args.line_range {
        let (start, end) = parse_line_range(range)?;
        lines.extend(start..=end);
    }
    Ok(lines)
}

fn build_stack(args: &Cli, cloud: &mut FullCloudAccess) -> Result<(), AppError> {
    // Selection first, so that points are dropped before any processing.
    if let Some(roi) = &args.roi {
        RoiSelector::attach(&mut cloud.points, roi)?;
    }

    if let Some(density) = args.density {
        if density > 0.0 && density.is_finite() {
            AttributeSelector::attach(
                &mut cloud.points,
                "densityFilterAttr",
                Comparator::LessOrEqual,
                GenericValue::Float(density),
            )?;
        }
    }

    if let Some(number) = args.number {
        PointLimit::attach(&mut cloud.points, number, args.stride)?;
    }

    if let Some(returns) = args.returns {
        if returns > 0 {
            AttributeSelector::attach(
                &mut cloud.points,
                "returnNumber",
                Comparator::LessOrEqual,
                GenericValue::Int(returns),
            )?;
        }
    }

    let lines = collect_line_indices(args)?;
    if !lines.is_empty() {
        AttributeSetSelector::attach(
            &mut cloud.points,
            "lineNumber",
            SetMode::InSet,
            lines.into_iter().map(GenericValue::Int).collect(),
        )?;
    }

    // Then processing, on the leftover points only.
    AttributeFilter::attach(
        &mut cloud.points,
        args.remove_color,
        &args.remove_attribute,
        args.remove_all_attributes,
    )?;

    if let Some(out_crs) = &args.outcrs {
        let in_crs = match cloud.header.attribute_by_name("crs") {
            Some(value) => value.to_text(),
            None => args.incrs.clone().ok_or(AppError::MissingInputCrs)?,
        };
        if in_crs.is_empty() {
            return Err(AppError::MissingInputCrs);
        }

        CrsConversion::attach(&mut cloud.points, &in_crs, out_crs)?;

        let src = mem::replace(
            &mut cloud.header,
            Box::new(BufferHeader::new(Vec::new(), -1)),
        );
        cloud.header = Box::new(AliasHeader::new(
            src,
            [("crs".to_string(), GenericValue::Text(out_crs.clone()))],
        ));
    }

    Ok(())
}

/// Samples the reader's processed-points counter every 100 ms and reports
/// progress over stderr until told to stop.
fn spawn_progress_reporter(
    status: ReaderStatus,
    expected: i64,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if expected < 0 {
            return;
        }

        while !stop.load(Ordering::Relaxed) {
            eprint!("\rProcessed {}/{}", status.processed(), expected);
            let _ = std::io::stderr().flush();
            thread::sleep(Duration::from_millis(100));
        }

        eprintln!("\rProcessed {}/{} ", expected, expected);
    })
}

fn run(args: &Cli) -> Result<(), AppError> {
    let (mut cloud, status) = open_point_cloud(&args.input)?;
    let expected = cloud.header.expected_point_count();

    build_stack(args, &mut cloud)?;

    let start = std::time::Instant::now();

    let stop = Arc::new(AtomicBool::new(false));
    let progress = spawn_progress_reporter(status.clone(), expected, Arc::clone(&stop));

    let result = match args.format {
        OutputFormat::Lasv14 => write_las(&args.output, &mut cloud),
        OutputFormat::PcdAscii | OutputFormat::PcdBin => {
            let storage = match args.format {
                OutputFormat::PcdBin => PcdDataStorage::Binary,
                _ => PcdDataStorage::Ascii,
            };
            File::create(&args.output)
                .map_err(WriteError::from)
                .and_then(|file| {
                    let mut dest = BufWriter::new(file);
                    let written = write_pcd(&mut dest, &mut cloud, storage)?;
                    dest.flush()?;
                    Ok(written)
                })
        }
    };

    stop.store(true, Ordering::Relaxed);
    let _ = progress.join();

    let written = result?;
    log::info!("wrote {} points to {:?}", written, args.output);

    // A decode failure mid-stream ends the cursor early; report it as a
    // failure of the whole export, not a silent truncation.
    if let Some(message) = status.error() {
        return Err(AppError::Read(message.to_string()));
    }

    if args.benchmark {
        log::info!(
            "processed the point cloud in {:.3} seconds",
            start.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .init();

    let args = Cli::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_range_parses_both_orders() {
        assert_eq!(parse_line_range("3-7").unwrap(), (3, 7));
        assert_eq!(parse_line_range("7-3").unwrap(), (3, 7));
        assert_eq!(parse_line_range("5-5").unwrap(), (5, 5));
    }

    #[test]
    fn malformed_line_range_is_rejected() {
        assert!(parse_line_range("7").is_err());
        assert!(parse_line_range("a-b").is_err());
        assert!(parse_line_range("").is_err());
    }

    #[test]
    fn line_arguments_and_ranges_accumulate() {
        let args = Cli::parse_from([
            "lidarstream",
            "in.las",
            "-o",
            "out.pcd",
            "-l",
            "1",
            "--line-range",
            "4-6",
        ]);
        assert_eq!(collect_line_indices(&args).unwrap(), vec![1, 4, 5, 6]);
    }

    #[test]
    fn cli_defaults() {
        let args = Cli::parse_from(["lidarstream", "in.las", "-o", "out.pcd"]);
        assert_eq!(args.format, OutputFormat::PcdAscii);
        assert_eq!(args.stride, 1);
        assert!(!args.benchmark);
        assert!(args.line.is_empty());
    }
}
