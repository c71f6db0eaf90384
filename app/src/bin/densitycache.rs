use std::io::{self, BufWriter, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use thiserror::Error;

use pcs_core::pointcloud::PointCursor;
use pcs_io::{open_point_cloud, OpenError};

/// One grid cell per `GRID_SCALE` points, on average.
const GRID_SCALE: f64 = 10.0;

#[derive(Parser, Debug)]
#[command(
    name = "densitycache",
    about = "Estimate per-point local density for a point cloud",
    version = "0.1"
)]
struct Cli {
    /// Path to a point cloud or point cloud-like file.
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

#[derive(Debug, Error)]
enum EstimatorError {
    #[error("could not open input: {0}")]
    Open(#[from] OpenError),

    #[error("could not read the full input: {0}")]
    Read(String),

    #[error("not enough points to estimate a density")]
    NotEnoughPoints,

    #[error("the points cover an invalid surface")]
    InvalidSurface,

    #[error("could not write density estimates: {0}")]
    Io(#[from] io::Error),
}

/// Geometry of the accumulation grid, derived from the cloud's footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GridInfo {
    scale: f64,
    x0: f64,
    y0: f64,
    width: usize,
    height: usize,
}

/// Walks the whole cursor once to size the grid from the horizontal
/// bounding box and the point count.
fn compute_grid_info(points: &mut dyn PointCursor) -> Result<GridInfo, EstimatorError> {
    if !points.has_data() {
        return Err(EstimatorError::NotEnoughPoints);
    }

    let first = points.position();
    let mut min_x = first.x;
    let mut max_x = first.x;
    let mut min_y = first.y;
    let mut max_y = first.y;
    let mut count: u64 = 1;

    while points.advance() {
        let p = points.position();
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
        count += 1;
    }

    if count <= 1 {
        return Err(EstimatorError::NotEnoughPoints);
    }

    let w = max_x - min_x;
    let h = max_y - min_y;
    let scale = (count as f64 / (GRID_SCALE * w * h)).sqrt();
    if !scale.is_finite() {
        return Err(EstimatorError::InvalidSurface);
    }

    Ok(GridInfo {
        scale,
        x0: min_x,
        y0: min_y,
        width: (scale * w).ceil() as usize,
        height: (scale * h).ceil() as usize,
    })
}

/// Accumulated density, one cell per grid node, row-major over x then y.
struct DensityGrid {
    cells: Vec<f32>,
    width: usize,
    height: usize,
}

impl DensityGrid {
    fn new(info: &GridInfo) -> Self {
        DensityGrid {
            cells: vec![0.0; info.width * info.height],
            width: info.width,
            height: info.height,
        }
    }

    fn at(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.height + j] as f64
    }

    /// Bilinear sample of the grid at the (fractional) cell coordinate.
    fn sample(&self, x: f64, y: f64) -> f64 {
        let x0 = (x.floor().max(0.0) as usize).min(self.width - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y0 = (y.floor().max(0.0) as usize).min(self.height - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let (fx0, fx1) = (x0 as f64, x1 as f64);
        let (fy0, fy1) = (y0 as f64, y1 as f64);

        (fx1 - x) * (fy1 - y) * self.at(x0, y0)
            + (x - fx0) * (fy1 - y) * self.at(x1, y0)
            + (fx1 - x) * (y - fy0) * self.at(x0, y1)
            + (x - fx0) * (y - fy0) * self.at(x1, y1)
    }

    /// Adds one point's contribution to every cell, falling off with the
    /// squared distance to the cell but capped at 1 near the point.
    fn deposit(&mut self, x: f64, y: f64) {
        for i in 0..self.width {
            for j in 0..self.height {
                let dx = i as f64 - x;
                let dy = j as f64 - y;
                let dsqr = (dx * dx + dy * dy) as f32;
                self.cells[i * self.height + j] += 1.0 / dsqr.max(1.0);
            }
        }
    }
}

/// Walks the cursor a second time and writes one density estimate per
/// point, in point order. Each estimate only reflects the points seen
/// before it, so the output is a cheap streaming approximation.
fn estimate_densities(
    points: &mut dyn PointCursor,
    info: &GridInfo,
    out: &mut dyn io::Write,
) -> Result<u64, EstimatorError> {
    let mut grid = DensityGrid::new(info);
    let mut written: u64 = 0;

    while points.has_data() {
        let p = points.position();
        let x = info.scale * (p.x - info.x0);
        let y = info.scale * (p.y - info.y0);

        let density = grid.sample(x, y) * info.scale * info.scale;
        writeln!(out, "{}", density)?;
        written += 1;

        grid.deposit(x, y);

        if !points.advance() {
            break;
        }
    }

    Ok(written)
}

fn run(args: &Cli) -> Result<(), EstimatorError> {
    // First pass sizes the grid, second pass estimates the densities.
    let (mut cloud, status) = open_point_cloud(&args.input)?;
    let info = compute_grid_info(cloud.points.as_mut())?;
    if let Some(message) = status.error() {
        return Err(EstimatorError::Read(message.to_string()));
    }

    let (mut cloud, status) = open_point_cloud(&args.input)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let written = estimate_densities(cloud.points.as_mut(), &info, &mut out)?;
    out.flush()?;
    if let Some(message) = status.error() {
        return Err(EstimatorError::Read(message.to_string()));
    }

    log::info!("estimated densities for {} points", written);
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
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcs_core::pointcloud::{BufferCloud, BufferPoint};

    fn unit_square() -> BufferCloud {
        BufferCloud::new(vec![
            BufferPoint::new(0.0, 0.0, 0.0),
            BufferPoint::new(1.0, 0.0, 0.0),
            BufferPoint::new(0.0, 1.0, 0.0),
            BufferPoint::new(1.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn grid_info_spans_the_bounding_box() {
        let mut cursor = unit_square().cursor();
        let info = compute_grid_info(&mut cursor).unwrap();

        assert_eq!(info.x0, 0.0);
        assert_eq!(info.y0, 0.0);
        // 4 points over 1 m^2: scale = sqrt(4 / 10) and a 1x1 grid.
        assert!((info.scale - (0.4f64).sqrt()).abs() < 1e-12);
        assert_eq!(info.width, 1);
        assert_eq!(info.height, 1);
    }

    #[test]
    fn a_single_point_is_rejected() {
        let mut cursor = BufferCloud::new(vec![BufferPoint::new(0.0, 0.0, 0.0)]).cursor();
        assert!(matches!(
            compute_grid_info(&mut cursor),
            Err(EstimatorError::NotEnoughPoints)
        ));
    }

    #[test]
    fn a_degenerate_footprint_is_rejected() {
        // All points on one vertical line: zero covered surface.
        let mut cursor = BufferCloud::new(vec![
            BufferPoint::new(2.0, 0.0, 0.0),
            BufferPoint::new(2.0, 1.0, 0.0),
            BufferPoint::new(2.0, 2.0, 0.0),
        ])
        .cursor();
        assert!(matches!(
            compute_grid_info(&mut cursor),
            Err(EstimatorError::InvalidSurface)
        ));
    }

    #[test]
    fn one_estimate_per_point_in_order() {
        let mut cursor = unit_square().cursor();
        let info = compute_grid_info(&mut cursor).unwrap();

        let mut cursor = unit_square().cursor();
        let mut out = Vec::new();
        let written = estimate_densities(&mut cursor, &info, &mut out).unwrap();

        assert_eq!(written, 4);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn revisiting_a_location_sees_a_growing_density() {
        // 40 points over 1 m^2 gives scale 2 and a 2x2 grid, so the
        // bilinear sample has distinct corners to interpolate between.
        let mut points = vec![BufferPoint::new(0.0, 0.0, 0.0)];
        points.extend((0..38).map(|_| BufferPoint::new(1.0, 1.0, 0.0)));
        points.push(BufferPoint::new(0.0, 0.0, 0.0));
        let cloud = BufferCloud::new(points);

        let mut cursor = cloud.clone().cursor();
        let info = compute_grid_info(&mut cursor).unwrap();

        let mut cursor = cloud.cursor();
        let mut out = Vec::new();
        estimate_densities(&mut cursor, &info, &mut out).unwrap();

        let estimates: Vec<f64> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect();

        // The grid is empty when the first point arrives; by the time the
        // same spot comes around again it has accumulated density.
        assert_eq!(estimates[0], 0.0);
        assert!(estimates[39] > 0.0);
    }
}
