use std::path::Path;

use las::{Builder, Writer};
use pcs_core::pointcloud::{FullCloudAccess, PointCursor};

use crate::error::WriteError;

fn clamp_channel(value: f64) -> u16 {
    value.clamp(0.0, u16::MAX as f64) as u16
}

fn fill_las_point(source: &dyn PointCursor) -> las::Point {
    let position = source.position();
    let mut point = las::Point {
        x: position.x,
        y: position.y,
        z: position.z,
        ..Default::default()
    };

    if let Some(color) = source.color() {
        point.color = Some(las::Color {
            red: clamp_channel(color.r),
            green: clamp_channel(color.g),
            blue: clamp_channel(color.b),
        });
    }

    if let Some(v) = source.attribute_by_name("intensity") {
        if let Ok(n) = v.to_numeric() {
            point.intensity = n.clamp(0.0, u16::MAX as f64) as u16;
        }
    }
    if let Some(v) = source.attribute_by_name("classification") {
        if let Ok(n) = v.to_numeric() {
            point.classification =
                las::point::Classification::new(n.clamp(0.0, u8::MAX as f64) as u8)
                    .unwrap_or_default();
        }
    }
    if let Some(v) = source.attribute_by_name("scanAngle") {
        if let Ok(n) = v.to_numeric() {
            point.scan_angle = n as f32;
        }
    }
    if let Some(v) = source.attribute_by_name("userData") {
        if let Ok(n) = v.to_numeric() {
            point.user_data = n.clamp(0.0, u8::MAX as f64) as u8;
        }
    }
    if let Some(v) = source.attribute_by_name("pointSourceId") {
        if let Ok(n) = v.to_numeric() {
            point.point_source_id = n.clamp(0.0, u16::MAX as f64) as u16;
        }
    }
    if let Some(v) = source.attribute_by_name("gpsTime") {
        if let Ok(n) = v.to_numeric() {
            point.gps_time = Some(n);
        }
    }

    point
}

/// Write the remaining points of the cursor to a LAS file.
///
/// The point format is chosen from what the first point carries: a gps time
/// adds time, a color adds the color channels. Returns the number of points
/// written.
pub fn write_las(path: &Path, cloud: &mut FullCloudAccess) -> Result<u64, WriteError> {
    let source = &mut cloud.points;

    let has_gps_time = source.attribute_by_name("gpsTime").is_some();
    let has_color = source.color().is_some();
    let format_id = match (has_gps_time, has_color) {
        (false, false) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (true, true) => 3,
    };

    let mut builder = Builder::from((1, 4));
    builder.point_format = las::point::Format::new(format_id)?;
    let header = builder.into_header()?;
    let mut writer = Writer::from_path(path, header)?;

    let mut written = 0u64;
    while source.has_data() {
        writer.write_point(fill_las_point(source.as_ref()))?;
        written += 1;
        if !source.advance() {
            break;
        }
    }
    writer.close()?;

    log::info!("wrote {} points to {:?}", written, path);
    Ok(written)
}
