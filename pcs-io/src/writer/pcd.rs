use std::io::Write;

use pcs_core::pointcloud::{FullCloudAccess, GenericValue};

use crate::error::WriteError;

/// On-disk layout of the PCD DATA section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdDataStorage {
    Ascii,
    Binary,
}

/// Column schema fixed from the first point of the stream.
struct PcdSchema {
    fields: Vec<String>,
    /// Names of the point attributes that back the trailing columns.
    attribute_names: Vec<String>,
    has_color: bool,
}

impl PcdSchema {
    fn from_first_point(cloud: &FullCloudAccess) -> Self {
        let mut fields = vec!["x".to_string(), "y".to_string(), "z".to_string()];

        let has_color = cloud.points.color().is_some();
        if has_color {
            fields.extend(["r", "g", "b", "a"].map(String::from));
        }

        let mut attribute_names = Vec::new();
        for name in cloud.points.attribute_list() {
            match cloud.points.attribute_by_name(&name) {
                Some(GenericValue::Text(_)) => {
                    log::warn!("skipping non-numeric attribute {:?} in PCD output", name);
                }
                Some(_) => {
                    fields.push(name.clone());
                    attribute_names.push(name);
                }
                None => {}
            }
        }

        PcdSchema {
            fields,
            attribute_names,
            has_color,
        }
    }
}

fn capture_row(schema: &PcdSchema, cloud: &FullCloudAccess) -> Vec<f64> {
    let mut row = Vec::with_capacity(schema.fields.len());
    let position = cloud.points.position();
    row.extend([position.x, position.y, position.z]);

    if schema.has_color {
        match cloud.points.color() {
            Some(color) => row.extend([color.r, color.g, color.b, color.a]),
            None => row.extend([f64::NAN; 4]),
        }
    }

    for name in &schema.attribute_names {
        let value = cloud
            .points
            .attribute_by_name(name)
            .and_then(|v| v.to_numeric().ok())
            .unwrap_or(f64::NAN);
        row.push(value);
    }

    row
}

/// Write the remaining points of the cursor as a PCD 0.7 document.
///
/// The field list is fixed from the first point; every column is stored as a
/// 64-bit float. Points are buffered before the header goes out because PCD
/// records the point count up front. Returns the number of points written.
pub fn write_pcd<W: Write>(
    dest: &mut W,
    cloud: &mut FullCloudAccess,
    storage: PcdDataStorage,
) -> Result<u64, WriteError> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut schema = None;

    while cloud.points.has_data() {
        let schema = schema.get_or_insert_with(|| PcdSchema::from_first_point(cloud));
        rows.push(capture_row(schema, cloud));
        if !cloud.points.advance() {
            break;
        }
    }

    let fields = match &schema {
        Some(schema) => schema.fields.clone(),
        None => vec!["x".to_string(), "y".to_string(), "z".to_string()],
    };

    writeln!(dest, "VERSION 0.7")?;
    writeln!(dest, "FIELDS {}", fields.join(" "))?;
    writeln!(
        dest,
        "SIZE {}",
        fields.iter().map(|_| "8").collect::<Vec<_>>().join(" ")
    )?;
    writeln!(
        dest,
        "TYPE {}",
        fields.iter().map(|_| "F").collect::<Vec<_>>().join(" ")
    )?;
    writeln!(
        dest,
        "COUNT {}",
        fields.iter().map(|_| "1").collect::<Vec<_>>().join(" ")
    )?;
    writeln!(dest, "WIDTH {}", rows.len())?;
    writeln!(dest, "HEIGHT 1")?;
    writeln!(dest, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(dest, "POINTS {}", rows.len())?;

    match storage {
        PcdDataStorage::Ascii => {
            writeln!(dest, "DATA ascii")?;
            for row in &rows {
                let line = row
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(dest, "{}", line)?;
            }
        }
        PcdDataStorage::Binary => {
            writeln!(dest, "DATA binary")?;
            for row in &rows {
                for value in row {
                    dest.write_all(&value.to_le_bytes())?;
                }
            }
        }
    }

    Ok(rows.len() as u64)
}
