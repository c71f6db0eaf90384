use std::path::Path;

use las::Reader;
use pcs_core::pointcloud::{
    CloudHeader, FullCloudAccess, GenericValue, PointCursor, PtColor, PtGeometry,
};

use super::{ReaderStatus, Record};
use crate::error::OpenError;

/// Streaming cursor over a LAS/LAZ file.
pub struct LasCursor {
    reader: Reader,
    current: Option<Record>,
    status: ReaderStatus,
}

impl LasCursor {
    fn fetch_next(&mut self) -> Option<Record> {
        match self.reader.points().next() {
            Some(Ok(las_point)) => {
                self.status.count_one();
                Some(convert_las_point(las_point))
            }
            Some(Err(e)) => {
                log::warn!("error reading LAS point: {}", e);
                self.status.record_error(e.to_string());
                None
            }
            None => None,
        }
    }
}

fn convert_las_point(las_point: las::Point) -> Record {
    let color = las_point.color.map(|c| PtColor {
        r: c.red as f64,
        g: c.green as f64,
        b: c.blue as f64,
        a: 65535.0,
    });

    let mut attributes: Vec<(String, GenericValue)> = vec![
        ("intensity".to_string(), las_point.intensity.into()),
        ("returnNumber".to_string(), las_point.return_number.into()),
        (
            "classification".to_string(),
            u8::from(las_point.classification).into(),
        ),
        ("scanAngle".to_string(), las_point.scan_angle.into()),
        ("userData".to_string(), las_point.user_data.into()),
        (
            "pointSourceId".to_string(),
            las_point.point_source_id.into(),
        ),
    ];
    if let Some(gps_time) = las_point.gps_time {
        attributes.push(("gpsTime".to_string(), gps_time.into()));
    }

    Record {
        geometry: PtGeometry {
            x: las_point.x,
            y: las_point.y,
            z: las_point.z,
        },
        color,
        attributes,
    }
}

impl PointCursor for LasCursor {
    fn position(&self) -> PtGeometry<f64> {
        self.current.as_ref().map(|r| r.geometry).unwrap_or_default()
    }

    fn color(&self) -> Option<PtColor<f64>> {
        self.current.as_ref().and_then(|r| r.color)
    }

    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        self.current
            .as_ref()
            .and_then(|r| r.attributes.get(id))
            .map(|(_, v)| v.clone())
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        self.current.as_ref().and_then(|r| r.attribute_by_name(name))
    }

    fn attribute_list(&self) -> Vec<String> {
        self.current
            .as_ref()
            .map(|r| r.attributes.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default()
    }

    fn advance(&mut self) -> bool {
        self.current = self.fetch_next();
        self.current.is_some()
    }

    fn has_data(&self) -> bool {
        self.current.is_some()
    }
}

pub struct LasHeader {
    attributes: Vec<(String, GenericValue)>,
    point_count: i64,
}

impl CloudHeader for LasHeader {
    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        self.attributes.get(id).map(|(_, v)| v.clone())
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn attribute_list(&self) -> Vec<String> {
        self.attributes.iter().map(|(n, _)| n.clone()).collect()
    }

    fn expected_point_count(&self) -> i64 {
        self.point_count
    }
}

/// Open a LAS/LAZ file as a paired header and point cursor.
pub fn open_las(path: &Path) -> Result<(FullCloudAccess, ReaderStatus), OpenError> {
    let reader = Reader::from_path(path)?;

    let las_header = reader.header();
    let version = las_header.version();
    let header = LasHeader {
        attributes: vec![
            (
                "version".to_string(),
                format!("{}.{}", version.major, version.minor).into(),
            ),
            (
                "pointFormat".to_string(),
                las_header.point_format().to_u8()?.into(),
            ),
            (
                "pointCount".to_string(),
                las_header.number_of_points().into(),
            ),
        ],
        point_count: las_header.number_of_points() as i64,
    };

    let status = ReaderStatus::default();
    let mut cursor = LasCursor {
        reader,
        current: None,
        status: status.clone(),
    };
    // Position on the first point so the cursor starts with data.
    cursor.advance();

    Ok((
        FullCloudAccess {
            header: Box::new(header),
            points: Box::new(cursor),
        },
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use las::{Builder, Writer};

    fn sample_las_file() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::with_suffix(".las").unwrap();

        let mut builder = Builder::from((1, 4));
        builder.point_format = las::point::Format::new(0).unwrap();
        let header = builder.into_header().unwrap();
        let mut writer = Writer::from_path(file.path(), header).unwrap();

        for i in 0..3u16 {
            let point = las::Point {
                x: i as f64,
                y: 10.0 + i as f64,
                z: 100.0,
                intensity: 50 * (i + 1),
                ..Default::default()
            };
            writer.write_point(point).unwrap();
        }
        writer.close().unwrap();

        file
    }

    #[test]
    fn streams_points_with_standard_attributes() {
        let file = sample_las_file();
        let (mut cloud, status) = open_las(file.path()).unwrap();

        assert!(cloud.points.has_data());
        assert_eq!(cloud.points.position(), PtGeometry { x: 0.0, y: 10.0, z: 100.0 });
        assert_eq!(
            cloud.points.attribute_by_name("intensity"),
            Some(GenericValue::UInt(50))
        );
        assert!(cloud
            .points
            .attribute_list()
            .contains(&"returnNumber".to_string()));

        let mut seen = 1;
        while cloud.points.advance() {
            seen += 1;
        }
        assert_eq!(seen, 3);
        assert_eq!(status.processed(), 3);
        assert!(status.error().is_none());
    }

    #[test]
    fn header_reports_count_and_version() {
        let file = sample_las_file();
        let (cloud, _) = open_las(file.path()).unwrap();

        assert_eq!(cloud.header.expected_point_count(), 3);
        assert_eq!(
            cloud.header.attribute_by_name("version"),
            Some(GenericValue::Text("1.4".to_string()))
        );
        assert_eq!(
            cloud.header.attribute_by_name("pointCount"),
            Some(GenericValue::UInt(3))
        );
    }

    #[test]
    fn missing_file_fails_to_open() {
        assert!(open_las(Path::new("/nonexistent/cloud.las")).is_err());
    }
}
