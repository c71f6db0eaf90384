use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use pcs_core::pointcloud::{
    CloudHeader, FullCloudAccess, GenericValue, PointCursor, PtColor, PtGeometry,
};

use super::{ReaderStatus, Record};
use crate::error::OpenError;

/// Role of every column in the source file, resolved once from the header row.
struct ColumnLayout {
    x: usize,
    y: usize,
    z: usize,
    r: Option<usize>,
    g: Option<usize>,
    b: Option<usize>,
    a: Option<usize>,
    /// (column index, attribute name) for all remaining columns.
    attributes: Vec<(usize, String)>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self, OpenError> {
        let mut x = None;
        let mut y = None;
        let mut z = None;
        let mut r = None;
        let mut g = None;
        let mut b = None;
        let mut a = None;
        let mut attributes = Vec::new();

        for (idx, name) in headers.iter().enumerate() {
            let trimmed = name.trim();
            match trimmed.to_ascii_lowercase().as_str() {
                "x" => x = Some(idx),
                "y" => y = Some(idx),
                "z" => z = Some(idx),
                "r" | "red" => r = Some(idx),
                "g" | "green" => g = Some(idx),
                "b" | "blue" => b = Some(idx),
                "a" | "alpha" => a = Some(idx),
                _ => attributes.push((idx, trimmed.to_string())),
            }
        }

        Ok(ColumnLayout {
            x: x.ok_or(OpenError::MissingCoordinateColumn("x"))?,
            y: y.ok_or(OpenError::MissingCoordinateColumn("y"))?,
            z: z.ok_or(OpenError::MissingCoordinateColumn("z"))?,
            r,
            g,
            b,
            a,
            attributes,
        })
    }
}

fn parse_value(cell: &str) -> GenericValue {
    let trimmed = cell.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return GenericValue::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return GenericValue::Float(f);
    }
    GenericValue::Text(trimmed.to_string())
}

/// Streaming cursor over a CSV file with one point per row.
pub struct CsvCursor {
    reader: csv::Reader<File>,
    layout: ColumnLayout,
    current: Option<Record>,
    status: ReaderStatus,
}

impl CsvCursor {
    fn fetch_next(&mut self) -> Option<Record> {
        let mut row = StringRecord::new();
        loop {
            match self.reader.read_record(&mut row) {
                Ok(true) => match self.convert_row(&row) {
                    Some(record) => {
                        self.status.count_one();
                        return Some(record);
                    }
                    None => {
                        log::warn!("skipping malformed CSV row: {:?}", row);
                        continue;
                    }
                },
                Ok(false) => return None,
                Err(e) => {
                    log::warn!("error reading CSV row: {}", e);
                    self.status.record_error(e.to_string());
                    return None;
                }
            }
        }
    }

    fn convert_row(&self, row: &StringRecord) -> Option<Record> {
        let coordinate = |idx: usize| row.get(idx).and_then(|c| c.trim().parse::<f64>().ok());
        let geometry = PtGeometry {
            x: coordinate(self.layout.x)?,
            y: coordinate(self.layout.y)?,
            z: coordinate(self.layout.z)?,
        };

        let channel = |idx: Option<usize>| idx.and_then(coordinate);
        let color = match (
            channel(self.layout.r),
            channel(self.layout.g),
            channel(self.layout.b),
        ) {
            (Some(r), Some(g), Some(b)) => Some(PtColor {
                r,
                g,
                b,
                a: channel(self.layout.a).unwrap_or(255.0),
            }),
            _ => None,
        };

        let attributes = self
            .layout
            .attributes
            .iter()
            .filter_map(|(idx, name)| {
                row.get(*idx).map(|cell| (name.clone(), parse_value(cell)))
            })
            .collect();

        Some(Record {
            geometry,
            color,
            attributes,
        })
    }
}

impl PointCursor for CsvCursor {
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

pub struct CsvHeader {
    columns: Vec<String>,
}

impl CloudHeader for CsvHeader {
    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        self.columns.get(id).map(|c| GenericValue::Text(c.clone()))
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        self.columns
            .iter()
            .find(|c| *c == name)
            .map(|c| GenericValue::Text(c.clone()))
    }

    fn attribute_list(&self) -> Vec<String> {
        self.columns.clone()
    }
}

/// Open a CSV point file as a paired header and point cursor.
///
/// The first row must name the columns; `x`, `y` and `z` are required,
/// `r`/`g`/`b` (plus optional `a`) become the point color and every other
/// column is exposed as a point attribute.
pub fn open_csv(path: &Path) -> Result<(FullCloudAccess, ReaderStatus), OpenError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let layout = ColumnLayout::from_headers(&headers)?;

    let header = CsvHeader {
        columns: headers.iter().map(|h| h.trim().to_string()).collect(),
    };

    let status = ReaderStatus::default();
    let mut cursor = CsvCursor {
        reader,
        layout,
        current: None,
        status: status.clone(),
    };
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
    use std::io::Write as _;

    fn csv_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn columns_map_to_geometry_color_and_attributes() {
        let file = csv_file(
            b"X,Y,Z,r,g,b,intensity,label\n\
              1.0,2.0,3.0,255,0,128,77,tree\n\
              4.0,5.0,6.0,0,0,0,12,ground\n",
        );
        let (mut cloud, status) = open_csv(file.path()).unwrap();

        assert!(cloud.points.has_data());
        assert_eq!(cloud.points.position(), PtGeometry { x: 1.0, y: 2.0, z: 3.0 });
        let color = cloud.points.color().unwrap();
        assert_eq!((color.r, color.g, color.b, color.a), (255.0, 0.0, 128.0, 255.0));
        assert_eq!(
            cloud.points.attribute_by_name("intensity"),
            Some(GenericValue::Int(77))
        );
        assert_eq!(
            cloud.points.attribute_by_name("label"),
            Some(GenericValue::Text("tree".to_string()))
        );
        assert_eq!(
            cloud.points.attribute_list(),
            vec!["intensity".to_string(), "label".to_string()]
        );

        assert!(cloud.points.advance());
        assert_eq!(cloud.points.position().x, 4.0);
        assert!(!cloud.points.advance());
        assert_eq!(status.processed(), 2);
        assert!(status.error().is_none());
    }

    #[test]
    fn numeric_attributes_parse_before_text() {
        let file = csv_file(b"x,y,z,value\n0,0,0,2.5\n");
        let (cloud, _) = open_csv(file.path()).unwrap();
        assert_eq!(
            cloud.points.attribute_by_name("value"),
            Some(GenericValue::Float(2.5))
        );
    }

    #[test]
    fn color_needs_all_three_channels() {
        let file = csv_file(b"x,y,z,r,g\n0,0,0,255,255\n");
        let (cloud, _) = open_csv(file.path()).unwrap();
        assert!(cloud.points.color().is_none());
    }

    #[test]
    fn missing_coordinate_column_fails_to_open() {
        let file = csv_file(b"x,y,intensity\n0,0,50\n");
        let err = open_csv(file.path());
        assert!(matches!(err, Err(OpenError::MissingCoordinateColumn("z"))));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        // A non-numeric coordinate and a short row, between two good rows.
        let file = csv_file(
            b"x,y,z\n\
              1,1,1\n\
              nope,2,2\n\
              3,3\n\
              4,4,4\n",
        );
        let (mut cloud, status) = open_csv(file.path()).unwrap();

        let mut xs = vec![cloud.points.position().x];
        while cloud.points.advance() {
            xs.push(cloud.points.position().x);
        }
        assert_eq!(xs, vec![1.0, 4.0]);
        assert_eq!(status.processed(), 2);
        assert!(status.error().is_none());
    }

    #[test]
    fn undecodable_row_ends_the_stream_and_latches_the_error() {
        let mut content = b"x,y,z\n1,1,1\n".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, b',', b'2', b',', b'2', b'\n']);
        content.extend_from_slice(b"3,3,3\n");
        let file = csv_file(&content);

        let (mut cloud, status) = open_csv(file.path()).unwrap();
        assert_eq!(cloud.points.position().x, 1.0);
        // The invalid byte sequence is a decode error, not a skippable row.
        assert!(!cloud.points.advance());
        assert!(status.error().is_some());
        assert_eq!(status.processed(), 1);
    }
}
