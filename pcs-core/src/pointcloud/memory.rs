use crate::pointcloud::cursor::{PointCursor, PtColor, PtGeometry};
use crate::pointcloud::header::CloudHeader;
use crate::pointcloud::value::GenericValue;

/// One fully materialized point record.
#[derive(Debug, Clone, Default)]
pub struct BufferPoint {
    pub geometry: PtGeometry<f64>,
    pub color: Option<PtColor<f64>>,
    pub attributes: Vec<(String, GenericValue)>,
}

impl BufferPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        BufferPoint {
            geometry: PtGeometry { x, y, z },
            color: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_color(mut self, r: f64, g: f64, b: f64, a: f64) -> Self {
        self.color = Some(PtColor { r, g, b, a });
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<GenericValue>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }
}

/// An in-memory point cloud.
///
/// Small clouds can be materialized and replayed through the cursor
/// contract; this is also the standard source for stage tests.
#[derive(Debug, Clone, Default)]
pub struct BufferCloud {
    pub points: Vec<BufferPoint>,
    pub header_attributes: Vec<(String, GenericValue)>,
}

impl BufferCloud {
    pub fn new(points: Vec<BufferPoint>) -> Self {
        BufferCloud {
            points,
            header_attributes: Vec::new(),
        }
    }

    pub fn cursor(self) -> BufferCursor {
        BufferCursor {
            points: self.points,
            index: 0,
        }
    }

    pub fn header(&self) -> BufferHeader {
        BufferHeader {
            attributes: self.header_attributes.clone(),
            point_count: self.points.len() as i64,
        }
    }
}

pub struct BufferCursor {
    points: Vec<BufferPoint>,
    index: usize,
}

impl BufferCursor {
    fn current(&self) -> Option<&BufferPoint> {
        self.points.get(self.index)
    }
}

impl PointCursor for BufferCursor {
    fn position(&self) -> PtGeometry<f64> {
        self.current().map(|p| p.geometry).unwrap_or_default()
    }

    fn color(&self) -> Option<PtColor<f64>> {
        self.current().and_then(|p| p.color)
    }

    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        self.current()
            .and_then(|p| p.attributes.get(id))
            .map(|(_, v)| v.clone())
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        self.current().and_then(|p| {
            p.attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        })
    }

    fn attribute_list(&self) -> Vec<String> {
        self.current()
            .map(|p| p.attributes.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default()
    }

    fn advance(&mut self) -> bool {
        if self.index + 1 < self.points.len() {
            self.index += 1;
            true
        } else {
            self.index = self.points.len();
            false
        }
    }

    fn has_data(&self) -> bool {
        self.index < self.points.len()
    }
}

pub struct BufferHeader {
    attributes: Vec<(String, GenericValue)>,
    point_count: i64,
}

impl BufferHeader {
    pub fn new(attributes: Vec<(String, GenericValue)>, point_count: i64) -> Self {
        BufferHeader {
            attributes,
            point_count,
        }
    }
}

impl CloudHeader for BufferHeader {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud_of(n: usize) -> BufferCloud {
        BufferCloud::new(
            (0..n)
                .map(|i| BufferPoint::new(i as f64, 0.0, 0.0).with_attribute("idx", i as u64))
                .collect(),
        )
    }

    #[test]
    fn cursor_walks_all_points() {
        let mut cursor = cloud_of(4).cursor();
        let mut seen = vec![cursor.position().x];
        while cursor.advance() {
            seen.push(cursor.position().x);
        }
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0]);
        assert!(!cursor.has_data());
    }

    #[test]
    fn attribute_access_by_id_and_name() {
        let cursor = cloud_of(2).cursor();
        assert_eq!(cursor.attribute_list(), vec!["idx".to_string()]);
        assert_eq!(cursor.attribute_by_id(0), Some(GenericValue::UInt(0)));
        assert_eq!(cursor.attribute_by_name("idx"), Some(GenericValue::UInt(0)));
        assert_eq!(cursor.attribute_by_name("missing"), None);
    }

    #[test]
    fn header_reports_count() {
        let cloud = cloud_of(3);
        assert_eq!(cloud.header().expected_point_count(), 3);
    }
}
