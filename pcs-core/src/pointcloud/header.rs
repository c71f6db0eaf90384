use crate::pointcloud::cursor::PointCursor;
use crate::pointcloud::value::GenericValue;

/// Whole-cloud metadata, read independently of the per-point stream.
pub trait CloudHeader {
    fn attribute_by_id(&self, id: usize) -> Option<GenericValue>;

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue>;

    fn attribute_list(&self) -> Vec<String>;

    /// Expected total point count, advisory only (progress display).
    /// Negative when unknown.
    fn expected_point_count(&self) -> i64 {
        -1
    }
}

impl<H: CloudHeader + ?Sized> CloudHeader for Box<H> {
    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        (**self).attribute_by_id(id)
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        (**self).attribute_by_name(name)
    }

    fn attribute_list(&self) -> Vec<String> {
        (**self).attribute_list()
    }

    fn expected_point_count(&self) -> i64 {
        (**self).expected_point_count()
    }
}

/// A paired header and point cursor, as returned by the format openers.
/// Never partially populated: an open either yields both or fails.
pub struct FullCloudAccess {
    pub header: Box<dyn CloudHeader>,
    pub points: Box<dyn PointCursor>,
}
