use crate::pointcloud::value::GenericValue;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PtGeometry<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PtColor<T> {
    pub r: T,
    pub g: T,
    pub b: T,
    pub a: T,
}

/// Numeric representations a consumer may request geometry and color in.
pub trait Coordinate: Copy {
    fn from_f64(v: f64) -> Self;
}

impl Coordinate for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl Coordinate for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

/// A mutable position over a point sequence.
///
/// The cursor exposes read access to the current point and a single-step
/// advance. Processing stages both consume and implement this contract, so
/// they compose transparently regardless of order or count. Implementations
/// are not reentrant; exactly one consumer thread drives a chain.
pub trait PointCursor {
    /// Geometry of the current point, in double precision.
    fn position(&self) -> PtGeometry<f64>;

    /// Color of the current point, if the source carries color.
    fn color(&self) -> Option<PtColor<f64>>;

    /// Attribute at a zero-based position in [`PointCursor::attribute_list`].
    fn attribute_by_id(&self, id: usize) -> Option<GenericValue>;

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue>;

    /// Names of the attributes visible on the current point.
    fn attribute_list(&self) -> Vec<String>;

    /// Move to the next point. Returns false when the sequence is exhausted;
    /// exhaustion is the normal end-of-stream signal, not an error.
    fn advance(&mut self) -> bool;

    /// Whether the cursor is currently positioned on a point.
    fn has_data(&self) -> bool;
}

/// Caller-chosen precision reads, available on every cursor.
pub trait PointCursorExt: PointCursor {
    fn position_as<T: Coordinate>(&self) -> PtGeometry<T> {
        let p = self.position();
        PtGeometry {
            x: T::from_f64(p.x),
            y: T::from_f64(p.y),
            z: T::from_f64(p.z),
        }
    }

    fn color_as<T: Coordinate>(&self) -> Option<PtColor<T>> {
        self.color().map(|c| PtColor {
            r: T::from_f64(c.r),
            g: T::from_f64(c.g),
            b: T::from_f64(c.b),
            a: T::from_f64(c.a),
        })
    }
}

impl<C: PointCursor + ?Sized> PointCursorExt for C {}

// Boxed cursors delegate, so a chain of stages can be built over
// `Box<dyn PointCursor>` handles.
impl<C: PointCursor + ?Sized> PointCursor for Box<C> {
    fn position(&self) -> PtGeometry<f64> {
        (**self).position()
    }

    fn color(&self) -> Option<PtColor<f64>> {
        (**self).color()
    }

    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        (**self).attribute_by_id(id)
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        (**self).attribute_by_name(name)
    }

    fn attribute_list(&self) -> Vec<String> {
        (**self).attribute_list()
    }

    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn has_data(&self) -> bool {
        (**self).has_data()
    }
}

/// A cursor with no data, permanently exhausted.
///
/// Used as the placeholder while a stage takes ownership of the chain head,
/// and as a degenerate source in tests.
#[derive(Debug, Default)]
pub struct EmptyCursor;

impl PointCursor for EmptyCursor {
    fn position(&self) -> PtGeometry<f64> {
        PtGeometry::default()
    }

    fn color(&self) -> Option<PtColor<f64>> {
        None
    }

    fn attribute_by_id(&self, _id: usize) -> Option<GenericValue> {
        None
    }

    fn attribute_by_name(&self, _name: &str) -> Option<GenericValue> {
        None
    }

    fn attribute_list(&self) -> Vec<String> {
        Vec::new()
    }

    fn advance(&mut self) -> bool {
        false
    }

    fn has_data(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cursor_is_exhausted() {
        let mut cursor = EmptyCursor;
        assert!(!cursor.has_data());
        assert!(!cursor.advance());
        assert!(cursor.attribute_list().is_empty());
    }

    #[test]
    fn casted_reads() {
        let cursor = EmptyCursor;
        let single: PtGeometry<f32> = cursor.position_as::<f32>();
        assert_eq!(single.x, 0.0f32);
        let double: PtGeometry<f64> = cursor.position_as::<f64>();
        assert_eq!(double.z, 0.0f64);
    }
}
