use pcs_core::pointcloud::{EmptyCursor, GenericValue, PointCursor, PtColor, PtGeometry};

/// The delegation base every stage starts from.
///
/// Holds the one upstream cursor a stage exclusively owns and forwards the
/// whole cursor contract to it unchanged. Concrete stages embed a
/// `PassThrough` and override only the operations they actually change.
///
/// Operations assume the upstream chain is well formed; a malformed chain is
/// a programming error, not something stages validate at runtime.
pub struct PassThrough {
    src: Box<dyn PointCursor>,
}

impl PassThrough {
    pub fn new(src: Box<dyn PointCursor>) -> Self {
        PassThrough { src }
    }

    /// Unwrap, handing the upstream cursor back.
    pub fn into_inner(self) -> Box<dyn PointCursor> {
        self.src
    }
}

/// Detach the current chain head, leaving an exhausted placeholder behind.
///
/// Stage attachment uses this to take ownership of the chain only once all
/// fallible setup has succeeded, so a failed setup leaves the caller's chain
/// intact.
pub(crate) fn take_chain(chain: &mut Box<dyn PointCursor>) -> Box<dyn PointCursor> {
    std::mem::replace(chain, Box::new(EmptyCursor))
}

impl PointCursor for PassThrough {
    fn position(&self) -> PtGeometry<f64> {
        self.src.position()
    }

    fn color(&self) -> Option<PtColor<f64>> {
        self.src.color()
    }

    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        self.src.attribute_by_id(id)
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        self.src.attribute_by_name(name)
    }

    fn attribute_list(&self) -> Vec<String> {
        self.src.attribute_list()
    }

    fn advance(&mut self) -> bool {
        self.src.advance()
    }

    fn has_data(&self) -> bool {
        self.src.has_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcs_core::pointcloud::{BufferCloud, BufferPoint};

    #[test]
    fn forwards_everything_unchanged() {
        let cloud = BufferCloud::new(vec![
            BufferPoint::new(1.0, 2.0, 3.0)
                .with_color(0.5, 0.5, 0.5, 1.0)
                .with_attribute("intensity", 120u16),
            BufferPoint::new(4.0, 5.0, 6.0).with_attribute("intensity", 80u16),
        ]);

        let mut stage = PassThrough::new(Box::new(cloud.cursor()));

        assert!(stage.has_data());
        assert_eq!(stage.position(), PtGeometry { x: 1.0, y: 2.0, z: 3.0 });
        assert!(stage.color().is_some());
        assert_eq!(stage.attribute_list(), vec!["intensity".to_string()]);
        assert_eq!(
            stage.attribute_by_name("intensity"),
            Some(GenericValue::UInt(120))
        );
        assert_eq!(stage.attribute_by_id(0), Some(GenericValue::UInt(120)));

        assert!(stage.advance());
        assert_eq!(stage.position().x, 4.0);
        assert!(stage.color().is_none());
        assert!(!stage.advance());
        assert!(!stage.has_data());
    }
}
