use std::collections::BTreeSet;

use pcs_core::pointcloud::{GenericValue, PointCursor, PtColor, PtGeometry};

use crate::error::SetupError;
use crate::passthrough::{take_chain, PassThrough};

/// Hides color and/or a subset (or all) of the named attributes.
///
/// The surviving attribute list and the id remapping back to upstream
/// positions are recomputed after every advance, since the visible
/// attribute set may vary per point.
pub struct AttributeFilter {
    base: PassThrough,
    excluded: BTreeSet<String>,
    remove_color: bool,
    remove_all: bool,
    visible: Vec<String>,
    id_map: Vec<usize>,
}

impl AttributeFilter {
    /// Wrap the chain head in a projection filter.
    ///
    /// When nothing is filtered (no exclusions, color kept, remove-all
    /// unset) this is a no-op: the chain is left unchanged, no wrapper is
    /// allocated.
    pub fn attach(
        chain: &mut Box<dyn PointCursor>,
        remove_color: bool,
        excluded: &[String],
        remove_all: bool,
    ) -> Result<(), SetupError> {
        if !remove_color && excluded.is_empty() && !remove_all {
            return Ok(());
        }

        let mut stage = AttributeFilter {
            base: PassThrough::new(take_chain(chain)),
            excluded: if remove_all {
                BTreeSet::new()
            } else {
                excluded.iter().cloned().collect()
            },
            remove_color,
            remove_all,
            visible: Vec::new(),
            id_map: Vec::new(),
        };
        stage.recompute();

        *chain = Box::new(stage);
        Ok(())
    }

    fn recompute(&mut self) {
        self.visible.clear();
        self.id_map.clear();

        if self.remove_all {
            return;
        }

        for (id, name) in self.base.attribute_list().into_iter().enumerate() {
            if self.excluded.contains(&name) {
                continue;
            }
            self.visible.push(name);
            self.id_map.push(id);
        }
    }
}

impl PointCursor for AttributeFilter {
    fn position(&self) -> PtGeometry<f64> {
        self.base.position()
    }

    fn color(&self) -> Option<PtColor<f64>> {
        if self.remove_color {
            return None;
        }
        self.base.color()
    }

    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        if self.remove_all {
            return None;
        }
        self.id_map
            .get(id)
            .and_then(|&upstream_id| self.base.attribute_by_id(upstream_id))
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        if self.remove_all || self.excluded.contains(name) {
            return None;
        }
        self.base.attribute_by_name(name)
    }

    fn attribute_list(&self) -> Vec<String> {
        self.visible.clone()
    }

    fn advance(&mut self) -> bool {
        let ok = self.base.advance();
        if ok {
            self.recompute();
        }
        ok
    }

    fn has_data(&self) -> bool {
        self.base.has_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcs_core::pointcloud::{BufferCloud, BufferPoint};

    fn cloud() -> BufferCloud {
        BufferCloud::new(vec![
            BufferPoint::new(0.0, 0.0, 0.0)
                .with_color(0.1, 0.2, 0.3, 1.0)
                .with_attribute("intensity", 100u16)
                .with_attribute("lineNumber", 3i64)
                .with_attribute("gpsTime", 12.5f64),
        ])
    }

    #[test]
    fn no_active_filter_leaves_chain_unwrapped() {
        let mut chain: Box<dyn PointCursor> = Box::new(cloud().cursor());
        AttributeFilter::attach(&mut chain, false, &[], false).unwrap();
        // Still the untouched source: everything is visible.
        assert_eq!(chain.attribute_list().len(), 3);
        assert!(chain.color().is_some());
    }

    #[test]
    fn excluded_attributes_disappear_and_ids_remap() {
        let mut chain: Box<dyn PointCursor> = Box::new(cloud().cursor());
        AttributeFilter::attach(&mut chain, false, &["lineNumber".to_string()], false).unwrap();

        assert_eq!(
            chain.attribute_list(),
            vec!["intensity".to_string(), "gpsTime".to_string()]
        );
        assert_eq!(chain.attribute_by_name("lineNumber"), None);
        // Filtered id 1 maps to upstream id 2.
        assert_eq!(chain.attribute_by_id(1), Some(GenericValue::Float(12.5)));
        assert_eq!(chain.attribute_by_id(2), None);
        assert!(chain.color().is_some());
    }

    #[test]
    fn remove_color_hides_color_only() {
        let mut chain: Box<dyn PointCursor> = Box::new(cloud().cursor());
        AttributeFilter::attach(&mut chain, true, &[], false).unwrap();
        assert!(chain.color().is_none());
        assert_eq!(chain.attribute_list().len(), 3);
    }

    #[test]
    fn remove_all_yields_no_attributes() {
        let mut chain: Box<dyn PointCursor> = Box::new(cloud().cursor());
        AttributeFilter::attach(&mut chain, false, &[], true).unwrap();
        assert!(chain.attribute_list().is_empty());
        assert_eq!(chain.attribute_by_id(0), None);
        assert_eq!(chain.attribute_by_name("intensity"), None);
        // Geometry is untouched.
        assert_eq!(chain.position().x, 0.0);
    }

    #[test]
    fn recomputes_per_point() {
        let cloud = BufferCloud::new(vec![
            BufferPoint::new(0.0, 0.0, 0.0)
                .with_attribute("keep", 1i64)
                .with_attribute("drop", 2i64),
            BufferPoint::new(1.0, 0.0, 0.0).with_attribute("drop", 3i64),
        ]);
        let mut chain: Box<dyn PointCursor> = Box::new(cloud.cursor());
        AttributeFilter::attach(&mut chain, false, &["drop".to_string()], false).unwrap();

        assert_eq!(chain.attribute_list(), vec!["keep".to_string()]);
        assert!(chain.advance());
        assert!(chain.attribute_list().is_empty());
        assert_eq!(chain.attribute_by_id(0), None);
    }
}
