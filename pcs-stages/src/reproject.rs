use pcs_core::pointcloud::{GenericValue, PointCursor, PtColor, PtGeometry};
use proj_sys_reproject::Reprojector;

use crate::error::SetupError;
use crate::passthrough::{take_chain, PassThrough};

/// Recomputes geometry under a different coordinate reference system, one
/// point at a time. Color and attributes pass through unchanged.
///
/// The PROJ context and transform are acquired at setup; a failure there is
/// a setup failure, never a streaming one. The transformed geometry is
/// recomputed eagerly at construction and after every successful advance,
/// so reads between advances are cheap. The PROJ resources are released
/// exactly once when the stage is dropped.
pub struct CrsConversion {
    base: PassThrough,
    reprojector: Reprojector,
    current: PtGeometry<f64>,
}

impl CrsConversion {
    /// Wrap the chain head in a reprojection stage.
    ///
    /// Textually equal CRS identifiers elide the stage entirely: the chain
    /// is left unchanged and geometry stays bit-for-bit identical.
    pub fn attach(
        chain: &mut Box<dyn PointCursor>,
        in_crs: &str,
        out_crs: &str,
    ) -> Result<(), SetupError> {
        if in_crs == out_crs {
            return Ok(());
        }

        let reprojector = Reprojector::new(in_crs, out_crs)?;

        let mut stage = CrsConversion {
            base: PassThrough::new(take_chain(chain)),
            reprojector,
            current: PtGeometry::default(),
        };
        stage.recompute();

        *chain = Box::new(stage);
        Ok(())
    }

    fn recompute(&mut self) {
        let mut p = self.base.position();
        if let Err(e) = self
            .reprojector
            .transform_in_place(&mut p.x, &mut p.y, &mut p.z)
        {
            log::warn!("reprojection failed for the current point: {}", e);
        }
        self.current = p;
    }
}

impl PointCursor for CrsConversion {
    fn position(&self) -> PtGeometry<f64> {
        self.current
    }

    fn color(&self) -> Option<PtColor<f64>> {
        self.base.color()
    }

    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        self.base.attribute_by_id(id)
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        self.base.attribute_by_name(name)
    }

    fn attribute_list(&self) -> Vec<String> {
        self.base.attribute_list()
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
