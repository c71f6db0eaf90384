use pcs_core::pointcloud::{GenericValue, PointCursor, PtColor, PtGeometry};

use crate::error::SetupError;
use crate::passthrough::{take_chain, PassThrough};

/// Caps the number of emitted points and/or subsamples at a fixed stride.
///
/// The cap counts emissions, construction-time current point included: a
/// limit of 3 with stride 1 exposes exactly the first three upstream
/// points. Once the cap is reached every further advance fails,
/// permanently. A stride of `n` advances the upstream `n` times per
/// emitted point, which yields uniform subsampling at a fixed interval.
pub struct PointLimit {
    base: PassThrough,
    count: u64,
    limit: u64,
    step: u64,
}

impl PointLimit {
    pub fn attach(
        chain: &mut Box<dyn PointCursor>,
        limit: u64,
        step: u64,
    ) -> Result<(), SetupError> {
        if step == 0 {
            return Err(SetupError::ZeroStride);
        }

        let base = PassThrough::new(take_chain(chain));
        let count = if base.has_data() { 1 } else { 0 };
        *chain = Box::new(PointLimit {
            base,
            count,
            limit,
            step,
        });
        Ok(())
    }
}

impl PointCursor for PointLimit {
    fn position(&self) -> PtGeometry<f64> {
        self.base.position()
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
        if self.count >= self.limit {
            return false;
        }

        for _ in 0..self.step {
            if !self.base.advance() {
                return false;
            }
        }

        self.count += 1;
        true
    }

    fn has_data(&self) -> bool {
        self.limit > 0 && self.base.has_data()
    }
}
