use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use pcs_core::pointcloud::{GenericValue, PointCursor, PtColor, PtGeometry};

use crate::error::SetupError;
use crate::passthrough::{take_chain, PassThrough};

/// Keeps only the points inside an oriented bounding box.
///
/// The box is given textually as `x0,y0,z0,dx,dy,dz,rx,ry,rz`: origin,
/// half-extents (sign ignored) and an axis-angle rotation around the
/// origin. Each candidate point is mapped into box-local coordinates with
/// the inverse rigid-body transform and tested against the half-extents,
/// inclusively. One affine map and a box test per point; the single-pass
/// streaming model needs no spatial index.
pub struct RoiSelector {
    base: PassThrough,
    world_to_box: Isometry3<f64>,
    extents: [f64; 3],
}

impl RoiSelector {
    pub fn attach(chain: &mut Box<dyn PointCursor>, definition: &str) -> Result<(), SetupError> {
        let mut numbers = [0.0f64; 9];
        let mut tokens = definition.split(',');
        for slot in numbers.iter_mut() {
            let token = tokens
                .next()
                .ok_or_else(|| SetupError::InvalidRoi(definition.to_string()))?;
            *slot = token
                .trim()
                .parse()
                .map_err(|_| SetupError::InvalidRoi(definition.to_string()))?;
        }

        let [x, y, z, dx, dy, dz, rx, ry, rz] = numbers;

        let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(rx, ry, rz));
        let box_to_world = Isometry3::from_parts(Translation3::new(x, y, z), rotation);

        let mut stage = RoiSelector {
            base: PassThrough::new(take_chain(chain)),
            world_to_box: box_to_world.inverse(),
            extents: [dx.abs(), dy.abs(), dz.abs()],
        };

        if !stage.current_inside() {
            stage.advance();
        }

        *chain = Box::new(stage);
        Ok(())
    }

    fn current_inside(&self) -> bool {
        if !self.base.has_data() {
            return false;
        }

        let p = self.base.position();
        let local = self.world_to_box.transform_point(&Point3::new(p.x, p.y, p.z));

        local.x.abs() <= self.extents[0]
            && local.y.abs() <= self.extents[1]
            && local.z.abs() <= self.extents[2]
    }
}

impl PointCursor for RoiSelector {
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
        loop {
            if !self.base.advance() {
                return false;
            }
            if self.current_inside() {
                return true;
            }
        }
    }

    fn has_data(&self) -> bool {
        self.base.has_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcs_core::pointcloud::{BufferCloud, BufferPoint};

    fn collect_xs(chain: &mut Box<dyn PointCursor>) -> Vec<f64> {
        let mut xs = Vec::new();
        if chain.has_data() {
            xs.push(chain.position().x);
            while chain.advance() {
                xs.push(chain.position().x);
            }
        }
        xs
    }

    #[test]
    fn unit_box_at_origin_keeps_inside_rejects_outside() {
        let cloud = BufferCloud::new(vec![
            BufferPoint::new(0.0, 0.0, 0.0),
            BufferPoint::new(2.0, 0.0, 0.0),
            BufferPoint::new(1.0, 1.0, 1.0),
        ]);
        let mut chain: Box<dyn PointCursor> = Box::new(cloud.cursor());
        RoiSelector::attach(&mut chain, "0,0,0,1,1,1,0,0,0").unwrap();
        // Boundary is inclusive, so (1,1,1) stays.
        assert_eq!(collect_xs(&mut chain), vec![0.0, 1.0]);
    }

    #[test]
    fn negative_half_extents_are_absolute() {
        let cloud = BufferCloud::new(vec![BufferPoint::new(0.5, 0.0, 0.0)]);
        let mut chain: Box<dyn PointCursor> = Box::new(cloud.cursor());
        RoiSelector::attach(&mut chain, "0,0,0,-1,-1,-1,0,0,0").unwrap();
        assert_eq!(collect_xs(&mut chain), vec![0.5]);
    }

    #[test]
    fn rotation_orients_the_box() {
        // Box of half-extents (2, 0.1, 0.1) rotated 90 degrees around z:
        // it now spans the y axis.
        let definition = format!("0,0,0,2,0.1,0.1,0,0,{}", std::f64::consts::FRAC_PI_2);
        let cloud = BufferCloud::new(vec![
            BufferPoint::new(0.0, 1.5, 0.0),
            BufferPoint::new(1.5, 0.0, 0.0),
        ]);
        let mut chain: Box<dyn PointCursor> = Box::new(cloud.cursor());
        RoiSelector::attach(&mut chain, &definition).unwrap();
        let kept = collect_xs(&mut chain);
        assert_eq!(kept, vec![0.0]);
    }

    #[test]
    fn translated_box_follows_its_origin() {
        let cloud = BufferCloud::new(vec![
            BufferPoint::new(10.0, 10.0, 10.0),
            BufferPoint::new(0.0, 0.0, 0.0),
        ]);
        let mut chain: Box<dyn PointCursor> = Box::new(cloud.cursor());
        RoiSelector::attach(&mut chain, "10,10,10,1,1,1,0,0,0").unwrap();
        assert_eq!(collect_xs(&mut chain), vec![10.0]);
    }

    #[test]
    fn malformed_or_short_definitions_fail_setup() {
        let cloud = BufferCloud::new(vec![BufferPoint::new(0.0, 0.0, 0.0)]);
        let mut chain: Box<dyn PointCursor> = Box::new(cloud.cursor());

        let err = RoiSelector::attach(&mut chain, "0,0,0,1,1,1");
        assert!(matches!(err, Err(SetupError::InvalidRoi(_))));

        let err = RoiSelector::attach(&mut chain, "0,0,zero,1,1,1,0,0,0");
        assert!(matches!(err, Err(SetupError::InvalidRoi(_))));

        // Chain untouched after the failures.
        assert!(chain.has_data());
    }
}
