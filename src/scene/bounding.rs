//! Bounding volumes used to cull nodes against the camera frustum.

use crate::math::prelude::*;

/// A bounding volume in the local space of its node.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundingVolume {
    /// The node is never culled.
    None,
    Box(Aabb3),
    Sphere(Sphere),
    /// A flat rectangle in the local X-Y plane, for billboards and labels.
    Area { origin: Point2<f32>, size: Vector2<f32> },
    /// A node is culled if any part is outside the frustum.
    Composite(Vec<BoundingVolume>),
}

impl Default for BoundingVolume {
    fn default() -> Self {
        BoundingVolume::None
    }
}

impl BoundingVolume {
    /// A box and a sphere around `aabb`. The sphere rejects quickly and the box
    /// tightly.
    pub fn sphere_and_box(aabb: Aabb3) -> Self {
        BoundingVolume::Composite(vec![
            BoundingVolume::Sphere(Sphere::from_aabb(&aabb)),
            BoundingVolume::Box(aabb),
        ])
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        *self == BoundingVolume::None
    }

    /// The box around the volume in local space, if it has any extent.
    pub fn aabb(&self) -> Option<Aabb3> {
        match *self {
            BoundingVolume::None => None,
            BoundingVolume::Box(v) => Some(v),
            BoundingVolume::Sphere(v) => {
                let r = Vector3::new(v.radius, v.radius, v.radius);
                Some(Aabb3::new(v.center - r, v.center + r))
            }
            BoundingVolume::Area { origin, size } => Some(Aabb3::new(
                Point3::new(origin.x, origin.y, 0.0),
                Point3::new(origin.x + size.x, origin.y + size.y, 0.0),
            )),
            BoundingVolume::Composite(ref v) => v
                .iter()
                .filter_map(|v| v.aabb())
                .fold(None, |acc: Option<Aabb3>, b| match acc {
                    Some(a) => Some(a.union(&b)),
                    None => Some(b),
                }),
        }
    }

    /// Classifies the volume, transformed by `m`, against `frustum`.
    pub fn classify(&self, m: &Matrix4<f32>, frustum: &Frustum) -> PlaneRelation {
        match *self {
            BoundingVolume::None => PlaneRelation::In,
            BoundingVolume::Box(v) => frustum.contains(&v.transform(m)),
            BoundingVolume::Sphere(v) => frustum.contains(&v.transform(m)),
            BoundingVolume::Area { .. } => match self.aabb() {
                Some(v) => frustum.contains(&v.transform(m)),
                None => PlaneRelation::In,
            },
            BoundingVolume::Composite(ref v) => {
                let mut relation = PlaneRelation::In;
                for b in v {
                    match b.classify(m, frustum) {
                        PlaneRelation::Out => return PlaneRelation::Out,
                        PlaneRelation::Cross => relation = PlaneRelation::Cross,
                        PlaneRelation::In => {}
                    }
                }
                relation
            }
        }
    }

    #[inline]
    pub fn does_intersect_frustum(&self, m: &Matrix4<f32>, frustum: &Frustum) -> bool {
        self.classify(m, frustum) != PlaneRelation::Out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn frustum() -> Frustum {
        let projection = Projection::perspective(Deg(90.0).into(), 1.0, 0.1, 100.0);
        Frustum::from_matrix(&projection.to_matrix())
    }

    #[test]
    fn classify() {
        let unit = Aabb3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let volume = BoundingVolume::sphere_and_box(unit);
        let f = frustum();

        let ahead = Matrix4::from_translation(Vector3::new(0.0, 0.0, -10.0));
        assert_eq!(volume.classify(&ahead, &f), PlaneRelation::In);

        let behind = Matrix4::from_translation(Vector3::new(0.0, 0.0, 10.0));
        assert_eq!(volume.classify(&behind, &f), PlaneRelation::Out);
        assert!(!volume.does_intersect_frustum(&behind, &f));

        assert_eq!(BoundingVolume::None.classify(&behind, &f), PlaneRelation::In);
        assert_eq!(volume.aabb(), Some(Aabb3::new(
            Point3::new(-3f32.sqrt(), -3f32.sqrt(), -3f32.sqrt()),
            Point3::new(3f32.sqrt(), 3f32.sqrt(), 3f32.sqrt()),
        )));
    }

    #[test]
    fn area() {
        let area = BoundingVolume::Area {
            origin: Point2::new(-1.0, -1.0),
            size: Vector2::new(2.0, 2.0),
        };

        let ahead = Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0));
        assert!(area.does_intersect_frustum(&ahead, &frustum()));
    }
}
