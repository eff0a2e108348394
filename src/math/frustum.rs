//! View frustum for visibility determination.

use cgmath::prelude::*;
use cgmath::{Matrix4, Rad};

use super::plane::{Plane, PlaneBound, PlaneRelation};

/// Projections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Orthographic projection.
    Ortho {
        width: f32,
        height: f32,
        near: f32,
        far: f32,
    },

    /// Perspective projection.
    Perspective {
        /// Field of view in vertical.
        fovy: Rad<f32>,
        /// The aspect of width / height.
        aspect: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn ortho(width: f32, height: f32, near: f32, far: f32) -> Self {
        Projection::Ortho {
            width,
            height,
            near,
            far,
        }
    }

    pub fn perspective(fovy: Rad<f32>, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fovy,
            aspect,
            near,
            far,
        }
    }

    pub fn validate(&self) {
        match *self {
            Projection::Perspective {
                fovy,
                aspect,
                near,
                far,
            } => {
                assert!(
                    fovy > Rad(0.0) && fovy < Rad::turn_div_2(),
                    "The vertical field of view must be within a half turn, found: {:?}",
                    fovy
                );

                assert!(aspect > 0.0, "The aspect ratio must be positive, found: {}", aspect);

                assert!(
                    near > 0.0 && far > near,
                    "The clip planes must satisfy 0 < near < far, found: near: {}, far: {}",
                    near,
                    far
                );
            }
            Projection::Ortho {
                width,
                height,
                near,
                far,
            } => {
                assert!(
                    width > 0.0 && height > 0.0,
                    "The orthographic window must be positive, found: {}x{}",
                    width,
                    height
                );

                assert!(
                    far > near,
                    "The far plane cannot be closer than the near plane, found: far: {}, near: {}",
                    far,
                    near
                );
            }
        }
    }

    /// Gets the right-handed projection matrix, mapping depth into the GL clip range.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        match *self {
            Projection::Ortho {
                width,
                height,
                near,
                far,
            } => {
                let (hw, hh) = (width * 0.5, height * 0.5);
                ::cgmath::ortho(-hw, hw, -hh, hh, near, far)
            }
            Projection::Perspective {
                fovy,
                aspect,
                near,
                far,
            } => ::cgmath::perspective(fovy, aspect, near, far),
        }
    }
}

/// View frustum, used for frustum culling.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    pub left: Plane,
    pub right: Plane,
    pub bottom: Plane,
    pub top: Plane,
    pub near: Plane,
    pub far: Plane,
}

impl Frustum {
    /// Extracts the six planes of a combined view-projection matrix. Plane normals
    /// point into the frustum.
    pub fn from_matrix(m: &Matrix4<f32>) -> Frustum {
        let plane = |v| {
            let p = Plane::from_vector4_alt(v);
            p.normalize().unwrap_or(p)
        };

        Frustum {
            left: plane(m.row(3) + m.row(0)),
            right: plane(m.row(3) - m.row(0)),
            bottom: plane(m.row(3) + m.row(1)),
            top: plane(m.row(3) - m.row(1)),
            near: plane(m.row(3) + m.row(2)),
            far: plane(m.row(3) - m.row(2)),
        }
    }

    /// Find the spatial relation of a bound inside this frustum.
    pub fn contains<B: PlaneBound>(&self, bound: &B) -> PlaneRelation {
        [
            self.left,
            self.right,
            self.top,
            self.bottom,
            self.near,
            self.far,
        ]
        .iter()
        .fold(PlaneRelation::In, |cur, p| {
            // Any `Out` wins over `Cross`, which wins over `In`.
            ::std::cmp::max(cur, bound.relate(*p))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::aabb::{Aabb3, Sphere};
    use cgmath::{Deg, Point3};

    #[test]
    fn perspective_culling() {
        let projection = Projection::perspective(Deg(90.0).into(), 1.0, 0.1, 100.0);
        projection.validate();

        let frustum = Frustum::from_matrix(&projection.to_matrix());

        let ahead = Sphere::new(Point3::new(0.0, 0.0, -10.0), 1.0);
        assert_eq!(frustum.contains(&ahead), PlaneRelation::In);

        let behind = Sphere::new(Point3::new(0.0, 0.0, 10.0), 1.0);
        assert_eq!(frustum.contains(&behind), PlaneRelation::Out);

        let across = Aabb3::new(Point3::new(-1.0, -1.0, -50.0), Point3::new(1.0, 1.0, -150.0));
        assert_eq!(frustum.contains(&across), PlaneRelation::Cross);
    }
}
