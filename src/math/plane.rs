use std::fmt;

use cgmath::prelude::*;
use cgmath::{Point3, Vector3, Vector4};

/// A 3-dimensional plane formed from the equation: `A*x + B*y + C*z - D = 0`.
///
/// - `n`: the unit normal of the plane, `(A, B, C)`;
/// - `d`: the distance value `D`.
///
/// The `A*x + B*y + C*z - D = 0` form is preferred over `A*x + B*y + C*z + D = 0`,
/// since it avoids superfluous negations.
#[derive(Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub n: Vector3<f32>,
    pub d: f32,
}

impl Plane {
    #[inline]
    pub fn new(n: Vector3<f32>, d: f32) -> Plane {
        Plane { n, d }
    }

    /// Construct a plane from the components of a four-dimensional vector, assuming
    /// the alternative representation: `A*x + B*y + C*z + D = 0`.
    #[inline]
    pub fn from_vector4_alt(v: Vector4<f32>) -> Plane {
        Plane {
            n: Vector3::new(v.x, v.y, v.z),
            d: -v.w,
        }
    }

    /// Constructs a plane that passes through the the three points `a`, `b` and `c`, with
    /// the normal following the counter-clockwise winding of the points.
    pub fn from_points(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Option<Plane> {
        let n = (b - a).cross(c - a);
        if n.magnitude2() <= ::std::f32::EPSILON * ::std::f32::EPSILON {
            None
        } else {
            let n = n.normalize();
            Some(Plane::new(n, a.dot(n)))
        }
    }

    /// Construct a plane that contains the point `p` and is perpendicular to `n`.
    #[inline]
    pub fn from_point_normal(p: Point3<f32>, n: Vector3<f32>) -> Plane {
        Plane { n, d: p.dot(n) }
    }

    pub fn normalize(&self) -> Option<Plane> {
        let len = self.n.magnitude();
        if len <= ::std::f32::EPSILON {
            None
        } else {
            Some(Plane::new(self.n / len, self.d / len))
        }
    }

    /// Signed distance from the plane to a point, positive on the normal side.
    #[inline]
    pub fn distance(&self, p: Point3<f32>) -> f32 {
        p.dot(self.n) - self.d
    }
}

impl fmt::Debug for Plane {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?}x + {:?}y + {:?}z - {:?} = 0",
            self.n.x, self.n.y, self.n.z, self.d
        )
    }
}

/// Spatial relation between two objects.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialOrd, PartialEq)]
#[repr(u8)]
pub enum PlaneRelation {
    /// Completely inside.
    In,
    /// Crosses the boundary.
    Cross,
    /// Completely outside.
    Out,
}

/// Generic 3D bound.
pub trait PlaneBound: fmt::Debug {
    /// Classify the spatial relation with a plane.
    fn relate(&self, plane: Plane) -> PlaneRelation;
}

impl PlaneBound for Point3<f32> {
    fn relate(&self, plane: Plane) -> PlaneRelation {
        let dist = self.dot(plane.n);
        if dist > plane.d {
            PlaneRelation::In
        } else if dist < plane.d {
            PlaneRelation::Out
        } else {
            PlaneRelation::Cross
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_points() {
        let plane = Plane::from_points(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        )
        .unwrap();

        assert_eq!(plane.n, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(plane.d, 1.0);
        assert_eq!(plane.distance(Point3::new(3.0, 4.0, 3.0)), 2.0);

        let degenerated = Plane::from_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        );
        assert!(degenerated.is_none());
    }
}
