use cgmath::prelude::*;
use cgmath::{Point3, Vector3};

use super::plane::Plane;

/// A triangular face, with vertices in counter-clockwise winding order.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub vertices: [Point3<f32>; 3],
}

/// The vertex indices of a triangular face.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceIndices(pub [u32; 3]);

impl Face {
    #[inline]
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        Face {
            vertices: [a, b, c],
        }
    }

    /// Returns the centroid of the face.
    #[inline]
    pub fn center(&self) -> Point3<f32> {
        Point3::centroid(&self.vertices)
    }

    /// Returns the unit normal of the face, or zero for degenerated faces.
    pub fn normal(&self) -> Vector3<f32> {
        let [a, b, c] = self.vertices;
        let n = (b - a).cross(c - a);
        if n.magnitude2() > 0.0 {
            n.normalize()
        } else {
            Vector3::zero()
        }
    }

    /// Returns the plane the face lies in.
    pub fn plane(&self) -> Plane {
        Plane::from_point_normal(self.vertices[0], self.normal())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic() {
        let face = Face::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        );

        assert_eq!(face.center(), Point3::new(1.0, 1.0, 0.0));
        assert_eq!(face.normal(), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(face.plane().d, 0.0);
    }
}
