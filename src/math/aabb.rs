//! Axis-aligned bounding boxes and bounding spheres.

use std::fmt;

use cgmath::prelude::*;
use cgmath::{Matrix4, Point3, Vector3};

use super::plane::{Plane, PlaneBound, PlaneRelation};

/// A three-dimensional AABB, aka a rectangular prism.
#[derive(Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct Aabb3 {
    /// Minimum point of the AABB
    pub min: Point3<f32>,
    /// Maximum point of the AABB
    pub max: Point3<f32>,
}

impl Aabb3 {
    /// Construct a empty axis-aligned bounding box at origin.
    #[inline]
    pub fn zero() -> Self {
        Aabb3 {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(0.0, 0.0, 0.0),
        }
    }

    /// Construct a new axis-aligned bounding box from two points.
    #[inline]
    pub fn new(p1: Point3<f32>, p2: Point3<f32>) -> Self {
        Aabb3 {
            min: Point3::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.z.min(p2.z)),
            max: Point3::new(p1.x.max(p2.x), p1.y.max(p2.y), p1.z.max(p2.z)),
        }
    }

    /// Construct the tightest box around a set of points. Returns `None` if the
    /// iterator is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Aabb3::new(first, first), |b, p| b.grow(p)))
    }

    /// Compute corners.
    #[inline]
    pub fn to_corners(&self) -> [Point3<f32>; 8] {
        [
            self.min,
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            self.max,
        ]
    }

    /// Return the dimensions of this AABB.
    #[inline]
    pub fn dim(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Return the center point of this AABB.
    #[inline]
    pub fn center(&self) -> Point3<f32> {
        self.min + self.dim() * 0.5
    }

    /// Returns a new AABB that is grown to include the given point.
    #[inline]
    pub fn grow(&self, p: Point3<f32>) -> Self {
        Aabb3 {
            min: Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    /// Returns the smallest AABB containing both.
    #[inline]
    pub fn union(&self, rhs: &Aabb3) -> Self {
        self.grow(rhs.min).grow(rhs.max)
    }

    #[inline]
    pub fn contains(&self, p: Point3<f32>) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }

    /// Apply an arbitrary transform to the corners of this bounding box,
    /// return a new conservative bound.
    pub fn transform(&self, m: &Matrix4<f32>) -> Self {
        let corners = self.to_corners();
        let first = m.transform_point(corners[0]);
        corners[1..]
            .iter()
            .fold(Aabb3::new(first, first), |u, &c| u.grow(m.transform_point(c)))
    }
}

impl fmt::Debug for Aabb3 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:?} - {:?}]", self.min, self.max)
    }
}

impl PlaneBound for Aabb3 {
    fn relate(&self, plane: Plane) -> PlaneRelation {
        let corners = self.to_corners();
        let first = corners[0].relate(plane);
        for p in corners[1..].iter() {
            if p.relate(plane) != first {
                return PlaneRelation::Cross;
            }
        }
        first
    }
}

/// A bounding sphere.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct Sphere {
    pub center: Point3<f32>,
    pub radius: f32,
}

impl Sphere {
    #[inline]
    pub fn new(center: Point3<f32>, radius: f32) -> Self {
        Sphere { center, radius }
    }

    /// The sphere that circumscribes a box.
    pub fn from_aabb(aabb: &Aabb3) -> Self {
        Sphere {
            center: aabb.center(),
            radius: aabb.dim().magnitude() * 0.5,
        }
    }

    /// Transforms the sphere, scaling the radius by the largest axis scale of the matrix.
    pub fn transform(&self, m: &Matrix4<f32>) -> Self {
        let sx = m.x.truncate().magnitude();
        let sy = m.y.truncate().magnitude();
        let sz = m.z.truncate().magnitude();
        Sphere {
            center: m.transform_point(self.center),
            radius: self.radius * sx.max(sy).max(sz),
        }
    }
}

impl PlaneBound for Sphere {
    fn relate(&self, plane: Plane) -> PlaneRelation {
        let dist = self.center.dot(plane.n) - plane.d;
        if dist > self.radius {
            PlaneRelation::In
        } else if dist < -self.radius {
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
        let points = vec![
            Point3::new(1.0, -2.0, 0.5),
            Point3::new(-1.0, 3.0, 0.0),
            Point3::new(0.0, 0.0, -4.0),
        ];

        let aabb = Aabb3::from_points(points).unwrap();
        assert_eq!(aabb.min, Point3::new(-1.0, -2.0, -4.0));
        assert_eq!(aabb.max, Point3::new(1.0, 3.0, 0.5));
        assert!(Aabb3::from_points(Vec::new()).is_none());
    }

    #[test]
    fn relate() {
        let plane = Plane::from_point_normal(Point3::new(0.0, 0.0, 0.0), Vector3::unit_y());
        let above = Aabb3::new(Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 2.0, 1.0));
        let across = Aabb3::new(Point3::new(0.0, -1.0, 0.0), Point3::new(1.0, 2.0, 1.0));
        assert_eq!(above.relate(plane), PlaneRelation::In);
        assert_eq!(across.relate(plane), PlaneRelation::Cross);

        let sphere = Sphere::new(Point3::new(0.0, -3.0, 0.0), 1.0);
        assert_eq!(sphere.relate(plane), PlaneRelation::Out);
    }
}
