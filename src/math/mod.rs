//! This module contains the math utils that mainly comes from `cgmath`, plus
//! bounds, planes and colors used by the renderer.

pub use cgmath::*;

pub mod aabb;
pub mod color;
pub mod face;
pub mod frustum;
pub mod plane;
pub mod rect;

pub mod prelude {
    pub use cgmath::prelude::*;
    pub use cgmath::{
        Deg, Euler, Matrix3, Matrix4, Point2, Point3, Quaternion, Rad, Vector2, Vector3,
        Vector4,
    };

    pub use super::aabb::{Aabb3, Sphere};
    pub use super::color::{Color4B, Color4F};
    pub use super::face::{Face, FaceIndices};
    pub use super::frustum::{Frustum, Projection};
    pub use super::plane::{Plane, PlaneBound, PlaneRelation};
    pub use super::rect::{IntSize, TexRect, Viewport};
}

/// Returns true if `v` is a power of two. Zero is not.
#[inline]
pub fn is_pot(v: u32) -> bool {
    v != 0 && (v & (v - 1)) == 0
}

/// Returns the smallest power of two that is not less than `v`.
#[inline]
pub fn next_pot(v: u32) -> u32 {
    v.max(1).next_power_of_two()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pot() {
        assert!(is_pot(1));
        assert!(is_pot(256));
        assert!(!is_pot(0));
        assert!(!is_pot(100));
        assert_eq!(next_pot(100), 128);
        assert_eq!(next_pot(128), 128);
        assert_eq!(next_pot(0), 1);
    }
}
