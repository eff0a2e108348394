//! Rotations of nodes.
//!
//! Most nodes never rotate, so a rotator starts as `Identity` and holds no data. It is
//! promoted to `Mutable` on the first rotation, and to `Directional` once a forward
//! direction is set. A directional rotator keeps the direction it was given, so reading
//! it back does not drift through the quaternion.

use crate::math::prelude::*;

/// The forward direction of an unrotated node.
pub fn default_forward_direction() -> Vector3<f32> {
    -Vector3::unit_z()
}

/// The up direction of an unrotated node.
pub fn default_up_direction() -> Vector3<f32> {
    Vector3::unit_y()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotator {
    Identity,
    Mutable {
        rotation: Quaternion<f32>,
    },
    Directional {
        rotation: Quaternion<f32>,
        forward: Vector3<f32>,
        reference_up: Vector3<f32>,
    },
}

impl Default for Rotator {
    fn default() -> Self {
        Rotator::Identity
    }
}

impl Rotator {
    #[inline]
    pub fn is_identity(&self) -> bool {
        match *self {
            Rotator::Identity => true,
            _ => false,
        }
    }

    #[inline]
    pub fn is_directional(&self) -> bool {
        match *self {
            Rotator::Directional { .. } => true,
            _ => false,
        }
    }

    /// The rotation as a unit quaternion.
    pub fn quaternion(&self) -> Quaternion<f32> {
        match *self {
            Rotator::Identity => Quaternion::one(),
            Rotator::Mutable { rotation } => rotation,
            Rotator::Directional { rotation, .. } => rotation,
        }
    }

    pub fn set_quaternion(&mut self, q: Quaternion<f32>) {
        *self = Rotator::Mutable {
            rotation: q.normalize(),
        };
    }

    /// The rotation as Euler angles in degrees.
    pub fn rotation(&self) -> Euler<Deg<f32>> {
        let e = Euler::from(self.quaternion());
        Euler::new(e.x.into(), e.y.into(), e.z.into())
    }

    pub fn set_rotation(&mut self, euler: Euler<Deg<f32>>) {
        self.set_quaternion(Quaternion::from(euler));
    }

    /// The rotation as an axis and an angle. The axis of the identity is +Y.
    pub fn rotation_axis_angle(&self) -> (Vector3<f32>, Deg<f32>) {
        let q = self.quaternion();
        let sin = q.v.magnitude();
        if sin <= ::std::f32::EPSILON {
            return (Vector3::unit_y(), Deg(0.0));
        }

        let angle = Rad(2.0 * sin.atan2(q.s));
        (q.v / sin, angle.into())
    }

    pub fn set_rotation_axis_angle(&mut self, axis: Vector3<f32>, angle: Deg<f32>) {
        if axis.magnitude2() <= ::std::f32::EPSILON {
            return;
        }

        self.set_quaternion(Quaternion::from_axis_angle(axis.normalize(), angle));
    }

    /// Rotates further by `q`, applied after the current rotation.
    pub fn rotate_by(&mut self, q: Quaternion<f32>) {
        let rotation = q * self.quaternion();
        self.set_quaternion(rotation);
    }

    pub fn forward_direction(&self) -> Vector3<f32> {
        match *self {
            Rotator::Directional { forward, .. } => forward,
            _ => self.quaternion().rotate_vector(default_forward_direction()),
        }
    }

    /// Points the forward direction along `forward`, keeping the up direction as close
    /// to the reference up direction as possible.
    pub fn set_forward_direction(&mut self, forward: Vector3<f32>) {
        let up = match *self {
            Rotator::Directional { reference_up, .. } => reference_up,
            _ => default_up_direction(),
        };

        self.set_forward_and_up(forward, up);
    }

    pub fn set_forward_and_up(&mut self, forward: Vector3<f32>, up: Vector3<f32>) {
        if forward.magnitude2() <= ::std::f32::EPSILON {
            return;
        }

        let f = forward.normalize();
        *self = Rotator::Directional {
            rotation: look_rotation(f, up),
            forward: f,
            reference_up: up,
        };
    }

    pub fn reference_up_direction(&self) -> Vector3<f32> {
        match *self {
            Rotator::Directional { reference_up, .. } => reference_up,
            _ => default_up_direction(),
        }
    }

    pub fn up_direction(&self) -> Vector3<f32> {
        self.quaternion().rotate_vector(default_up_direction())
    }

    pub fn right_direction(&self) -> Vector3<f32> {
        self.quaternion().rotate_vector(Vector3::unit_x())
    }

    pub fn to_matrix(&self) -> Matrix3<f32> {
        match *self {
            Rotator::Identity => Matrix3::identity(),
            _ => Matrix3::from(self.quaternion()),
        }
    }
}

/// The rotation that turns -Z onto `forward` and +Y towards `up`. If both are
/// parallel, another up direction is picked.
pub fn look_rotation(forward: Vector3<f32>, up: Vector3<f32>) -> Quaternion<f32> {
    let f = forward.normalize();
    let mut right = f.cross(up);
    if right.magnitude2() <= 1e-10 {
        let alt = if f.y.abs() < 0.9 {
            Vector3::unit_y()
        } else {
            Vector3::unit_z()
        };
        right = f.cross(alt);
    }

    let r = right.normalize();
    let u = r.cross(f);
    Quaternion::from(Matrix3::from_cols(r, u, -f)).normalize()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn promotion() {
        let mut rotator = Rotator::default();
        assert!(rotator.is_identity());
        assert_eq!(rotator.forward_direction(), -Vector3::unit_z());

        rotator.set_rotation_axis_angle(Vector3::unit_y(), Deg(90.0));
        assert!(!rotator.is_identity());
        assert!(!rotator.is_directional());
        assert_ulps_eq!(rotator.forward_direction(), -Vector3::unit_x(), epsilon = 1e-6);

        let (axis, angle) = rotator.rotation_axis_angle();
        assert_ulps_eq!(axis, Vector3::unit_y(), epsilon = 1e-6);
        assert_ulps_eq!(angle.0, 90.0, epsilon = 1e-4);

        rotator.set_forward_direction(Vector3::new(0.0, 0.0, 2.0));
        assert!(rotator.is_directional());
        assert_eq!(rotator.forward_direction(), Vector3::unit_z());
        assert_ulps_eq!(
            rotator.quaternion().rotate_vector(-Vector3::unit_z()),
            Vector3::unit_z(),
            epsilon = 1e-6
        );
        assert_ulps_eq!(rotator.up_direction(), Vector3::unit_y(), epsilon = 1e-6);
    }

    #[test]
    fn euler_views_agree() {
        let mut rotator = Rotator::default();
        rotator.set_rotation(Euler::new(Deg(0.0), Deg(0.0), Deg(90.0)));
        assert_ulps_eq!(
            rotator.to_matrix() * Vector3::unit_x(),
            Vector3::unit_y(),
            epsilon = 1e-6
        );

        let e = rotator.rotation();
        assert_ulps_eq!(e.z.0, 90.0, epsilon = 1e-4);
    }

    #[test]
    fn straight_up() {
        let q = look_rotation(Vector3::unit_y(), Vector3::unit_y());
        assert_ulps_eq!(q.rotate_vector(-Vector3::unit_z()), Vector3::unit_y(), epsilon = 1e-6);
    }
}
