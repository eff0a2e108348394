use crate::math::prelude::*;
use crate::scene::node::NodeHandle;

/// A node of a skeleton. Bones draw nothing themselves; the skin sections that refer to
/// them are deformed as they move away from their rest pose.
#[derive(Debug, Clone, Default)]
pub struct Bone {
    rest_pose_inverse: Option<Matrix4<f32>>,
}

impl Bone {
    pub fn new() -> Self {
        Bone::default()
    }

    /// The inverse of the transform of this bone relative to its soft body, recorded
    /// when the rest pose was bound.
    #[inline]
    pub fn rest_pose_inverse(&self) -> Option<Matrix4<f32>> {
        self.rest_pose_inverse
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.rest_pose_inverse.is_some()
    }

    /// Records the rest pose from the current transform relative to the soft body.
    pub(crate) fn bind_rest_pose(&mut self, relative_to_soft_body: &Matrix4<f32>) {
        self.rest_pose_inverse = match relative_to_soft_body.invert() {
            Some(v) => Some(v),
            None => {
                warn!("The rest pose of a bone is not invertible, and is bound as identity.");
                Some(Matrix4::identity())
            }
        };
    }

    /// Applies the deviation of this bone from its rest pose to `transform`, the
    /// current transform of the bone. Unbound bones leave it as is.
    pub fn apply_pose_to(&self, transform: &Matrix4<f32>) -> Matrix4<f32> {
        match self.rest_pose_inverse {
            Some(ref inv) => transform * inv,
            None => *transform,
        }
    }
}

/// The combined transforms of one bone acting on one skin mesh node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinnedBone {
    pub(crate) bone: NodeHandle,
    pub(crate) stamp: u64,
    pub(crate) draw_transform: Matrix4<f32>,
    pub(crate) skin_transform: Matrix4<f32>,
}

impl SkinnedBone {
    /// Combines the global transform of the bone, its rest pose and the rest pose of the
    /// skin node. `skin_global` is the global transform of the skin node.
    pub(crate) fn new(
        bone: NodeHandle,
        stamp: u64,
        posed: Matrix4<f32>,
        skin_rest_pose: &Matrix4<f32>,
        skin_global: &Matrix4<f32>,
    ) -> Self {
        let draw_transform = posed * skin_rest_pose;
        let skin_transform = match skin_global.invert() {
            Some(inv) => inv * draw_transform,
            None => draw_transform,
        };

        SkinnedBone {
            bone,
            stamp,
            draw_transform,
            skin_transform,
        }
    }

    #[inline]
    pub fn bone(&self) -> NodeHandle {
        self.bone
    }

    /// The transform of the vertices in world space. The palette matrix of the bone is
    /// the view matrix times this.
    #[inline]
    pub fn draw_transform(&self) -> Matrix4<f32> {
        self.draw_transform
    }

    /// The transform that deforms a vertex into the local space of the skin node.
    #[inline]
    pub fn skin_transform(&self) -> Matrix4<f32> {
        self.skin_transform
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn apply_pose() {
        let rest = Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0));
        let mut bone = Bone::new();
        assert!(!bone.is_bound());
        assert_eq!(bone.apply_pose_to(&rest), rest);

        bone.bind_rest_pose(&rest);
        assert_ulps_eq!(bone.apply_pose_to(&rest), Matrix4::identity(), epsilon = 1e-6);

        let moved = Matrix4::from_translation(Vector3::new(1.0, 2.0, 0.0));
        let p = bone.apply_pose_to(&moved).transform_point(Point3::new(0.0, 0.0, 0.0));
        assert_ulps_eq!(p, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }
}
