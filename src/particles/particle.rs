use std::ops::Range;

use crate::identity::Shared;
use crate::math::color::{byte_from_float, float_from_byte};
use crate::math::prelude::*;
use crate::mesh::mesh::Mesh;
use crate::scene::rotator::Rotator;

/// A small mesh copied into the combined vertex storage of an emitter, with its own
/// location, rotation and scale applied on the CPU.
///
/// A particle owns a range of vertices, and of vertex indices if the emitter is
/// indexed. The range stays with the slot of the particle once allocated, and is
/// handed to the next particle emitted into that slot.
#[derive(Debug, Clone)]
pub struct MeshParticle {
    pub(crate) template: Option<Shared<Mesh>>,
    pub(crate) location: Vector3<f32>,
    pub(crate) rotator: Rotator,
    pub(crate) scale: Option<Vector3<f32>>,
    pub(crate) color: Color4F,

    pub(crate) slot: usize,
    pub(crate) has_color: bool,
    pub(crate) first_vertex_offset: usize,
    pub(crate) vertex_count: usize,
    pub(crate) vertex_capacity: usize,
    pub(crate) first_vertex_index_offset: usize,
    pub(crate) vertex_index_count: usize,
    pub(crate) vertex_index_capacity: usize,

    pub(crate) is_alive: bool,
    pub(crate) is_transform_dirty: bool,
    pub(crate) is_color_dirty: bool,

    /// The total life of the particle in seconds.
    pub lifetime: f32,
    /// The remaining life in seconds. The particle lives forever if `None`.
    pub time_to_live: Option<f32>,
    pub velocity: Vector3<f32>,
}

impl Default for MeshParticle {
    fn default() -> Self {
        MeshParticle {
            template: None,
            location: Vector3::zero(),
            rotator: Rotator::Identity,
            scale: None,
            color: Color4F::white(),

            slot: 0,
            has_color: false,
            first_vertex_offset: 0,
            vertex_count: 0,
            vertex_capacity: 0,
            first_vertex_index_offset: 0,
            vertex_index_count: 0,
            vertex_index_capacity: 0,

            is_alive: false,
            is_transform_dirty: true,
            is_color_dirty: false,

            lifetime: 0.0,
            time_to_live: None,
            velocity: Vector3::zero(),
        }
    }
}

impl MeshParticle {
    pub fn new() -> Self {
        MeshParticle::default()
    }

    /// A particle built from `template` instead of the template of the emitter.
    pub fn with_template(template: Shared<Mesh>) -> Self {
        MeshParticle {
            template: Some(template),
            ..MeshParticle::default()
        }
    }

    #[inline]
    pub fn template(&self) -> Option<&Shared<Mesh>> {
        self.template.as_ref()
    }

    pub(crate) fn set_template(&mut self, template: Option<Shared<Mesh>>) {
        self.template = template;
        self.is_transform_dirty = true;
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    /// Kills the particle. The emitter retires it on its next update.
    pub fn kill(&mut self) {
        self.is_alive = false;
    }

    /// Counts down the remaining life, and kills the particle once it runs out.
    pub fn age(&mut self, dt: f32) {
        if let Some(ttl) = self.time_to_live {
            let ttl = ttl - dt;
            self.time_to_live = Some(ttl);
            if ttl <= 0.0 {
                self.is_alive = false;
            }
        }
    }

    /// The fraction of the lifetime that has passed, in the range 0 to 1.
    pub fn age_fraction(&self) -> f32 {
        match self.time_to_live {
            Some(ttl) if self.lifetime > 0.0 => (1.0 - ttl / self.lifetime).max(0.0).min(1.0),
            _ => 0.0,
        }
    }

    /// The slot of the particle in its emitter.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn first_vertex_offset(&self) -> usize {
        self.first_vertex_offset
    }

    #[inline]
    pub fn first_vertex_index_offset(&self) -> usize {
        self.first_vertex_index_offset
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn vertex_index_count(&self) -> usize {
        self.vertex_index_count
    }

    /// The vertices of the combined mesh drawn for this particle.
    #[inline]
    pub fn vertex_range(&self) -> Range<usize> {
        self.first_vertex_offset..self.first_vertex_offset + self.vertex_count
    }

    /// The vertex indices of the combined mesh drawn for this particle. Empty if the
    /// emitter is not indexed.
    #[inline]
    pub fn vertex_index_range(&self) -> Range<usize> {
        self.first_vertex_index_offset..self.first_vertex_index_offset + self.vertex_index_count
    }

    // Transform.

    #[inline]
    pub fn location(&self) -> Vector3<f32> {
        self.location
    }

    pub fn set_location(&mut self, location: Vector3<f32>) {
        self.location = location;
        self.is_transform_dirty = true;
    }

    pub fn translate_by(&mut self, v: Vector3<f32>) {
        let location = self.location + v;
        self.set_location(location);
    }

    #[inline]
    pub fn rotator(&self) -> &Rotator {
        &self.rotator
    }

    pub fn rotation(&self) -> Euler<Deg<f32>> {
        self.rotator.rotation()
    }

    pub fn set_rotation(&mut self, euler: Euler<Deg<f32>>) {
        self.rotator.set_rotation(euler);
        self.is_transform_dirty = true;
    }

    pub fn quaternion(&self) -> Quaternion<f32> {
        self.rotator.quaternion()
    }

    pub fn set_quaternion(&mut self, q: Quaternion<f32>) {
        self.rotator.set_quaternion(q);
        self.is_transform_dirty = true;
    }

    pub fn rotate_by(&mut self, q: Quaternion<f32>) {
        self.rotator.rotate_by(q);
        self.is_transform_dirty = true;
    }

    pub fn rotation_axis_angle(&self) -> (Vector3<f32>, Deg<f32>) {
        self.rotator.rotation_axis_angle()
    }

    pub fn set_rotation_axis_angle(&mut self, axis: Vector3<f32>, angle: Deg<f32>) {
        self.rotator.set_rotation_axis_angle(axis, angle);
        self.is_transform_dirty = true;
    }

    pub fn rotate_by_angle(&mut self, axis: Vector3<f32>, angle: Deg<f32>) {
        if axis.magnitude2() > ::std::f32::EPSILON {
            self.rotate_by(Quaternion::from_axis_angle(axis.normalize(), angle));
        }
    }

    pub fn forward_direction(&self) -> Vector3<f32> {
        self.rotator.forward_direction()
    }

    pub fn set_forward_direction(&mut self, forward: Vector3<f32>) {
        self.rotator.set_forward_direction(forward);
        self.is_transform_dirty = true;
    }

    pub fn up_direction(&self) -> Vector3<f32> {
        self.rotator.up_direction()
    }

    pub fn right_direction(&self) -> Vector3<f32> {
        self.rotator.right_direction()
    }

    /// The scale along each axis. Particles that were never scaled report one.
    pub fn scale(&self) -> Vector3<f32> {
        self.scale.unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0))
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = Some(scale);
        self.is_transform_dirty = true;
    }

    /// The average of the three scale components.
    pub fn uniform_scale(&self) -> f32 {
        let s = self.scale();
        (s.x + s.y + s.z) / 3.0
    }

    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.set_scale(Vector3::new(scale, scale, scale));
    }

    pub fn is_uniformly_scaled(&self) -> bool {
        let s = self.scale();
        (s.x - s.y).abs() < 1e-6 && (s.x - s.z).abs() < 1e-6
    }

    /// Whether the transform preserves lengths and angles, so normals can be rotated
    /// without renormalizing.
    pub fn is_transform_rigid(&self) -> bool {
        let s = self.scale();
        (s.x - 1.0).abs() < 1e-6 && (s.y - 1.0).abs() < 1e-6 && (s.z - 1.0).abs() < 1e-6
    }

    /// The transform from template space into the space of the emitter, `T * R * S`.
    pub fn transform(&self) -> Matrix4<f32> {
        let s = self.scale();
        let mut m = Matrix4::from(self.rotator.to_matrix());
        m.x *= s.x;
        m.y *= s.y;
        m.z *= s.z;
        m.w = self.location.extend(1.0);
        m
    }

    #[inline]
    pub fn is_transform_dirty(&self) -> bool {
        self.is_transform_dirty
    }

    pub fn mark_transform_dirty(&mut self) {
        self.is_transform_dirty = true;
    }

    // Color.

    /// Whether the emitter carries vertex colors, so the color of the particle is drawn.
    #[inline]
    pub fn has_color(&self) -> bool {
        self.has_color
    }

    #[inline]
    pub fn color4f(&self) -> Color4F {
        self.color
    }

    pub fn set_color4f(&mut self, color: Color4F) {
        self.color = color;
        self.is_color_dirty = self.has_color;
    }

    pub fn color4b(&self) -> Color4B {
        self.color.into()
    }

    pub fn set_color4b(&mut self, color: Color4B) {
        self.set_color4f(color.into());
    }

    pub fn opacity(&self) -> u8 {
        byte_from_float(self.color.a)
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        let color = self.color.with_alpha(float_from_byte(opacity));
        self.set_color4f(color);
    }

    #[inline]
    pub fn is_color_dirty(&self) -> bool {
        self.is_color_dirty
    }

    /// Resets the state a previous particle left in a recycled slot.
    pub(crate) fn reset_for_reuse(&mut self) {
        self.location = Vector3::zero();
        self.rotator = Rotator::Identity;
        self.scale = None;
        self.color = Color4F::white();
        self.lifetime = 0.0;
        self.time_to_live = None;
        self.velocity = Vector3::zero();
        self.is_alive = false;
        self.is_transform_dirty = true;
        self.is_color_dirty = false;
    }

    /// Takes the caller-set state of `other`, keeping the storage of this slot.
    pub(crate) fn take_state_from(&mut self, other: MeshParticle) {
        self.template = other.template;
        self.location = other.location;
        self.rotator = other.rotator;
        self.scale = other.scale;
        self.color = other.color;
        self.lifetime = other.lifetime;
        self.time_to_live = other.time_to_live;
        self.velocity = other.velocity;
        self.is_transform_dirty = true;
        self.is_color_dirty = self.has_color;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transform() {
        let mut p = MeshParticle::new();
        assert!(p.is_transform_rigid());

        p.set_location(Vector3::new(1.0, 2.0, 3.0));
        p.set_rotation_axis_angle(Vector3::unit_z(), Deg(90.0));
        p.set_uniform_scale(2.0);
        assert!(p.is_uniformly_scaled());
        assert!(!p.is_transform_rigid());

        let v = p.transform().transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_ulps_eq!(v, Point3::new(1.0, 4.0, 3.0), epsilon = 1e-5);

        p.set_scale(Vector3::new(1.0, 2.0, 1.0));
        assert!(!p.is_uniformly_scaled());
        assert_ulps_eq!(p.uniform_scale(), 4.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn directions() {
        let mut p = MeshParticle::new();
        assert_ulps_eq!(p.forward_direction(), -Vector3::unit_z(), epsilon = 1e-6);

        p.set_forward_direction(Vector3::unit_x());
        assert_ulps_eq!(p.forward_direction(), Vector3::unit_x(), epsilon = 1e-6);
        assert_ulps_eq!(p.up_direction(), Vector3::unit_y(), epsilon = 1e-5);
    }

    #[test]
    fn colors() {
        let mut p = MeshParticle::new();
        p.set_opacity(0);
        assert!(!p.is_color_dirty());

        p.has_color = true;
        p.set_color4b(Color4B::new(255, 0, 0, 255));
        assert!(p.is_color_dirty());
        assert_eq!(p.color4f(), Color4F::new(1.0, 0.0, 0.0, 1.0));

        p.set_opacity(0);
        assert_eq!(p.color4b(), Color4B::new(255, 0, 0, 0));
    }

    #[test]
    fn aging() {
        let mut p = MeshParticle::new();
        p.is_alive = true;
        p.age(10.0);
        assert!(p.is_alive());

        p.lifetime = 1.0;
        p.time_to_live = Some(1.0);
        p.age(0.25);
        assert!(p.is_alive());
        assert_ulps_eq!(p.age_fraction(), 0.25, epsilon = 1e-6);

        p.age(0.75);
        assert!(!p.is_alive());
    }
}
