//! Nodes of the scene graph.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::identity::prelude::Shared;
use crate::identity::{Identifiable, Identity};
use crate::materials::material::Material;
use crate::math::prelude::*;
use crate::mesh::mesh::Mesh;
use crate::particles::MeshParticleEmitter;
use crate::skinning::{Bone, SkinMesh};

use super::bounding::BoundingVolume;
use super::camera::Camera;
use super::rotator::Rotator;

impl_handle!(NodeHandle);

static LAST_STAMP: AtomicUsize = AtomicUsize::new(0);

/// Returns a transform stamp newer than every stamp handed out before.
///
/// A node takes a new stamp whenever its local transform or its parent changes. The
/// stamp of a global transform is the newest stamp along the ancestry, so a cached
/// value derived from a global transform is stale once that stamp moves.
pub fn next_stamp() -> u64 {
    (LAST_STAMP.fetch_add(1, Ordering::Relaxed) + 1) as u64
}

/// What a copy of a node does with the user data of the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDataCopy {
    /// The copy refers to the same payload.
    Share,
    /// The copy starts without a payload.
    Skip,
}

/// The drawable content of a mesh node.
#[derive(Debug, Clone, Default)]
pub struct MeshNode {
    pub mesh: Option<Shared<Mesh>>,
    pub material: Option<Shared<Material>>,
    /// The color drawn with when there is no material.
    pub pure_color: Color4F,
    /// Skin sections, if the mesh is deformed by a skeleton.
    pub skin: Option<SkinMesh>,
}

impl MeshNode {
    pub fn new(mesh: Shared<Mesh>, material: Option<Shared<Material>>) -> Self {
        MeshNode {
            mesh: Some(mesh),
            material,
            pure_color: Color4F::white(),
            skin: None,
        }
    }

    /// A copy that shares the mesh and owns a copy of the material.
    pub fn copy(&self) -> Self {
        MeshNode {
            mesh: self.mesh.clone(),
            material: self
                .material
                .as_ref()
                .map(|v| Rc::new(RefCell::new(v.borrow().copy()))),
            pure_color: self.pure_color,
            skin: self.skin.clone(),
        }
    }

    #[inline]
    pub fn is_skinned(&self) -> bool {
        self.skin.is_some()
    }
}

/// The specialization of a node.
#[derive(Debug)]
pub enum NodeContent {
    Plain,
    Camera(Camera),
    Mesh(MeshNode),
    /// A node of a skeleton. Draws nothing.
    Bone(Bone),
    /// The root of a skeleton and the skins it deforms.
    SoftBody,
    Emitter(Box<MeshParticleEmitter>),
}

impl Default for NodeContent {
    fn default() -> Self {
        NodeContent::Plain
    }
}

impl NodeContent {
    pub fn copy(&self) -> Self {
        match *self {
            NodeContent::Plain => NodeContent::Plain,
            NodeContent::Camera(ref v) => NodeContent::Camera(*v),
            NodeContent::Mesh(ref v) => NodeContent::Mesh(v.copy()),
            NodeContent::Bone(ref v) => NodeContent::Bone(v.clone()),
            NodeContent::SoftBody => NodeContent::SoftBody,
            NodeContent::Emitter(ref v) => NodeContent::Emitter(Box::new(v.copy())),
        }
    }

    /// Whether drawing this content issues GL calls.
    pub fn is_drawable(&self) -> bool {
        match *self {
            NodeContent::Mesh(ref v) => v.mesh.is_some(),
            NodeContent::Emitter(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Links {
    pub parent: Option<NodeHandle>,
    pub first_child: Option<NodeHandle>,
    pub next_sib: Option<NodeHandle>,
    pub prev_sib: Option<NodeHandle>,
}

/// A transform hierarchy element.
///
/// Local transforms are kept as location, rotation and scale, and combine as
/// `T * R * S`. Setters take a new stamp, which invalidates the global transforms
/// cached for the node and every descendant.
pub struct Node {
    identity: Identity,
    pub(crate) links: Links,

    location: Vector3<f32>,
    rotator: Rotator,
    scale: Vector3<f32>,
    stamp: u64,
    pub(crate) global: Cell<Option<(u64, Matrix4<f32>)>>,

    bounding_volume: BoundingVolume,
    is_visible: bool,
    should_include_in_deep_copy: bool,
    user_data: Option<Rc<dyn Any>>,
    user_data_copy: UserDataCopy,

    content: NodeContent,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Node")
            .field("identity", &self.identity)
            .field("location", &self.location)
            .field("rotator", &self.rotator)
            .field("scale", &self.scale)
            .field("content", &self.content)
            .finish()
    }
}

impl Identifiable for Node {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn should_include_in_deep_copy(&self) -> bool {
        self.should_include_in_deep_copy
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::new(None::<&str>, NodeContent::Plain)
    }
}

impl Node {
    pub fn new<T: AsRef<str>>(name: Option<T>, content: NodeContent) -> Self {
        Node {
            identity: Identity::new(name),
            links: Links::default(),
            location: Vector3::zero(),
            rotator: Rotator::Identity,
            scale: Vector3::new(1.0, 1.0, 1.0),
            stamp: next_stamp(),
            global: Cell::new(None),
            bounding_volume: BoundingVolume::None,
            is_visible: true,
            should_include_in_deep_copy: true,
            user_data: None,
            user_data_copy: UserDataCopy::Share,
            content,
        }
    }

    pub fn named<T: AsRef<str>>(name: T) -> Self {
        Node::new(Some(name), NodeContent::Plain)
    }

    pub fn with_content<T: AsRef<str>>(name: T, content: NodeContent) -> Self {
        Node::new(Some(name), content)
    }

    /// A detached copy with a new tag. Children are copied by the scene.
    pub fn copy(&self) -> Self {
        Node {
            identity: self.identity.copy(),
            links: Links::default(),
            location: self.location,
            rotator: self.rotator,
            scale: self.scale,
            stamp: next_stamp(),
            global: Cell::new(None),
            bounding_volume: self.bounding_volume.clone(),
            is_visible: self.is_visible,
            should_include_in_deep_copy: self.should_include_in_deep_copy,
            user_data: match self.user_data_copy {
                UserDataCopy::Share => self.user_data.clone(),
                UserDataCopy::Skip => None,
            },
            user_data_copy: self.user_data_copy,
            content: self.content.copy(),
        }
    }

    pub fn set_name<T: AsRef<str>>(&mut self, name: Option<T>) {
        self.identity.set_name(name);
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.links.parent
    }

    // Transforms.

    #[inline]
    pub fn location(&self) -> Vector3<f32> {
        self.location
    }

    pub fn set_location(&mut self, location: Vector3<f32>) {
        self.location = location;
        self.touch();
    }

    pub fn translate_by(&mut self, v: Vector3<f32>) {
        self.location += v;
        self.touch();
    }

    #[inline]
    pub fn rotator(&self) -> &Rotator {
        &self.rotator
    }

    /// The rotation as Euler angles in degrees.
    #[inline]
    pub fn rotation(&self) -> Euler<Deg<f32>> {
        self.rotator.rotation()
    }

    pub fn set_rotation(&mut self, euler: Euler<Deg<f32>>) {
        self.rotator.set_rotation(euler);
        self.touch();
    }

    #[inline]
    pub fn quaternion(&self) -> Quaternion<f32> {
        self.rotator.quaternion()
    }

    pub fn set_quaternion(&mut self, q: Quaternion<f32>) {
        self.rotator.set_quaternion(q);
        self.touch();
    }

    #[inline]
    pub fn rotation_axis_angle(&self) -> (Vector3<f32>, Deg<f32>) {
        self.rotator.rotation_axis_angle()
    }

    pub fn set_rotation_axis_angle(&mut self, axis: Vector3<f32>, angle: Deg<f32>) {
        self.rotator.set_rotation_axis_angle(axis, angle);
        self.touch();
    }

    pub fn rotate_by(&mut self, q: Quaternion<f32>) {
        self.rotator.rotate_by(q);
        self.touch();
    }

    #[inline]
    pub fn forward_direction(&self) -> Vector3<f32> {
        self.rotator.forward_direction()
    }

    pub fn set_forward_direction(&mut self, forward: Vector3<f32>) {
        self.rotator.set_forward_direction(forward);
        self.touch();
    }

    #[inline]
    pub fn up_direction(&self) -> Vector3<f32> {
        self.rotator.up_direction()
    }

    #[inline]
    pub fn right_direction(&self) -> Vector3<f32> {
        self.rotator.right_direction()
    }

    #[inline]
    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.touch();
    }

    /// The average of the three scale components.
    #[inline]
    pub fn uniform_scale(&self) -> f32 {
        (self.scale.x + self.scale.y + self.scale.z) / 3.0
    }

    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.set_scale(Vector3::new(scale, scale, scale));
    }

    /// Whether the scale is one along every axis.
    pub fn is_unit_scale(&self) -> bool {
        let d = self.scale - Vector3::new(1.0, 1.0, 1.0);
        d.x.abs() < 1e-6 && d.y.abs() < 1e-6 && d.z.abs() < 1e-6
    }

    /// The local transform, `T * R * S`.
    pub fn local_transform(&self) -> Matrix4<f32> {
        let mut m = Matrix4::from(self.rotator.to_matrix());
        m.x *= self.scale.x;
        m.y *= self.scale.y;
        m.z *= self.scale.z;
        m.w = self.location.extend(1.0);
        m
    }

    /// The stamp of the last change of the local transform or the parent.
    #[inline]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Marks the local transform as changed.
    #[inline]
    pub fn touch(&mut self) {
        self.stamp = next_stamp();
    }

    // Display.

    #[inline]
    pub fn bounding_volume(&self) -> &BoundingVolume {
        &self.bounding_volume
    }

    #[inline]
    pub fn set_bounding_volume(&mut self, bv: BoundingVolume) {
        self.bounding_volume = bv;
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    #[inline]
    pub fn set_is_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    #[inline]
    pub fn set_should_include_in_deep_copy(&mut self, v: bool) {
        self.should_include_in_deep_copy = v;
    }

    // User data.

    #[inline]
    pub fn user_data(&self) -> Option<&Rc<dyn Any>> {
        self.user_data.as_ref()
    }

    /// Returns the user data if it is a `T`.
    pub fn user_data_as<T: Any>(&self) -> Option<&T> {
        self.user_data.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    #[inline]
    pub fn set_user_data(&mut self, data: Option<Rc<dyn Any>>) {
        self.user_data = data;
    }

    #[inline]
    pub fn set_user_data_copy(&mut self, policy: UserDataCopy) {
        self.user_data_copy = policy;
    }

    // Content.

    #[inline]
    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    #[inline]
    pub fn content_mut(&mut self) -> &mut NodeContent {
        &mut self.content
    }

    pub fn camera(&self) -> Option<&Camera> {
        match self.content {
            NodeContent::Camera(ref v) => Some(v),
            _ => None,
        }
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        match self.content {
            NodeContent::Camera(ref mut v) => Some(v),
            _ => None,
        }
    }

    pub fn mesh_node(&self) -> Option<&MeshNode> {
        match self.content {
            NodeContent::Mesh(ref v) => Some(v),
            _ => None,
        }
    }

    pub fn mesh_node_mut(&mut self) -> Option<&mut MeshNode> {
        match self.content {
            NodeContent::Mesh(ref mut v) => Some(v),
            _ => None,
        }
    }

    pub fn bone(&self) -> Option<&Bone> {
        match self.content {
            NodeContent::Bone(ref v) => Some(v),
            _ => None,
        }
    }

    pub fn bone_mut(&mut self) -> Option<&mut Bone> {
        match self.content {
            NodeContent::Bone(ref mut v) => Some(v),
            _ => None,
        }
    }

    pub fn skin(&self) -> Option<&SkinMesh> {
        self.mesh_node().and_then(|v| v.skin.as_ref())
    }

    pub fn skin_mut(&mut self) -> Option<&mut SkinMesh> {
        self.mesh_node_mut().and_then(|v| v.skin.as_mut())
    }

    #[inline]
    pub fn is_soft_body(&self) -> bool {
        match self.content {
            NodeContent::SoftBody => true,
            _ => false,
        }
    }

    pub fn emitter(&self) -> Option<&MeshParticleEmitter> {
        match self.content {
            NodeContent::Emitter(ref v) => Some(v),
            _ => None,
        }
    }

    pub fn emitter_mut(&mut self) -> Option<&mut MeshParticleEmitter> {
        match self.content {
            NodeContent::Emitter(ref mut v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_transform() {
        let mut node = Node::named("n");
        let stamp = node.stamp();

        node.set_location(Vector3::new(1.0, 2.0, 3.0));
        node.set_rotation_axis_angle(Vector3::unit_z(), Deg(90.0));
        node.set_scale(Vector3::new(2.0, 2.0, 2.0));
        assert!(node.stamp() > stamp);

        let p = node.local_transform().transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_ulps_eq!(p, Point3::new(1.0, 4.0, 3.0), epsilon = 1e-5);
        assert!(!node.is_unit_scale());
    }

    #[test]
    fn copy() {
        let mut node = Node::named("n");
        node.set_user_data(Some(Rc::new(7u32)));
        let copy = node.copy();
        assert_ne!(copy.tag(), node.tag());
        assert_eq!(copy.name(), Some("n"));
        assert_eq!(copy.user_data_as::<u32>(), Some(&7));

        node.set_user_data_copy(UserDataCopy::Skip);
        assert!(node.copy().user_data().is_none());
    }
}
