use std::cell::RefCell;

use crate::math::prelude::*;
use crate::mesh::mesh::Mesh;
use crate::scene::node::NodeHandle;
use crate::utils::FastHashMap;

use super::bone::SkinnedBone;
use super::section::SkinSection;

/// The skinning state of a mesh node: its skin sections, its rest pose relative to the
/// soft body, and the transforms cached from the bones that deform it.
#[derive(Debug, Default)]
pub struct SkinMesh {
    sections: Vec<SkinSection>,
    rest_pose: Option<(Matrix4<f32>, Matrix4<f32>)>,
    has_rigid_skeleton: bool,
    bounding_bone: Option<NodeHandle>,
    pub(crate) skinned_bones: RefCell<FastHashMap<NodeHandle, SkinnedBone>>,
    pub(crate) deformed: RefCell<Option<DeformedVertices>>,
}

/// Deformed vertex locations, filled lazily and dropped once the skeleton moves.
#[derive(Debug, Default)]
pub(crate) struct DeformedVertices {
    pub stamp: u64,
    pub locations: Vec<Option<Point3<f32>>>,
}

impl Clone for SkinMesh {
    fn clone(&self) -> Self {
        SkinMesh {
            sections: self.sections.clone(),
            rest_pose: self.rest_pose,
            has_rigid_skeleton: self.has_rigid_skeleton,
            bounding_bone: self.bounding_bone,
            skinned_bones: RefCell::new(FastHashMap::default()),
            deformed: RefCell::new(None),
        }
    }
}

impl SkinMesh {
    pub fn new() -> Self {
        SkinMesh::default()
    }

    pub fn with_sections(sections: Vec<SkinSection>) -> Self {
        SkinMesh {
            sections,
            ..SkinMesh::default()
        }
    }

    #[inline]
    pub fn sections(&self) -> &[SkinSection] {
        &self.sections
    }

    /// Mutable access to the sections. Cached transforms are dropped.
    pub fn sections_mut(&mut self) -> &mut Vec<SkinSection> {
        self.invalidate();
        &mut self.sections
    }

    pub fn add_section(&mut self, section: SkinSection) {
        self.sections.push(section);
        self.invalidate();
    }

    /// The transform of the skin node relative to its soft body at the rest pose.
    #[inline]
    pub fn rest_pose_transform(&self) -> Option<Matrix4<f32>> {
        self.rest_pose.map(|v| v.0)
    }

    #[inline]
    pub fn rest_pose_inverse(&self) -> Option<Matrix4<f32>> {
        self.rest_pose.map(|v| v.1)
    }

    pub(crate) fn bind_rest_pose(&mut self, relative_to_soft_body: Matrix4<f32>) {
        let inv = match relative_to_soft_body.invert() {
            Some(v) => v,
            None => {
                warn!("The rest pose of a skin node is not invertible.");
                Matrix4::identity()
            }
        };

        self.rest_pose = Some((relative_to_soft_body, inv));
        self.invalidate();
    }

    /// True once the skeleton has been made rigid, so palettes may be uploaded as a
    /// rotation and a translation per bone.
    #[inline]
    pub fn has_rigid_skeleton(&self) -> bool {
        self.has_rigid_skeleton
    }

    pub(crate) fn set_has_rigid_skeleton(&mut self, rigid: bool) {
        self.has_rigid_skeleton = rigid;
    }

    /// The bone whose bounding volume stands in for the volume of this node.
    #[inline]
    pub fn bounding_bone(&self) -> Option<NodeHandle> {
        self.bounding_bone
    }

    pub(crate) fn set_bounding_bone(&mut self, bone: Option<NodeHandle>) {
        self.bounding_bone = bone;
    }

    /// Every bone referred to by a section, without duplicates, in order of first use.
    pub fn bones(&self) -> Vec<NodeHandle> {
        let mut bones = Vec::new();
        for v in self.sections.iter().flat_map(|s| s.bones().iter()) {
            if !bones.contains(v) {
                bones.push(*v);
            }
        }

        bones
    }

    /// Points the sections at the bones found in `remap`.
    pub fn remap_bones(&mut self, remap: &FastHashMap<NodeHandle, NodeHandle>) {
        for v in &mut self.sections {
            v.remap_bones(remap);
        }

        if let Some(b) = self.bounding_bone {
            if let Some(&to) = remap.get(&b) {
                self.bounding_bone = Some(to);
            }
        }

        self.invalidate();
    }

    /// Drops the cached bone transforms and deformed vertices.
    pub fn invalidate(&self) {
        self.skinned_bones.borrow_mut().clear();
        self.deformed.borrow_mut().take();
    }

    /// Returns true if the deformed vertices have been computed since the skeleton
    /// last moved.
    pub fn has_deformed_vertices(&self) -> bool {
        self.deformed.borrow().is_some()
    }

    /// The section that draws the element at `index`. Elements are vertex indices if
    /// the mesh is indexed, and vertices otherwise.
    pub fn skin_section_for_vertex_index_at(&self, index: usize) -> Option<&SkinSection> {
        self.sections.iter().find(|v| v.contains_vertex_index(index))
    }

    /// The section that draws face `face` of `mesh`.
    pub fn skin_section_for_face_index(&self, mesh: &Mesh, face: usize) -> Option<&SkinSection> {
        self.skin_section_for_vertex_index_at(mesh.draw_mode().first_element_of_face(face))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::mesh::DrawMode;
    use crate::mesh::vertex_array::VertexContent;
    use crate::utils::HandleLike;

    #[test]
    fn sections_for_faces() {
        let mut mesh = Mesh::new(Some("skin"));
        mesh.set_vertex_content(VertexContent::LOCATION);
        mesh.set_vertex_count(12);

        let skin = SkinMesh::with_sections(vec![SkinSection::new(0, 6), SkinSection::new(6, 6)]);
        assert_eq!(skin.skin_section_for_vertex_index_at(5).map(|v| v.vertex_start()), Some(0));
        assert_eq!(skin.skin_section_for_vertex_index_at(6).map(|v| v.vertex_start()), Some(6));
        assert!(skin.skin_section_for_vertex_index_at(12).is_none());

        assert_eq!(skin.skin_section_for_face_index(&mesh, 1).map(|v| v.vertex_start()), Some(0));
        assert_eq!(skin.skin_section_for_face_index(&mesh, 2).map(|v| v.vertex_start()), Some(6));

        mesh.set_draw_mode(DrawMode::TriangleStrip);
        assert_eq!(skin.skin_section_for_face_index(&mesh, 5).map(|v| v.vertex_start()), Some(0));
        assert_eq!(skin.skin_section_for_face_index(&mesh, 6).map(|v| v.vertex_start()), Some(6));
    }

    #[test]
    fn remap() {
        let (a, b, c) = (
            NodeHandle::new(1, 1),
            NodeHandle::new(2, 1),
            NodeHandle::new(3, 1),
        );

        let mut section = SkinSection::new(0, 3);
        section.add_bone(a);
        section.add_bone(b);
        section.add_bone(a);
        let mut skin = SkinMesh::with_sections(vec![section]);
        assert_eq!(skin.bones(), vec![a, b]);

        let mut remap = FastHashMap::default();
        remap.insert(a, c);
        skin.remap_bones(&remap);
        assert_eq!(skin.sections()[0].bones(), &[c, b, c]);
    }
}
