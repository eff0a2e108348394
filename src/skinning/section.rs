use std::ops::Range;

use smallvec::SmallVec;

use crate::mesh::mesh::Mesh;
use crate::mesh::vertex_array::VertexContent;
use crate::utils::FastHashMap;
use crate::scene::node::NodeHandle;

/// The tolerance `validate_weights` accepts around a sum of one.
pub const WEIGHT_TOLERANCE: f32 = 1e-3;

/// A consecutive range of the elements of a skin mesh, drawn with one call, and the
/// bones that deform it. The matrix indices stored per vertex index into `bones`.
///
/// Elements are vertex indices if the mesh is indexed, and vertices otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinSection {
    vertex_start: usize,
    vertex_count: usize,
    bones: SmallVec<[NodeHandle; 8]>,
}

impl SkinSection {
    pub fn new(vertex_start: usize, vertex_count: usize) -> Self {
        SkinSection {
            vertex_start,
            vertex_count,
            bones: SmallVec::new(),
        }
    }

    #[inline]
    pub fn vertex_start(&self) -> usize {
        self.vertex_start
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.vertex_start..self.vertex_start + self.vertex_count
    }

    pub fn set_range(&mut self, vertex_start: usize, vertex_count: usize) {
        self.vertex_start = vertex_start;
        self.vertex_count = vertex_count;
    }

    #[inline]
    pub fn contains_vertex_index(&self, index: usize) -> bool {
        index >= self.vertex_start && index < self.vertex_start + self.vertex_count
    }

    #[inline]
    pub fn bones(&self) -> &[NodeHandle] {
        &self.bones
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn bone_at(&self, index: usize) -> Option<NodeHandle> {
        self.bones.get(index).cloned()
    }

    /// Appends a bone. Its matrix index is the current bone count.
    pub fn add_bone(&mut self, bone: NodeHandle) {
        self.bones.push(bone);
    }

    pub(crate) fn set_bone_at(&mut self, index: usize, bone: NodeHandle) {
        self.bones[index] = bone;
    }

    /// Replaces the bones found in `remap`.
    pub fn remap_bones(&mut self, remap: &FastHashMap<NodeHandle, NodeHandle>) {
        for v in self.bones.iter_mut() {
            if let Some(&to) = remap.get(v) {
                *v = to;
            }
        }
    }

    /// Asserts that the range lies in the elements of `mesh`.
    pub fn validate_range(&self, mesh: &Mesh) {
        let end = self.vertex_start + self.vertex_count;
        assert!(
            end <= mesh.element_count(),
            "Skin section [{}, {}) exceeds the {} elements of the mesh.",
            self.vertex_start,
            end,
            mesh.element_count()
        );
    }

    /// Returns the vertices in this section whose weights do not sum to one, or whose
    /// matrix indices refer past the bones of the section. Weights are reported, never
    /// normalized.
    pub fn validate_weights(&self, mesh: &Mesh) -> Vec<usize> {
        let content = VertexContent::MATRIX_INDICES | VertexContent::WEIGHTS;
        if !mesh.has_vertex_content(content) {
            return Vec::new();
        }

        let mut invalid = Vec::new();
        for element in self.range() {
            let v = if mesh.has_indices() {
                mesh.vertex_index_at(element)
            } else {
                element
            };

            let mut sum = 0.0;
            let mut ok = true;
            for unit in 0..mesh.vertex_unit_count() {
                let w = mesh.vertex_weight_at(v, unit);
                sum += w;
                if w != 0.0 && mesh.vertex_matrix_index_at(v, unit) >= self.bones.len() {
                    ok = false;
                }
            }

            if !ok || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
                invalid.push(v);
            }
        }

        invalid.sort();
        invalid.dedup();
        invalid
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::prelude::Point3;

    fn weighted() -> Mesh {
        let mut mesh = Mesh::new(Some("skin"));
        mesh.set_vertex_count(3);
        mesh.set_vertex_unit_count(2);
        mesh.set_vertex_content(
            VertexContent::LOCATION | VertexContent::MATRIX_INDICES | VertexContent::WEIGHTS,
        );

        for i in 0..3 {
            mesh.set_vertex_location_at(i, Point3::new(i as f32, 0.0, 0.0));
            mesh.set_vertex_matrix_index_at(i, 0, 0);
            mesh.set_vertex_matrix_index_at(i, 1, 1);
            mesh.set_vertex_weight_at(i, 0, 0.5);
            mesh.set_vertex_weight_at(i, 1, 0.5);
        }

        mesh
    }

    #[test]
    fn contains() {
        let section = SkinSection::new(3, 6);
        assert!(!section.contains_vertex_index(2));
        assert!(section.contains_vertex_index(3));
        assert!(section.contains_vertex_index(8));
        assert!(!section.contains_vertex_index(9));
    }

    #[test]
    fn weights() {
        let mut mesh = weighted();
        let mut section = SkinSection::new(0, 3);
        section.add_bone(NodeHandle::default());
        section.add_bone(NodeHandle::default());
        assert!(section.validate_weights(&mesh).is_empty());

        mesh.set_vertex_weight_at(1, 1, 0.25);
        mesh.set_vertex_matrix_index_at(2, 1, 5);
        assert_eq!(section.validate_weights(&mesh), vec![1, 2]);

        // Never normalized.
        assert_eq!(mesh.vertex_weight_at(1, 1), 0.25);
    }

    #[test]
    #[should_panic]
    fn range_past_mesh() {
        let mesh = weighted();
        SkinSection::new(2, 2).validate_range(&mesh);
    }
}
