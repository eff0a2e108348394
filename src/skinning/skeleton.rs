//! Skeleton operations over the scene graph.
//!
//! Bones and skins are plain nodes, so everything that spans a skeleton is an
//! operation of the `Scene`. Transforms combined from a bone and a skin node are cached
//! in the skin, keyed by the transform stamps of both nodes.

use std::iter;

use crate::identity::Identifiable;
use crate::math::prelude::*;
use crate::mesh::vertex_array::VertexContent;
use crate::scene::bounding::BoundingVolume;
use crate::scene::graph::Scene;
use crate::scene::node::NodeHandle;

use super::bone::SkinnedBone;
use super::skin_mesh::{DeformedVertices, SkinMesh};

impl Scene {
    fn subtree(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        iter::once(handle).chain(self.descendants(handle)).collect()
    }

    /// The nearest soft body at or above `handle`.
    pub fn soft_body_node(&self, handle: NodeHandle) -> Option<NodeHandle> {
        iter::once(handle)
            .chain(self.ancestors(handle))
            .find(|&v| self[v].is_soft_body())
    }

    /// Returns true if any descendant of `handle` is a bone or a skinned mesh.
    pub fn has_soft_body_content(&self, handle: NodeHandle) -> bool {
        self.descendants(handle)
            .any(|v| self[v].bone().is_some() || self[v].skin().is_some())
    }

    /// Records the current pose of every skeleton in the subtree of `handle` as its
    /// rest pose. Bones record the inverse of their transform relative to their soft
    /// body, skin nodes their transform relative to it.
    ///
    /// Call this once the skeleton is assembled, with the bones aligned to the
    /// undeformed vertices.
    pub fn bind_rest_pose(&mut self, handle: NodeHandle) {
        let bodies: Vec<_> = self
            .subtree(handle)
            .into_iter()
            .filter(|&v| self[v].is_soft_body())
            .collect();

        if bodies.is_empty() {
            warn!("No soft body to bind a rest pose in {}.", self[handle].describe());
            return;
        }

        for body in bodies {
            let (mut bones, mut skins) = (0, 0);
            for v in self.descendants(body).collect::<Vec<_>>() {
                let rel = match self.transform_relative_to(v, body) {
                    Some(m) => m,
                    None => continue,
                };

                let node = &mut self[v];
                if let Some(bone) = node.bone_mut() {
                    bone.bind_rest_pose(&rel);
                    bones += 1;
                } else if let Some(skin) = node.skin_mut() {
                    skin.bind_rest_pose(rel);
                    skins += 1;
                }
            }

            debug!(
                "Binds the rest pose of {} bones and {} skins in {}.",
                bones,
                skins,
                self[body].describe()
            );
        }
    }

    /// Makes every bone in the subtree of `handle` free of scale, and binds the rest
    /// pose again, so skins can be drawn with rigid transforms.
    pub fn ensure_rigid_skeleton(&mut self, handle: NodeHandle) {
        for v in self.subtree(handle) {
            let node = &mut self[v];
            if node.bone().is_some() && !node.is_unit_scale() {
                node.set_uniform_scale(1.0);
            }

            if let Some(skin) = node.skin_mut() {
                skin.set_has_rigid_skeleton(true);
            }
        }

        self.bind_rest_pose(handle);
    }

    /// Returns true if every skin in the subtree of `handle` has been made rigid and its
    /// bones are still free of scale.
    pub fn has_rigid_skeleton(&self, handle: NodeHandle) -> bool {
        let skins: Vec<&SkinMesh> = self
            .subtree(handle)
            .into_iter()
            .filter_map(|v| self[v].skin())
            .collect();

        !skins.is_empty()
            && skins.iter().all(|skin| {
                skin.has_rigid_skeleton()
                    && skin
                        .bones()
                        .into_iter()
                        .all(|b| self.node(b).map(|n| n.is_unit_scale()).unwrap_or(true))
            })
    }

    /// The combined transforms of `bone` acting on the skin of `skin_node`. Returns
    /// `None` if `skin_node` has no skin.
    ///
    /// # Panics
    ///
    /// Panics if `bone` is no longer alive.
    pub fn skinned_bone(&self, skin_node: NodeHandle, bone: NodeHandle) -> Option<SkinnedBone> {
        let skin = self[skin_node].skin()?;
        let stamp = self.transform_stamp(bone).max(self.transform_stamp(skin_node));

        if let Some(v) = skin.skinned_bones.borrow().get(&bone) {
            if v.stamp == stamp {
                return Some(*v);
            }
        }

        let global = self.global_transform(bone);
        let posed = match self[bone].bone() {
            Some(b) => b.apply_pose_to(&global),
            None => global,
        };

        let rest = skin.rest_pose_transform().unwrap_or_else(Matrix4::identity);
        let v = SkinnedBone::new(bone, stamp, posed, &rest, &self.global_transform(skin_node));
        skin.skinned_bones.borrow_mut().insert(bone, v);
        Some(v)
    }

    /// The newest transform stamp over a skin node and its bones.
    fn skin_stamp(&self, skin_node: NodeHandle, skin: &SkinMesh) -> u64 {
        skin.bones()
            .into_iter()
            .filter(|&b| self.contains(b))
            .map(|b| self.transform_stamp(b))
            .fold(self.transform_stamp(skin_node), u64::max)
    }

    /// The location of vertex `vertex` in the local space of `handle`, deformed by the
    /// current pose of the skeleton. `face` is a face containing the vertex, and picks
    /// the skin section whose bones apply. Unskinned meshes answer their vertex
    /// location. Returns `None` if `handle` has no mesh.
    pub fn deformed_vertex_location_at(
        &self,
        handle: NodeHandle,
        vertex: usize,
        face: usize,
    ) -> Option<Point3<f32>> {
        let mesh_node = self[handle].mesh_node()?;
        let mesh = mesh_node.mesh.as_ref()?.borrow();
        let skin = match mesh_node.skin {
            Some(ref v) => v,
            None => return Some(mesh.vertex_location_at(vertex)),
        };

        let stamp = self.skin_stamp(handle, skin);
        {
            let mut deformed = skin.deformed.borrow_mut();
            let fresh = deformed
                .as_ref()
                .map(|v| v.stamp == stamp && v.locations.len() == mesh.vertex_count())
                .unwrap_or(false);

            if !fresh {
                *deformed = Some(DeformedVertices {
                    stamp,
                    locations: vec![None; mesh.vertex_count()],
                });
            }

            if let Some(Some(p)) = deformed.as_ref().and_then(|v| v.locations.get(vertex)) {
                return Some(*p);
            }
        }

        let rest = mesh.vertex_location_at(vertex);
        let content = VertexContent::MATRIX_INDICES | VertexContent::WEIGHTS;
        let section = skin.skin_section_for_face_index(&mesh, face);

        let p = match section {
            Some(section) if mesh.has_vertex_content(content) => {
                let h = rest.to_homogeneous();
                let mut sum = Vector4::new(0.0, 0.0, 0.0, 0.0);
                for unit in 0..mesh.vertex_unit_count() {
                    let w = mesh.vertex_weight_at(vertex, unit);
                    if w == 0.0 {
                        continue;
                    }

                    let bone = match section.bone_at(mesh.vertex_matrix_index_at(vertex, unit)) {
                        Some(v) => v,
                        None => continue,
                    };

                    if let Some(v) = self.skinned_bone(handle, bone) {
                        sum += (v.skin_transform() * h) * w;
                    }
                }

                Point3::new(sum.x, sum.y, sum.z)
            }
            _ => rest,
        };

        if let Some(ref mut v) = *skin.deformed.borrow_mut() {
            if let Some(slot) = v.locations.get_mut(vertex) {
                *slot = Some(p);
            }
        }

        Some(p)
    }

    /// Face `face` of the mesh of `handle`, deformed by the current pose of the skeleton,
    /// in the local space of `handle`.
    pub fn deformed_face_at(&self, handle: NodeHandle, face: usize) -> Option<Face> {
        let FaceIndices([a, b, c]) = {
            let mesh_node = self[handle].mesh_node()?;
            let mesh = mesh_node.mesh.as_ref()?.borrow();
            if mesh_node.skin.is_none() {
                return Some(mesh.face_at(face));
            }

            mesh.face_indices_at(face)
        };

        Some(Face::new(
            self.deformed_vertex_location_at(handle, a as usize, face)?,
            self.deformed_vertex_location_at(handle, b as usize, face)?,
            self.deformed_vertex_location_at(handle, c as usize, face)?,
        ))
    }

    pub fn deformed_face_center_at(&self, handle: NodeHandle, face: usize) -> Option<Point3<f32>> {
        self.deformed_face_at(handle, face).map(|v| v.center())
    }

    pub fn deformed_face_normal_at(&self, handle: NodeHandle, face: usize) -> Option<Vector3<f32>> {
        self.deformed_face_at(handle, face).map(|v| v.normal())
    }

    pub fn deformed_face_plane_at(&self, handle: NodeHandle, face: usize) -> Option<Plane> {
        self.deformed_face_at(handle, face).map(|v| v.plane())
    }

    /// Gives every skin in the subtree of `handle` a sphere around its mesh at the rest
    /// pose. Replaces a skeletal bounding volume set before.
    pub fn create_skinned_bounding_volumes(&mut self, handle: NodeHandle) {
        for v in self.subtree(handle) {
            let node = &mut self[v];
            if node.skin().is_none() {
                continue;
            }

            let aabb = node
                .mesh_node()
                .and_then(|m| m.mesh.as_ref())
                .and_then(|m| m.borrow().bounding_box());

            if let Some(skin) = node.skin_mut() {
                skin.set_bounding_bone(None);
            }

            node.set_bounding_volume(match aabb {
                Some(aabb) => BoundingVolume::Sphere(Sphere::from_aabb(&aabb)),
                None => BoundingVolume::None,
            });
        }
    }

    /// Gives `bone` a bounding volume in its local space, and makes it the bounding
    /// volume of every skin in the soft body of `bone`. The volume moves with the bone.
    /// Replaces rest-pose spheres created before.
    pub fn set_skeletal_bounding_volume(&mut self, bone: NodeHandle, volume: BoundingVolume) {
        self[bone].set_bounding_volume(volume);

        let body = match self.soft_body_node(bone) {
            Some(v) => v,
            None => {
                warn!("Bone {} is not in a soft body.", self[bone].describe());
                return;
            }
        };

        for v in self.subtree(body) {
            let node = &mut self[v];
            if let Some(skin) = node.skin_mut() {
                skin.set_bounding_bone(Some(bone));
            } else {
                continue;
            }

            node.set_bounding_volume(BoundingVolume::None);
        }
    }

    /// The bounding volume culling uses for `handle`, and the transform that carries
    /// it into world space.
    pub fn culling_volume(&self, handle: NodeHandle) -> (&BoundingVolume, Matrix4<f32>) {
        let bone = self[handle]
            .skin()
            .and_then(|v| v.bounding_bone())
            .filter(|&b| self.contains(b));

        match bone {
            Some(b) => (self[b].bounding_volume(), self.global_transform(b)),
            None => (self[handle].bounding_volume(), self.global_transform(handle)),
        }
    }

    /// Points the skins in the subtree of `handle` at the bones of the same name found
    /// in the subtree of `from`. Used to drive a copied skin with a copied skeleton.
    /// Returns the number of bones replaced.
    pub fn reattach_bones_from(&mut self, handle: NodeHandle, from: NodeHandle) -> usize {
        let mut replaced = Vec::new();
        for v in self.subtree(handle) {
            let skin = match self[v].skin() {
                Some(skin) => skin,
                None => continue,
            };

            for (i, section) in skin.sections().iter().enumerate() {
                for (j, &bone) in section.bones().iter().enumerate() {
                    let name = match self.node(bone).and_then(|n| n.name()) {
                        Some(name) => name,
                        None => {
                            warn!("Skin {} refers to an unnamed or dead bone.", self[v].describe());
                            continue;
                        }
                    };

                    if let Some(to) = self.find_by_name(from, name) {
                        if to != bone && self[to].bone().is_some() {
                            replaced.push((v, i, j, to));
                        }
                    }
                }
            }
        }

        for &(v, i, j, to) in &replaced {
            if let Some(skin) = self[v].skin_mut() {
                skin.sections_mut()[i].set_bone_at(j, to);
            }
        }

        replaced.len()
    }

    fn for_each_mesh_in<F>(&mut self, handle: NodeHandle, mut func: F)
    where
        F: FnMut(&mut crate::mesh::mesh::Mesh),
    {
        for v in self.subtree(handle) {
            if let Some(mesh) = self[v].mesh_node().and_then(|m| m.mesh.clone()) {
                func(&mut mesh.borrow_mut());
            }
        }
    }

    /// Keeps the client copy of the matrix indices of every mesh in the subtree.
    pub fn retain_vertex_matrix_indices(&mut self, handle: NodeHandle) {
        self.for_each_mesh_in(handle, |m| m.retain_vertex_matrix_indices());
    }

    pub fn retain_vertex_weights(&mut self, handle: NodeHandle) {
        self.for_each_mesh_in(handle, |m| m.retain_vertex_weights());
    }

    /// Keeps the matrix indices of every mesh in the subtree out of GL buffers.
    pub fn do_not_buffer_vertex_matrix_indices(&mut self, handle: NodeHandle) {
        self.for_each_mesh_in(handle, |m| m.do_not_buffer_vertex_matrix_indices());
    }

    pub fn do_not_buffer_vertex_weights(&mut self, handle: NodeHandle) {
        self.for_each_mesh_in(handle, |m| m.do_not_buffer_vertex_weights());
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::mesh::mesh::Mesh;
    use crate::scene::node::{MeshNode, Node, NodeContent};
    use crate::skinning::bone::Bone;
    use crate::skinning::section::SkinSection;

    struct Rig {
        scene: Scene,
        body: NodeHandle,
        bones: [NodeHandle; 2],
        skin: NodeHandle,
    }

    // A soft body with two chained bones, and a skin with three vertices. Vertex 2
    // follows the second bone, the others the first.
    fn rig() -> Rig {
        let mut scene = Scene::new();
        let body = scene.add(Node::with_content("body", NodeContent::SoftBody));
        let b0 = scene
            .add_child(body, Node::with_content("b0", NodeContent::Bone(Bone::new())))
            .unwrap();

        let mut node = Node::with_content("b1", NodeContent::Bone(Bone::new()));
        node.set_location(Vector3::new(0.0, 1.0, 0.0));
        let b1 = scene.add_child(b0, node).unwrap();

        let mut mesh = Mesh::new(Some("skin"));
        mesh.set_vertex_count(3);
        mesh.set_vertex_unit_count(1);
        mesh.set_vertex_content(
            VertexContent::LOCATION | VertexContent::MATRIX_INDICES | VertexContent::WEIGHTS,
        );

        let locations = [(0.0, 1.0), (1.0, 1.0), (0.0, 2.0)];
        for (i, &(x, y)) in locations.iter().enumerate() {
            mesh.set_vertex_location_at(i, Point3::new(x, y, 0.0));
            mesh.set_vertex_matrix_index_at(i, 0, if i == 2 { 1 } else { 0 });
            mesh.set_vertex_weight_at(i, 0, 1.0);
        }

        let mut section = SkinSection::new(0, 3);
        section.add_bone(b0);
        section.add_bone(b1);

        let mut content = MeshNode::new(Rc::new(RefCell::new(mesh)), None);
        content.skin = Some(SkinMesh::with_sections(vec![section]));
        let skin = scene
            .add_child(body, Node::with_content("skin", NodeContent::Mesh(content)))
            .unwrap();

        scene.bind_rest_pose(body);
        Rig {
            scene,
            body,
            bones: [b0, b1],
            skin,
        }
    }

    #[test]
    fn bind_and_unbind() {
        let mut rig = rig();
        let y0 = rig.scene.deformed_vertex_location_at(rig.skin, 0, 0).unwrap().y;
        assert_ulps_eq!(y0, 1.0, epsilon = 1e-6);
        assert!(rig.scene[rig.skin].skin().unwrap().has_deformed_vertices());

        rig.scene[rig.bones[0]].set_rotation_axis_angle(Vector3::unit_z(), Deg(90.0));
        let p = rig.scene.deformed_vertex_location_at(rig.skin, 0, 0).unwrap();
        assert_ulps_eq!(p, Point3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);

        // The second bone is carried along by the first.
        let p = rig.scene.deformed_vertex_location_at(rig.skin, 2, 0).unwrap();
        assert_ulps_eq!(p, Point3::new(-2.0, 0.0, 0.0), epsilon = 1e-5);

        rig.scene[rig.bones[0]].set_rotation_axis_angle(Vector3::unit_z(), Deg(0.0));
        let p = rig.scene.deformed_vertex_location_at(rig.skin, 0, 0).unwrap();
        assert_ulps_eq!(p.y, y0, epsilon = 1e-5);
    }

    #[test]
    fn soft_body_moves_freely() {
        let mut rig = rig();
        rig.scene[rig.body].set_location(Vector3::new(5.0, 0.0, 0.0));
        let face = rig.scene.deformed_face_at(rig.skin, 0).unwrap();
        assert_ulps_eq!(face.vertices[1], Point3::new(1.0, 1.0, 0.0), epsilon = 1e-5);

        // At rest, every palette transform is the global transform of the skin.
        let sb = rig.scene.skinned_bone(rig.skin, rig.bones[1]).unwrap();
        assert_ulps_eq!(
            sb.draw_transform(),
            rig.scene.global_transform(rig.skin),
            epsilon = 1e-5
        );
    }

    #[test]
    fn soft_body_lookup() {
        let rig = rig();
        assert_eq!(rig.scene.soft_body_node(rig.bones[1]), Some(rig.body));
        assert_eq!(rig.scene.soft_body_node(rig.scene.root()), None);
        assert!(rig.scene.has_soft_body_content(rig.scene.root()));
        assert!(!rig.scene.has_soft_body_content(rig.bones[1]));
    }

    #[test]
    fn rigid_skeleton() {
        let mut rig = rig();
        assert!(!rig.scene.has_rigid_skeleton(rig.body));

        rig.scene[rig.bones[1]].set_uniform_scale(2.0);
        rig.scene.ensure_rigid_skeleton(rig.body);
        assert!(rig.scene[rig.bones[1]].is_unit_scale());
        assert!(rig.scene.has_rigid_skeleton(rig.body));

        rig.scene[rig.bones[0]].set_uniform_scale(3.0);
        assert!(!rig.scene.has_rigid_skeleton(rig.body));
    }

    #[test]
    fn bounding_volumes_last_call_wins() {
        let mut rig = rig();
        rig.scene.create_skinned_bounding_volumes(rig.body);
        match rig.scene[rig.skin].bounding_volume() {
            BoundingVolume::Sphere(_) => {}
            v => panic!("Unexpected bounding volume {:?}.", v),
        }

        let aabb = Aabb3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 3.0, 1.0));
        rig.scene
            .set_skeletal_bounding_volume(rig.bones[0], BoundingVolume::Box(aabb));
        assert!(rig.scene[rig.skin].bounding_volume().is_none());
        let (bv, _) = rig.scene.culling_volume(rig.skin);
        assert_eq!(bv.aabb(), Some(aabb));

        rig.scene.create_skinned_bounding_volumes(rig.body);
        let (bv, _) = rig.scene.culling_volume(rig.skin);
        match bv {
            BoundingVolume::Sphere(_) => {}
            v => panic!("Unexpected bounding volume {:?}.", v),
        }
    }

    #[test]
    fn reattach_to_copied_skeleton() {
        let mut rig = rig();
        let bones = rig.scene.copy_subtree(rig.bones[0], rig.body).unwrap();
        let n = rig.scene.reattach_bones_from(rig.skin, bones);
        assert_eq!(n, 2);

        let skin = rig.scene[rig.skin].skin().unwrap();
        assert_eq!(skin.sections()[0].bone_at(0), Some(bones));
        assert_ne!(skin.sections()[0].bone_at(1), Some(rig.bones[1]));
    }
}
