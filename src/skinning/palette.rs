//! Uploading bone transforms for drawing.
//!
//! The fixed-function pipeline loads one matrix per bone into the matrix palette of
//! `OES_matrix_palette`. The programmable pipeline uploads the same matrices as a
//! uniform array, or, for rigid skeletons, a rotation quaternion and a translation per
//! bone. The transforms are identical in both cases.

use smallvec::SmallVec;

use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::gles::Pipeline;
use crate::math::prelude::*;
use crate::scene::graph::Scene;
use crate::scene::node::NodeHandle;

use super::bone::SkinnedBone;

/// A way to hand the palette of a skin section to GL.
pub trait PaletteBackend {
    /// Switches vertex skinning on or off around the skinned draws of a node.
    fn set_enabled(&mut self, engine: &mut GLEngine, enabled: bool);

    /// Uploads the palette of one section, the view matrix times the draw transform of
    /// each bone, in the order of the bones of the section. Returns the number of bones
    /// uploaded. Bones past the platform limit are dropped.
    fn load(
        &mut self,
        engine: &mut GLEngine,
        view: &Matrix4<f32>,
        bones: &[SkinnedBone],
        rigid: bool,
    ) -> usize;
}

/// Loads palettes with `glCurrentPaletteMatrixOES` and `glLoadMatrixf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedPalette;

impl PaletteBackend for FixedPalette {
    fn set_enabled(&mut self, engine: &mut GLEngine, enabled: bool) {
        engine.enable(MATRIX_PALETTE_OES, enabled);
    }

    fn load(
        &mut self,
        engine: &mut GLEngine,
        view: &Matrix4<f32>,
        bones: &[SkinnedBone],
        _: bool,
    ) -> usize {
        let mut loaded = 0;
        for (i, v) in bones.iter().enumerate() {
            if !engine.load_palette_matrix(i as u32, &(view * v.draw_transform())) {
                break;
            }

            loaded += 1;
        }

        loaded
    }
}

/// Uploads palettes into uniform arrays of the bound program.
#[derive(Debug, Clone, Copy)]
pub struct UniformPalette {
    /// The location of a `mat4` array.
    pub matrices: GLint,
    /// The location of a `vec4` array that holds a rotation and a translation per bone.
    pub rigid: GLint,
}

impl Default for UniformPalette {
    fn default() -> Self {
        UniformPalette {
            matrices: 0,
            rigid: 1,
        }
    }
}

impl PaletteBackend for UniformPalette {
    fn set_enabled(&mut self, _: &mut GLEngine, _: bool) {}

    fn load(
        &mut self,
        engine: &mut GLEngine,
        view: &Matrix4<f32>,
        bones: &[SkinnedBone],
        rigid: bool,
    ) -> usize {
        let max = engine.max_palette_matrices() as usize;
        let n = bones.len().min(max);
        if n < bones.len() {
            info!(
                "Drops {} bones past the palette limit of {}.",
                bones.len() - n,
                max
            );
        }

        if rigid {
            let mut values = Vec::with_capacity(n * 8);
            for v in &bones[..n] {
                let m = view * v.draw_transform();
                let q = Quaternion::from(Matrix3::from_cols(
                    m.x.truncate(),
                    m.y.truncate(),
                    m.z.truncate(),
                ));

                values.extend_from_slice(&[q.v.x, q.v.y, q.v.z, q.s, m.w.x, m.w.y, m.w.z, 1.0]);
            }

            engine.uniform_vectors(self.rigid, &values);
        } else {
            let mut values = Vec::with_capacity(n * 16);
            for v in &bones[..n] {
                let m = view * v.draw_transform();
                let m: &[f32; 16] = m.as_ref();
                values.extend_from_slice(m);
            }

            engine.uniform_matrices(self.matrices, &values);
        }

        n
    }
}

/// The backend that matches the pipeline of an engine.
pub fn backend_for(pipeline: Pipeline) -> Box<dyn PaletteBackend> {
    match pipeline {
        Pipeline::FixedFunction => Box::new(FixedPalette),
        Pipeline::Programmable => Box::new(UniformPalette::default()),
    }
}

/// Draws the sections of the skin of `handle`, one call per section, after loading
/// its palette. The mesh must already be bound. Returns the number of sections drawn.
pub fn draw_skin_sections(
    scene: &Scene,
    engine: &mut GLEngine,
    backend: &mut dyn PaletteBackend,
    handle: NodeHandle,
    view: &Matrix4<f32>,
) -> usize {
    let mesh_node = match scene[handle].mesh_node() {
        Some(v) => v,
        None => return 0,
    };

    let (mesh, skin) = match (mesh_node.mesh.as_ref(), mesh_node.skin.as_ref()) {
        (Some(mesh), Some(skin)) => (mesh.borrow(), skin),
        _ => return 0,
    };

    backend.set_enabled(engine, true);
    for section in skin.sections() {
        let bones: SmallVec<[SkinnedBone; 8]> = section
            .bones()
            .iter()
            .filter_map(|&b| scene.skinned_bone(handle, b))
            .collect();

        backend.load(engine, view, &bones, skin.has_rigid_skeleton());
        mesh.draw_range(engine, section.vertex_start(), section.vertex_count());
    }

    backend.set_enabled(engine, false);
    skin.sections().len()
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::gles::EngineParams;
    use crate::mesh::mesh::Mesh;
    use crate::mesh::vertex_array::VertexContent;
    use crate::scene::node::{MeshNode, Node, NodeContent};
    use crate::skinning::bone::Bone;
    use crate::skinning::section::SkinSection;
    use crate::skinning::skin_mesh::SkinMesh;

    fn skinned(bones: usize) -> (Scene, NodeHandle) {
        let mut scene = Scene::new();
        let body = scene.add(Node::with_content("body", NodeContent::SoftBody));

        let mut section = SkinSection::new(0, 3);
        for i in 0..bones {
            let mut bone = Node::with_content(format!("bone{}", i), NodeContent::Bone(Bone::new()));
            bone.set_location(Vector3::new(i as f32, 0.0, 0.0));
            section.add_bone(scene.add_child(body, bone).unwrap());
        }

        let mut mesh = Mesh::new(Some("skin"));
        mesh.set_vertex_count(3);
        mesh.set_vertex_content(
            VertexContent::LOCATION | VertexContent::MATRIX_INDICES | VertexContent::WEIGHTS,
        );

        let mut content = MeshNode::new(Rc::new(RefCell::new(mesh)), None);
        content.skin = Some(SkinMesh::with_sections(vec![section]));
        let mut node = Node::with_content("skin", NodeContent::Mesh(content));
        node.set_location(Vector3::new(0.0, 0.0, -3.0));
        let skin = scene.add_child(body, node).unwrap();

        scene.bind_rest_pose(body);
        (scene, skin)
    }

    #[test]
    fn fixed_palette() {
        let (scene, skin) = skinned(2);
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let view = Matrix4::from_translation(Vector3::new(0.0, -1.0, 0.0));

        let mut backend = FixedPalette;
        assert_eq!(draw_skin_sections(&scene, &mut engine, &mut backend, skin, &view), 1);

        let expected = view * scene.global_transform(skin);
        for i in 0..2 {
            assert_ulps_eq!(probe.palette_matrix(i).unwrap(), expected, epsilon = 1e-5);
        }

        let draws = probe.draws();
        assert_eq!(draws.len(), 1);
        assert!(draws[0].palette_enabled);
        assert_eq!(draws[0].count, 3);
        assert_eq!(probe.is_enabled(MATRIX_PALETTE_OES), false);
    }

    #[test]
    fn fixed_palette_limit() {
        let (scene, skin) = skinned(12);
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let max = engine.max_palette_matrices() as usize;
        let bones: Vec<_> = scene[skin].skin().unwrap().sections()[0]
            .bones()
            .iter()
            .filter_map(|&b| scene.skinned_bone(skin, b))
            .collect();

        let n = FixedPalette.load(&mut engine, &Matrix4::identity(), &bones, false);
        assert_eq!(n, max.min(12));
    }

    #[test]
    fn uniform_palette() {
        let (mut scene, skin) = skinned(2);
        let params = EngineParams {
            pipeline: Pipeline::Programmable,
            ..EngineParams::default()
        };

        let (mut engine, probe) = GLEngine::headless(params);
        let mut backend = UniformPalette::default();
        draw_skin_sections(&scene, &mut engine, &mut backend, skin, &Matrix4::identity());
        assert_eq!(probe.uniform(backend.matrices).map(|v| v.len()), Some(32));

        let body = scene.soft_body_node(skin).unwrap();
        scene.ensure_rigid_skeleton(body);
        draw_skin_sections(&scene, &mut engine, &mut backend, skin, &Matrix4::identity());

        // Rest pose: identity rotations, translated to the skin.
        let v = probe.uniform(backend.rigid).unwrap();
        assert_eq!(v.len(), 16);
        assert_ulps_eq!(v[3], 1.0, epsilon = 1e-5);
        assert_ulps_eq!(v[6], -3.0, epsilon = 1e-5);
    }
}
