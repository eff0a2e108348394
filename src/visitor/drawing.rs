use std::fmt;

use smallvec::SmallVec;

use crate::errors::*;
use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::identity::{Identifiable, Tag};
use crate::materials::material::Material;
use crate::math::prelude::*;
use crate::mesh::mesh::Mesh;
use crate::particles::MeshParticleEmitter;
use crate::scene::camera::CameraView;
use crate::scene::graph::Scene;
use crate::scene::node::{MeshNode, NodeContent, NodeHandle};
use crate::skinning::palette::{backend_for, draw_skin_sections, PaletteBackend};
use crate::surfaces::env_map::EnvironmentMap;

use super::picking::color_from_tag;
use super::switching::SwitchCache;

/// What happened during the last visit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VisitStats {
    /// Visible nodes with something to draw.
    pub visited: usize,
    pub drawn: usize,
    /// Nodes whose bounding volume is outside the frustum.
    pub culled: usize,
}

/// How drawn nodes are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    /// With their materials, textures and vertex colors.
    Decorated,
    /// In a solid color that encodes the tag of the node.
    Tags,
}

/// Draws a scene graph, depth first, binding state through the engine only when it
/// changes from one node to the next.
///
/// Hidden nodes are skipped along with their descendants. Drawable nodes outside the
/// camera frustum are culled.
pub struct DrawingVisitor {
    switching: SwitchCache,
    palette: Box<dyn PaletteBackend>,
    decoration: Decoration,
    should_cull: bool,
    stats: VisitStats,
}

impl fmt::Debug for DrawingVisitor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DrawingVisitor")
            .field("switching", &self.switching)
            .field("decoration", &self.decoration)
            .field("should_cull", &self.should_cull)
            .field("stats", &self.stats)
            .finish()
    }
}

impl DrawingVisitor {
    /// A visitor that loads skin palettes the way the pipeline of `engine` expects.
    pub fn new(engine: &GLEngine) -> Self {
        DrawingVisitor::with_palette(backend_for(engine.pipeline()))
    }

    pub fn with_palette(palette: Box<dyn PaletteBackend>) -> Self {
        DrawingVisitor {
            switching: SwitchCache::new(),
            palette,
            decoration: Decoration::Decorated,
            should_cull: true,
            stats: VisitStats::default(),
        }
    }

    #[inline]
    pub fn switching(&self) -> &SwitchCache {
        &self.switching
    }

    #[inline]
    pub fn stats(&self) -> VisitStats {
        self.stats
    }

    #[inline]
    pub fn decoration(&self) -> Decoration {
        self.decoration
    }

    pub fn set_decoration(&mut self, decoration: Decoration) {
        self.decoration = decoration;
    }

    #[inline]
    pub fn should_cull(&self) -> bool {
        self.should_cull
    }

    pub fn set_should_cull(&mut self, cull: bool) {
        self.should_cull = cull;
    }

    /// Draws one frame of the whole scene from the camera node `camera`, bracketed by
    /// `open` and `close` of the engine.
    pub fn draw_scene(
        &mut self,
        scene: &mut Scene,
        engine: &mut GLEngine,
        camera: NodeHandle,
    ) -> Result<VisitStats> {
        let view = match scene.node(camera).and_then(|v| v.camera()) {
            Some(v) => v.view_from(&scene.global_transform(camera)),
            None => bail!("Node {} is not a camera in the scene.", camera),
        };

        let root = scene.root();
        engine.open();
        self.prepare(scene, engine, &view, root);
        let stats = self.visit(scene, engine, &view, root);
        engine.close();

        debug!(
            "Draws {} of {} nodes, culls {}.",
            stats.drawn, stats.visited, stats.culled
        );

        Ok(stats)
    }

    /// Brings the content of the subtree of `root` up to date before it is drawn.
    /// Particles of emitters are transformed into their combined meshes, and the GL
    /// buffers of those meshes refreshed. Returns the number of particles transformed.
    pub fn prepare(
        &mut self,
        scene: &mut Scene,
        engine: &mut GLEngine,
        view: &CameraView,
        root: NodeHandle,
    ) -> usize {
        let emitters: Vec<_> = visible_subtree(scene, root)
            .into_iter()
            .filter(|&v| scene[v].emitter().is_some())
            .collect();

        let mut n = 0;
        for v in emitters {
            let global = scene.global_transform(v);
            if let Some(emitter) = scene[v].emitter_mut() {
                let in_view = emitter
                    .bounding_volume()
                    .does_intersect_frustum(&global, &view.frustum);

                n += emitter.transform_particles(in_view);
                emitter.mesh_mut().update_gl_buffers(engine);
            }
        }

        n
    }

    /// Draws the subtree of `root` with `view`. The engine must be open.
    pub fn visit(
        &mut self,
        scene: &Scene,
        engine: &mut GLEngine,
        view: &CameraView,
        root: NodeHandle,
    ) -> VisitStats {
        self.stats = VisitStats::default();
        self.switching.reset_switching();
        engine.load_projection_matrix(&view.projection);

        for v in visible_subtree(scene, root) {
            self.visit_node(scene, engine, view, v);
        }

        self.stats
    }

    /// Renders the faces of `map` due in this snapshot, seen from `location`. Call it
    /// before the scene itself is drawn, since it leaves the projection of the map
    /// loaded.
    pub fn draw_environment_map(
        &mut self,
        scene: &Scene,
        engine: &mut GLEngine,
        map: &mut EnvironmentMap,
        location: Point3<f32>,
        root: NodeHandle,
    ) -> Result<Vec<GLenum>> {
        map.generate_snapshot(engine, location, |engine, view| {
            self.visit(scene, engine, view, root);
        })
    }

    fn visit_node(
        &mut self,
        scene: &Scene,
        engine: &mut GLEngine,
        view: &CameraView,
        handle: NodeHandle,
    ) {
        let node = &scene[handle];
        if !node.content().is_drawable() {
            return;
        }

        self.stats.visited += 1;
        if self.should_cull && !is_in_view(scene, &view.frustum, handle) {
            trace!("Culls {}.", node.describe());
            self.stats.culled += 1;
            return;
        }

        engine.load_modelview_matrix(&(view.view * scene.global_transform(handle)));

        let drawn = match *node.content() {
            NodeContent::Mesh(ref v) => self.draw_mesh_node(scene, engine, view, handle, v),
            NodeContent::Emitter(ref v) => self.draw_emitter(engine, node.tag(), v),
            _ => false,
        };

        if drawn {
            self.stats.drawn += 1;
        }
    }

    fn draw_mesh_node(
        &mut self,
        scene: &Scene,
        engine: &mut GLEngine,
        view: &CameraView,
        handle: NodeHandle,
        content: &MeshNode,
    ) -> bool {
        let mesh = match content.mesh {
            Some(ref v) => v.borrow(),
            None => return false,
        };

        let material = content.material.as_ref().map(|v| v.borrow());
        let units = self.decorate(
            engine,
            scene[handle].tag(),
            material.as_ref().map(|v| &**v),
            content.pure_color,
        );

        self.bind_mesh(engine, &mesh, units);
        if content.is_skinned() {
            draw_skin_sections(scene, engine, &mut *self.palette, handle, &view.view);
        } else {
            mesh.draw(engine);
        }

        true
    }

    fn draw_emitter(&mut self, engine: &mut GLEngine, tag: Tag, emitter: &MeshParticleEmitter) -> bool {
        if emitter.particle_count() == 0 {
            return false;
        }

        let material = emitter.material().map(|v| v.borrow());
        let units = self.decorate(
            engine,
            tag,
            material.as_ref().map(|v| &**v),
            Color4F::white(),
        );

        self.bind_mesh(engine, emitter.mesh(), units);
        emitter.draw(engine);
        true
    }

    /// Applies the coloring of a node. Returns the number of texture units its mesh
    /// should bind coordinates for.
    fn decorate(
        &mut self,
        engine: &mut GLEngine,
        tag: Tag,
        material: Option<&Material>,
        pure_color: Color4F,
    ) -> usize {
        match (self.decoration, material) {
            (Decoration::Decorated, Some(material)) => {
                if self.switching.switch_material(Some(material.tag())) {
                    material.bind(engine);
                }

                material.texture_unit_count()
            }
            (Decoration::Decorated, None) => {
                if self.switching.switch_material(None) {
                    Material::unbind(engine);
                }

                engine.set_color(pure_color);
                0
            }
            (Decoration::Tags, _) => {
                if self.switching.switch_material(None) {
                    Material::unbind(engine);
                    engine.enable(FOG, false);
                    engine.enable(DITHER, false);
                }

                engine.set_color(color_from_tag(tag).into());
                0
            }
        }
    }

    fn bind_mesh(&mut self, engine: &mut GLEngine, mesh: &Mesh, units: usize) {
        if self.switching.switch_mesh(mesh.tag(), units) {
            mesh.bind(engine, units);
            if self.decoration == Decoration::Tags {
                engine.enable_client_array(COLOR_ARRAY, false);
            }
        }
    }
}

/// The visible nodes in the subtree of `root`, depth first. Hidden nodes hide their
/// descendants.
pub fn visible_subtree(scene: &Scene, root: NodeHandle) -> Vec<NodeHandle> {
    let mut nodes = Vec::new();
    let mut stack = vec![root];
    while let Some(v) = stack.pop() {
        match scene.node(v) {
            Some(node) if node.is_visible() => nodes.push(v),
            _ => continue,
        }

        let children: SmallVec<[NodeHandle; 8]> = scene.children(v).collect();
        stack.extend(children.iter().rev().cloned());
    }

    nodes
}

fn is_in_view(scene: &Scene, frustum: &Frustum, handle: NodeHandle) -> bool {
    match scene[handle].emitter() {
        Some(emitter) => emitter
            .bounding_volume()
            .does_intersect_frustum(&scene.global_transform(handle), frustum),
        None => {
            let (volume, m) = scene.culling_volume(handle);
            volume.does_intersect_frustum(&m, frustum)
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::gles::EngineParams;
    use crate::identity::Shared;
    use crate::particles::EmitterParams;
    use crate::scene::bounding::BoundingVolume;
    use crate::scene::camera::Camera;
    use crate::scene::node::Node;

    fn quad() -> Shared<Mesh> {
        let mut mesh = Mesh::new(Some("quad"));
        mesh.populate_as_centered_rectangle(Vector2::new(1.0, 1.0), (1, 1));
        Rc::new(RefCell::new(mesh))
    }

    fn mesh_node(name: &str, mesh: &Shared<Mesh>, material: Option<&Shared<Material>>) -> Node {
        let content = MeshNode::new(mesh.clone(), material.cloned());
        let mut node = Node::with_content(name, NodeContent::Mesh(content));
        node.set_location(Vector3::new(0.0, 0.0, -1.0));
        node
    }

    fn view() -> CameraView {
        CameraView::new(
            Matrix4::identity(),
            Projection::ortho(2.0, 2.0, 0.1, 10.0).to_matrix(),
        )
    }

    #[test]
    fn shares_binds() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let (a, b) = (quad(), quad());
        let material = Rc::new(RefCell::new(Material::new(Some("shared"))));

        let mut scene = Scene::new();
        scene.add(mesh_node("a0", &a, Some(&material)));
        scene.add(mesh_node("a1", &a, Some(&material)));
        scene.add(mesh_node("a2", &a, Some(&material)));
        scene.add(mesh_node("b", &b, None));

        let mut visitor = DrawingVisitor::new(&engine);
        engine.open();
        let root = scene.root();
        let stats = visitor.visit(&scene, &mut engine, &view(), root);
        engine.close();

        assert_eq!(stats.drawn, 4);
        assert_eq!(probe.draws().len(), 4);
        assert_eq!(visitor.switching().mesh_binds(), 2);
        assert_eq!(visitor.switching().material_binds(), 2);
    }

    #[test]
    fn pure_color() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut node = mesh_node("red", &quad(), None);
        if let Some(v) = node.mesh_node_mut() {
            v.pure_color = Color4F::new(1.0, 0.0, 0.0, 1.0);
        }

        let mut scene = Scene::new();
        scene.add(node);

        let mut visitor = DrawingVisitor::new(&engine);
        engine.open();
        let root = scene.root();
        visitor.visit(&scene, &mut engine, &view(), root);
        engine.close();

        assert_eq!(probe.draws()[0].color, Color4F::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn culls_outside_frustum() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mesh = quad();
        let bounds = Aabb3::new(Point3::new(-0.5, -0.5, -0.1), Point3::new(0.5, 0.5, 0.1));

        let mut scene = Scene::new();
        let mut near = mesh_node("near", &mesh, None);
        near.set_bounding_volume(BoundingVolume::Box(bounds));
        scene.add(near);

        let mut far = mesh_node("far", &mesh, None);
        far.set_location(Vector3::new(100.0, 0.0, -1.0));
        far.set_bounding_volume(BoundingVolume::Box(bounds));
        scene.add(far);

        let mut visitor = DrawingVisitor::new(&engine);
        engine.open();
        let root = scene.root();
        let stats = visitor.visit(&scene, &mut engine, &view(), root);

        assert_eq!(stats.visited, 2);
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.culled, 1);
        assert_eq!(probe.draws().len(), 1);

        visitor.set_should_cull(false);
        let stats = visitor.visit(&scene, &mut engine, &view(), root);
        engine.close();
        assert_eq!(stats.drawn, 2);
    }

    #[test]
    fn hidden_subtrees() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mesh = quad();

        let mut scene = Scene::new();
        let parent = scene.add(mesh_node("parent", &mesh, None));
        scene
            .add_child(parent, mesh_node("child", &mesh, None))
            .unwrap();
        scene.add(mesh_node("sibling", &mesh, None));
        scene[parent].set_is_visible(false);

        let root = scene.root();
        assert_eq!(visible_subtree(&scene, root).len(), 2);

        let mut visitor = DrawingVisitor::new(&engine);
        engine.open();
        let stats = visitor.visit(&scene, &mut engine, &view(), root);
        engine.close();

        assert_eq!(stats.drawn, 1);
        assert_eq!(probe.draws().len(), 1);
    }

    #[test]
    fn draw_scene_from_camera() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());

        let mut scene = Scene::new();
        let camera = scene.add(Node::with_content(
            "camera",
            NodeContent::Camera(Camera::ortho(2.0, 2.0, 0.1, 10.0)),
        ));
        let plain = scene.add(Node::named("plain"));
        scene.add(mesh_node("quad", &quad(), None));

        let mut visitor = DrawingVisitor::new(&engine);
        let stats = visitor.draw_scene(&mut scene, &mut engine, camera).unwrap();
        assert_eq!(stats.drawn, 1);
        assert_eq!(engine.frames(), 1);
        assert!(!engine.is_open());
        assert_eq!(probe.draws().len(), 1);

        assert!(visitor.draw_scene(&mut scene, &mut engine, plain).is_err());
    }

    #[test]
    fn draws_emitters_once() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());

        let mut emitter = MeshParticleEmitter::new(EmitterParams::default());
        emitter.set_particle_template_mesh(Some(quad()));
        emitter.emit_particles(3);

        let mut scene = Scene::new();
        let camera = scene.add(Node::with_content(
            "camera",
            NodeContent::Camera(Camera::ortho(2.0, 2.0, 0.1, 10.0)),
        ));
        let h = scene.add(Node::with_content(
            "sparks",
            NodeContent::Emitter(Box::new(emitter)),
        ));
        scene[h].set_location(Vector3::new(0.0, 0.0, -1.0));

        let mut visitor = DrawingVisitor::new(&engine);
        let stats = visitor.draw_scene(&mut scene, &mut engine, camera).unwrap();
        assert_eq!(stats.drawn, 1);

        let draws = probe.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].count, 18);

        let emitter = scene[h].emitter().unwrap();
        assert!(!emitter.is_particle_transform_dirty());
        assert!(emitter.bounding_box().is_some());
    }

    #[test]
    fn environment_map() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut map = EnvironmentMap::new(&mut engine, Some("env"), 8, DEPTH_COMPONENT16).unwrap();
        map.set_faces_per_snapshot(2.0);

        let mut scene = Scene::new();
        scene.add(mesh_node("quad", &quad(), None));

        let mut visitor = DrawingVisitor::new(&engine);
        engine.open();
        let root = scene.root();
        let faces = visitor
            .draw_environment_map(&scene, &mut engine, &mut map, Point3::new(0.0, 0.0, 0.0), root)
            .unwrap();
        engine.close();

        assert_eq!(faces, vec![TEXTURE_CUBE_MAP_POSITIVE_X, TEXTURE_CUBE_MAP_NEGATIVE_X]);
        assert!(probe.draws().iter().all(|v| v.framebuffer == map.surface().id()));
    }
}
