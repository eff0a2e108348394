//! Color-buffer picking.
//!
//! The scene is drawn with every node in a solid color that encodes its tag, and the
//! pixel under the touch is read back and decoded. The background is cleared to
//! transparent black, which decodes to no node.

use crate::errors::*;
use crate::gles::engine::GLEngine;
use crate::identity::Tag;
use crate::math::prelude::*;
use crate::scene::camera::CameraView;
use crate::scene::graph::Scene;
use crate::scene::node::NodeHandle;
use crate::surfaces::framebuffer::RenderSurface;
use crate::surfaces::view::ViewSurfaceManager;

use super::drawing::{Decoration, DrawingVisitor};

/// Tags above this do not fit in the color channels and cannot be picked.
pub const MAX_PICKABLE_TAG: Tag = 0x00ff_ffff;

/// The opaque color a node with `tag` is painted in. Unpickable tags are painted like
/// the background.
pub fn color_from_tag(tag: Tag) -> Color4B {
    if tag == 0 || tag > MAX_PICKABLE_TAG {
        return Color4B::new(0, 0, 0, 0);
    }

    Color4B::new((tag >> 16) as u8, (tag >> 8) as u8, tag as u8, 255)
}

/// The tag painted into a pixel, if any.
pub fn tag_from_color(c: Color4B) -> Option<Tag> {
    if c.a == 0 {
        return None;
    }

    let tag = (Tag::from(c.r) << 16) | (Tag::from(c.g) << 8) | Tag::from(c.b);
    if tag == 0 {
        None
    } else {
        Some(tag)
    }
}

/// Picks the node drawn under a point of the view.
#[derive(Debug)]
pub struct PickingVisitor {
    drawing: DrawingVisitor,
    picked: Option<NodeHandle>,
}

impl PickingVisitor {
    pub fn new(engine: &GLEngine) -> Self {
        let mut drawing = DrawingVisitor::new(engine);
        drawing.set_decoration(Decoration::Tags);
        PickingVisitor {
            drawing,
            picked: None,
        }
    }

    /// The node found by the last pick.
    #[inline]
    pub fn picked_node(&self) -> Option<NodeHandle> {
        self.picked
    }

    #[inline]
    pub fn drawing(&self) -> &DrawingVisitor {
        &self.drawing
    }

    /// Draws the subtree of `root` into the picking surface, and returns the node under
    /// the pixel `(x, y)`, counted from the lower left corner.
    ///
    /// Unless the view surface manager keeps a dedicated picking surface, the color
    /// of the view is overwritten, so the scene must be drawn after picking. The bound
    /// framebuffer, viewport and clear color are restored. The engine is opened for
    /// the pick if it is not already.
    pub fn pick_node_at(
        &mut self,
        scene: &Scene,
        engine: &mut GLEngine,
        surfaces: &mut ViewSurfaceManager,
        view: &CameraView,
        root: NodeHandle,
        x: i32,
        y: i32,
    ) -> Result<Option<NodeHandle>> {
        let was_open = engine.is_open();
        if !was_open {
            engine.open();
        }

        let prev_framebuffer = engine.framebuffer_binding();
        let prev_viewport = engine.viewport();
        let prev_clear_color = engine.state().clear_color.value();

        let rsp = self.render_and_read(scene, engine, surfaces, view, root, x, y);

        engine.bind_framebuffer(prev_framebuffer);
        engine.set_viewport(prev_viewport);
        engine.set_clear_color(prev_clear_color);
        if !was_open {
            engine.close();
        }

        self.picked = rsp?.and_then(|tag| scene.find_by_tag(root, tag));
        debug!("Picks {:?} at ({}, {}).", self.picked, x, y);
        Ok(self.picked)
    }

    fn render_and_read(
        &mut self,
        scene: &Scene,
        engine: &mut GLEngine,
        surfaces: &mut ViewSurfaceManager,
        view: &CameraView,
        root: NodeHandle,
        x: i32,
        y: i32,
    ) -> Result<Option<Tag>> {
        let surface = surfaces.picking_surface(engine)?;
        let surface = surface.borrow();

        engine.set_clear_color(Color4F::transparent());
        surface.clear_color_and_depth_content(engine);
        self.drawing.visit(scene, engine, view, root);

        let pixels = surface.read_pixels(engine, Viewport::new(x, y, 1, 1))?;
        Ok(pixels.first().and_then(|&c| tag_from_color(c)))
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::gles::EngineParams;
    use crate::identity::Identifiable;
    use crate::mesh::mesh::Mesh;
    use crate::scene::node::{MeshNode, Node, NodeContent};
    use crate::surfaces::view::ViewSurfaceParams;

    #[test]
    fn tag_colors() {
        assert_eq!(color_from_tag(0x12_3456), Color4B::new(0x12, 0x34, 0x56, 255));
        assert_eq!(tag_from_color(Color4B::new(0x12, 0x34, 0x56, 255)), Some(0x12_3456));
        assert_eq!(color_from_tag(0), Color4B::new(0, 0, 0, 0));
        assert_eq!(color_from_tag(MAX_PICKABLE_TAG + 1), Color4B::new(0, 0, 0, 0));
        assert_eq!(tag_from_color(Color4B::new(0, 0, 0, 0)), None);
        assert_eq!(tag_from_color(Color4B::new(0, 0, 0, 255)), None);
    }

    #[test]
    fn pick() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let params = ViewSurfaceParams {
            size: IntSize::new(64, 64),
            ..ViewSurfaceParams::default()
        };
        let mut surfaces = ViewSurfaceManager::new(&mut engine, params).unwrap();

        // Covers the left half of the view.
        let mut mesh = Mesh::new(Some("left"));
        mesh.populate_as_rectangle(Vector2::new(1.0, 2.0), Vector2::new(1.0, 0.5), (1, 1));
        let content = MeshNode::new(Rc::new(RefCell::new(mesh)), None);
        let mut node = Node::with_content("left", NodeContent::Mesh(content));
        node.set_location(Vector3::new(0.0, 0.0, -1.0));

        let mut scene = Scene::new();
        let left = scene.add(node);
        let root = scene.root();

        let view = CameraView::new(
            Matrix4::identity(),
            Projection::ortho(2.0, 2.0, 0.1, 10.0).to_matrix(),
        );

        let mut picking = PickingVisitor::new(&engine);
        let picked = picking
            .pick_node_at(&scene, &mut engine, &mut surfaces, &view, root, 10, 32)
            .unwrap();
        assert_eq!(picked, Some(left));
        assert_eq!(picking.picked_node(), Some(left));
        assert_eq!(probe.draws()[0].color, Color4F::from(color_from_tag(scene[left].tag())));

        let picked = picking
            .pick_node_at(&scene, &mut engine, &mut surfaces, &view, root, 50, 32)
            .unwrap();
        assert_eq!(picked, None);
        assert!(!engine.is_open());
        assert_eq!(engine.framebuffer_binding(), 0);
    }

    #[test]
    fn dedicated_surface() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let params = ViewSurfaceParams {
            size: IntSize::new(64, 64),
            should_use_dedicated_picking_surface: true,
            ..ViewSurfaceParams::default()
        };
        let mut surfaces = ViewSurfaceManager::new(&mut engine, params).unwrap();

        let mut mesh = Mesh::new(Some("all"));
        mesh.populate_as_centered_rectangle(Vector2::new(2.0, 2.0), (1, 1));
        let content = MeshNode::new(Rc::new(RefCell::new(mesh)), None);
        let mut node = Node::with_content("all", NodeContent::Mesh(content));
        node.set_location(Vector3::new(0.0, 0.0, -1.0));

        let mut scene = Scene::new();
        let all = scene.add(node);
        let root = scene.root();

        let view = CameraView::new(
            Matrix4::identity(),
            Projection::ortho(2.0, 2.0, 0.1, 10.0).to_matrix(),
        );

        let mut picking = PickingVisitor::new(&engine);
        let picked = picking
            .pick_node_at(&scene, &mut engine, &mut surfaces, &view, root, 32, 32)
            .unwrap();
        assert_eq!(picked, Some(all));

        // The window itself is left untouched.
        assert_eq!(probe.window().pixel(32, 32), Some(Color4B::new(0, 0, 0, 0)));
        assert_ne!(probe.draws()[0].framebuffer, 0);
    }
}
