//! Cube-map environment capture.

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::*;
use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::identity::prelude::Shared;
use crate::identity::Identifiable;
use crate::materials::texture::{Texture, TextureKind};
use crate::math::prelude::{IntSize, Point3};
use crate::scene::camera::{cube_face_view, CameraView};

use super::attachment::{Attachment, Renderbuffer, TextureAttachment};
use super::framebuffer::{Framebuffer, RenderSurface};

/// Faces are counted in thousandths, so decimal rates refresh on an exact period.
const FACE_CREDIT_SCALE: u32 = 1000;

/// A cube texture that is rendered into from a point in the scene.
///
/// Each snapshot advances a counter by `faces_per_snapshot`, and renders as many whole
/// faces as the counter has accumulated, in +X, -X, +Y, -Y, +Z, -Z order. Values below
/// one spread the refresh of the cube over several snapshots.
///
/// The surface renders into the texture it belongs to, so its color attachment refers
/// to the texture weakly.
pub struct EnvironmentMap {
    texture: Shared<Texture>,
    attachment: Shared<TextureAttachment>,
    surface: Framebuffer,
    faces_per_snapshot: f32,
    credit_per_snapshot: u32,
    face_credit: u32,
    next_face: usize,
    near: f32,
    far: f32,
}

impl EnvironmentMap {
    /// Creates a cube texture with square faces of `side` pixels, with a depth buffer
    /// of `depth_format`.
    pub fn new(
        engine: &mut GLEngine,
        name: Option<&str>,
        side: i32,
        depth_format: GLenum,
    ) -> Result<Self> {
        let size = IntSize::new(side, side);
        let texture = Texture::render_target(engine, name, TextureKind::Cube, size, RGBA)?;
        let texture = Rc::new(RefCell::new(texture));

        let mut attachment = TextureAttachment::new(&texture);
        attachment.set_should_use_strong_reference_to_texture(false);
        let attachment = Rc::new(RefCell::new(attachment));

        let mut surface = Framebuffer::new(engine, name)?;
        surface.set_color_attachment(engine, Some(Attachment::Texture(attachment.clone())))?;

        let depth = Renderbuffer::with_size(engine, depth_format, 0, size)?;
        surface.set_depth_attachment(engine, Some(depth.into()))?;

        if !surface.validate(engine) {
            bail!("The surface of environment map {} is incomplete.", surface.describe());
        }

        Ok(EnvironmentMap {
            texture,
            attachment,
            surface,
            faces_per_snapshot: 1.0,
            credit_per_snapshot: FACE_CREDIT_SCALE,
            face_credit: 0,
            next_face: 0,
            near: 0.1,
            far: 1000.0,
        })
    }

    #[inline]
    pub fn texture(&self) -> &Shared<Texture> {
        &self.texture
    }

    #[inline]
    pub fn surface(&self) -> &Framebuffer {
        &self.surface
    }

    #[inline]
    pub fn faces_per_snapshot(&self) -> f32 {
        self.faces_per_snapshot
    }

    /// Sets how many faces each snapshot renders, clamped into 0 to 6. Fractions finer
    /// than a thousandth of a face are rounded.
    pub fn set_faces_per_snapshot(&mut self, v: f32) {
        self.faces_per_snapshot = v.max(0.0).min(6.0);
        let credit = self.faces_per_snapshot * FACE_CREDIT_SCALE as f32;
        self.credit_per_snapshot = credit.round() as u32;
    }

    /// The face the next rendered face will be.
    #[inline]
    pub fn next_face(&self) -> GLenum {
        TextureKind::Cube.faces()[self.next_face]
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        assert!(near > 0.0 && far > near, "Invalid clip planes {} and {}.", near, far);
        self.near = near;
        self.far = far;
    }

    /// Renders the faces due in this snapshot from `location`. `draw` renders the scene
    /// into the bound and cleared surface with the given view. Returns the faces that
    /// were rendered. The previously bound framebuffer and viewport are restored.
    pub fn generate_snapshot<F>(
        &mut self,
        engine: &mut GLEngine,
        location: Point3<f32>,
        mut draw: F,
    ) -> Result<Vec<GLenum>>
    where
        F: FnMut(&mut GLEngine, &CameraView),
    {
        self.face_credit += self.credit_per_snapshot;
        let count = (self.face_credit / FACE_CREDIT_SCALE) as usize;
        self.face_credit %= FACE_CREDIT_SCALE;

        if count == 0 {
            return Ok(Vec::new());
        }

        let prev_framebuffer = engine.framebuffer_binding();
        let prev_viewport = engine.viewport();

        let mut faces = Vec::with_capacity(count);
        let mut rsp = Ok(());
        for _ in 0..count {
            let face = self.next_face();
            self.next_face = (self.next_face + 1) % 6;

            if let Err(err) = self.render_face(engine, location, face, &mut draw) {
                rsp = Err(err);
                break;
            }

            faces.push(face);
        }

        engine.bind_framebuffer(prev_framebuffer);
        engine.set_viewport(prev_viewport);
        rsp?;

        trace!("Environment map {} renders {:?}.", self.surface.describe(), faces);
        Ok(faces)
    }

    fn render_face<F>(
        &mut self,
        engine: &mut GLEngine,
        location: Point3<f32>,
        face: GLenum,
        draw: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&mut GLEngine, &CameraView),
    {
        self.attachment.borrow_mut().set_face(face);
        self.surface.reattach(engine)?;
        self.surface.clear_color_and_depth_content(engine);

        let view = match cube_face_view(location, face, self.near, self.far) {
            Some(v) => v,
            None => bail!("{:#x} is not a cube map face.", face),
        };

        draw(engine, &view);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gles::EngineParams;

    #[test]
    fn duty_cycle() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let mut env = EnvironmentMap::new(&mut engine, Some("env"), 8, DEPTH_COMPONENT16).unwrap();
        env.set_faces_per_snapshot(0.25);

        let mut rendered = Vec::new();
        for _ in 0..24 {
            let faces = env
                .generate_snapshot(&mut engine, Point3::new(0.0, 0.0, 0.0), |_, _| {})
                .unwrap();
            rendered.extend(faces);
        }

        assert_eq!(rendered, TextureKind::Cube.faces().to_vec());
    }

    #[test]
    fn tenth_of_a_face_keeps_its_period() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let mut env = EnvironmentMap::new(&mut engine, None, 4, DEPTH_COMPONENT16).unwrap();
        env.set_faces_per_snapshot(0.1);

        let mut snapshots = Vec::new();
        for i in 1..=600 {
            let faces = env
                .generate_snapshot(&mut engine, Point3::new(0.0, 0.0, 0.0), |_, _| {})
                .unwrap();
            if !faces.is_empty() {
                assert_eq!(faces.len(), 1);
                snapshots.push(i);
            }
        }

        assert_eq!(snapshots, (1..=60).map(|n| n * 10).collect::<Vec<_>>());
    }

    #[test]
    fn whole_cube() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut env = EnvironmentMap::new(&mut engine, None, 4, DEPTH_COMPONENT16).unwrap();
        env.set_faces_per_snapshot(6.0);

        let mut draws = 0;
        let faces = env
            .generate_snapshot(&mut engine, Point3::new(0.0, 1.0, 0.0), |_, _| draws += 1)
            .unwrap();
        assert_eq!(faces.len(), 6);
        assert_eq!(draws, 6);
        assert_eq!(probe.framebuffer_binding(), 0);

        // The surface holds the texture weakly, so the cube is released with the map.
        let weak = Rc::downgrade(env.texture());
        drop(env);
        assert!(weak.upgrade().is_none());
    }
}
