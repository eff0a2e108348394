//! Framebuffers and the render surface contract.

use crate::errors::*;
use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::gles::release::{self, ContextId, GLObject};
use crate::identity::prelude::Shared;
use crate::identity::{Identifiable, Identity};
use crate::materials::texture::Texture;
use crate::math::prelude::{Color4B, Color4F, IntSize, Viewport};

use super::attachment::Attachment;

/// Something that can be rendered into.
pub trait RenderSurface {
    fn size(&self) -> IntSize;

    /// Binds the surface and points the viewport at the whole of it.
    fn activate(&self, engine: &mut GLEngine);

    /// Clears the buffers in `mask` of the surface.
    fn clear(&self, engine: &mut GLEngine, mask: GLbitfield);

    fn clear_color_content(&self, engine: &mut GLEngine) {
        self.clear(engine, COLOR_BUFFER_BIT);
    }

    fn clear_depth_content(&self, engine: &mut GLEngine) {
        self.clear(engine, DEPTH_BUFFER_BIT);
    }

    fn clear_stencil_content(&self, engine: &mut GLEngine) {
        self.clear(engine, STENCIL_BUFFER_BIT);
    }

    fn clear_color_and_depth_content(&self, engine: &mut GLEngine) {
        self.clear(engine, COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT);
    }

    /// Reads RGBA pixels of `rect`. The surface is activated for the duration of the
    /// read, and the previously bound surface is restored afterwards.
    fn read_pixels(&self, engine: &mut GLEngine, rect: Viewport) -> Result<Vec<Color4B>>;

    /// Overwrites RGBA pixels of `rect`.
    fn replace_pixels(
        &self,
        engine: &mut GLEngine,
        rect: Viewport,
        pixels: &[Color4B],
    ) -> Result<()>;

    /// Returns true if the surface can be rendered into. Failures are logged.
    fn validate(&self, engine: &mut GLEngine) -> bool;
}

/// A framebuffer with color, depth and stencil slots.
///
/// The system framebuffer is the one the platform window renders into. It is wrapped
/// rather than created, and is never deleted.
#[derive(Debug)]
pub struct Framebuffer {
    identity: Identity,
    context: ContextId,
    id: GLuint,
    is_system: bool,
    size: IntSize,
    color: Option<Attachment>,
    depth: Option<Attachment>,
    stencil: Option<Attachment>,
}

impl Identifiable for Framebuffer {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if !self.is_system {
            release::release(self.context, GLObject::Framebuffer(self.id));
        }
    }
}

impl Framebuffer {
    pub fn new<T: AsRef<str>>(engine: &mut GLEngine, name: Option<T>) -> Result<Self> {
        let id = engine.create_framebuffer()?;
        trace!("Creates framebuffer {}.", id);
        Ok(Framebuffer {
            identity: Identity::new(name),
            context: engine.context(),
            id,
            is_system: false,
            size: IntSize::new(0, 0),
            color: None,
            depth: None,
            stencil: None,
        })
    }

    /// Wraps the framebuffer bound when the call is made, which is the one of the
    /// platform window.
    pub fn system(engine: &mut GLEngine, size: IntSize) -> Self {
        let id = engine.framebuffer_binding();
        Framebuffer {
            identity: Identity::named("System"),
            context: engine.context(),
            id,
            is_system: true,
            size,
            color: None,
            depth: None,
            stencil: None,
        }
    }

    #[inline]
    pub fn id(&self) -> GLuint {
        self.id
    }

    #[inline]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    #[inline]
    pub fn color_attachment(&self) -> Option<&Attachment> {
        self.color.as_ref()
    }

    #[inline]
    pub fn depth_attachment(&self) -> Option<&Attachment> {
        self.depth.as_ref()
    }

    #[inline]
    pub fn stencil_attachment(&self) -> Option<&Attachment> {
        self.stencil.as_ref()
    }

    /// The texture of the color attachment, if the surface renders into a texture.
    pub fn color_texture(&self) -> Option<Shared<Texture>> {
        self.color.as_ref().and_then(|v| v.texture())
    }

    /// The texture of the depth attachment, if the depth is rendered into a texture.
    pub fn depth_texture(&self) -> Option<Shared<Texture>> {
        self.depth.as_ref().and_then(|v| v.texture())
    }

    pub fn set_color_attachment(
        &mut self,
        engine: &mut GLEngine,
        v: Option<Attachment>,
    ) -> Result<()> {
        self.bind_slot(engine, COLOR_ATTACHMENT0, v.as_ref())?;
        self.color = v;
        Ok(())
    }

    pub fn set_depth_attachment(
        &mut self,
        engine: &mut GLEngine,
        v: Option<Attachment>,
    ) -> Result<()> {
        self.bind_slot(engine, DEPTH_ATTACHMENT, v.as_ref())?;
        self.depth = v;
        Ok(())
    }

    pub fn set_stencil_attachment(
        &mut self,
        engine: &mut GLEngine,
        v: Option<Attachment>,
    ) -> Result<()> {
        self.bind_slot(engine, STENCIL_ATTACHMENT, v.as_ref())?;
        self.stencil = v;
        Ok(())
    }

    fn bind_slot(
        &mut self,
        engine: &mut GLEngine,
        slot: GLenum,
        v: Option<&Attachment>,
    ) -> Result<()> {
        if self.is_system {
            bail!("Can not change attachments of the system framebuffer.");
        }

        match v {
            Some(v) => {
                v.attach(engine, self.id, slot)?;
                if !v.size().is_zero() {
                    self.size = v.size();
                }
            }
            None => Attachment::detach(engine, self.id, slot)?,
        }

        Ok(())
    }

    /// Re-attaches every attachment. Texture attachments re-read their face and level.
    pub fn reattach(&self, engine: &mut GLEngine) -> Result<()> {
        let slots = [
            (COLOR_ATTACHMENT0, &self.color),
            (DEPTH_ATTACHMENT, &self.depth),
            (STENCIL_ATTACHMENT, &self.stencil),
        ];

        for (slot, v) in slots.iter() {
            if let Some(v) = v {
                v.attach(engine, self.id, *slot)?;
            }
        }

        Ok(())
    }

    /// Resizes every attachment. Attachments shared with other surfaces are resized for
    /// them too.
    pub fn resize_to(&mut self, engine: &mut GLEngine, size: IntSize) -> Result<()> {
        if size == self.size {
            return Ok(());
        }

        for v in [&self.color, &self.depth, &self.stencil].iter() {
            if let Some(v) = v {
                v.resize_to(engine, size)?;
            }
        }

        self.size = size;
        if !self.is_system {
            self.reattach(engine)?;
        }

        Ok(())
    }

    /// The attachment slots that hold something.
    pub fn attached_slots(&self) -> Vec<GLenum> {
        let mut slots = Vec::new();
        if self.color.is_some() {
            slots.push(COLOR_ATTACHMENT0);
        }

        if self.depth.is_some() {
            slots.push(DEPTH_ATTACHMENT);
        }

        if self.stencil.is_some() {
            slots.push(STENCIL_ATTACHMENT);
        }

        slots
    }
}

impl RenderSurface for Framebuffer {
    #[inline]
    fn size(&self) -> IntSize {
        self.size
    }

    fn activate(&self, engine: &mut GLEngine) {
        engine.bind_framebuffer(self.id);
        engine.set_viewport(Viewport::from_size(self.size));
    }

    fn clear(&self, engine: &mut GLEngine, mask: GLbitfield) {
        self.activate(engine);
        if mask & DEPTH_BUFFER_BIT != 0 {
            engine.set_depth_mask(true);
        }

        engine.clear(mask);
    }

    fn read_pixels(&self, engine: &mut GLEngine, rect: Viewport) -> Result<Vec<Color4B>> {
        let prev = engine.framebuffer_binding();
        engine.bind_framebuffer(self.id);

        let mut bytes = vec![0; rect.area() * 4];
        let rsp = engine.read_pixels(rect, &mut bytes);
        engine.bind_framebuffer(prev);
        rsp?;

        Ok(bytes
            .chunks(4)
            .map(|v| Color4B::new(v[0], v[1], v[2], v[3]))
            .collect())
    }

    fn replace_pixels(
        &self,
        engine: &mut GLEngine,
        rect: Viewport,
        pixels: &[Color4B],
    ) -> Result<()> {
        let attachment = match self.color {
            Some(Attachment::Texture(ref v)) => v.borrow().clone(),
            _ => bail!(
                "Framebuffer {} has no color texture whose pixels can be replaced.",
                self.describe()
            ),
        };

        let texture = match attachment.texture() {
            Some(v) => v,
            None => bail!("The color texture of {} has been dropped.", self.describe()),
        };

        let rsp = texture
            .borrow_mut()
            .replace_pixels(engine, attachment.face(), rect, pixels);
        rsp
    }

    fn validate(&self, engine: &mut GLEngine) -> bool {
        if self.is_system {
            return true;
        }

        let prev = engine.framebuffer_binding();
        let valid = engine.check_framebuffer(self.id);
        engine.bind_framebuffer(prev);

        if valid {
            debug!("Framebuffer {} of {:?} is complete.", self.describe(), self.size);
        }

        valid
    }
}

/// Fills the color of a surface with a solid color, leaving the clear color of the
/// engine as it was.
pub fn fill_color(engine: &mut GLEngine, surface: &dyn RenderSurface, color: Color4F) {
    let prev = engine.state().clear_color.value();
    engine.set_clear_color(color);
    surface.clear_color_content(engine);
    engine.set_clear_color(prev);
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::super::attachment::{Renderbuffer, TextureAttachment};
    use super::*;
    use crate::gles::EngineParams;
    use crate::materials::texture::TextureKind;

    #[test]
    fn offscreen_surface() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let system = Framebuffer::system(&mut engine, IntSize::new(64, 64));
        let mut fb = Framebuffer::new(&mut engine, Some("offscreen")).unwrap();
        assert!(!fb.validate(&mut engine));

        let color = Renderbuffer::with_size(&mut engine, RGBA8, 0, IntSize::new(8, 8)).unwrap();
        let depth = Renderbuffer::with_size(&mut engine, DEPTH_COMPONENT16, 0, IntSize::new(8, 8))
            .unwrap();
        fb.set_color_attachment(&mut engine, Some(color.into())).unwrap();
        fb.set_depth_attachment(&mut engine, Some(depth.into())).unwrap();
        assert_eq!(fb.size(), IntSize::new(8, 8));
        assert!(fb.validate(&mut engine));
        assert!(fb.color_texture().is_none());

        fill_color(&mut engine, &fb, Color4F::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(probe.framebuffer_binding(), fb.id());

        system.activate(&mut engine);

        let pixels = fb.read_pixels(&mut engine, Viewport::new(2, 2, 2, 1)).unwrap();
        assert_eq!(pixels, vec![Color4B::new(0, 255, 0, 255); 2]);
        assert_eq!(probe.framebuffer_binding(), 0);
        assert!(fb.replace_pixels(&mut engine, Viewport::new(0, 0, 1, 1), &pixels).is_err());
    }

    #[test]
    fn texture_surface() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let texture = Texture::render_target(
            &mut engine,
            None,
            TextureKind::Texture2D,
            IntSize::new(4, 4),
            RGBA,
        )
        .unwrap();
        let texture = Rc::new(RefCell::new(texture));

        let mut fb = Framebuffer::new(&mut engine, None::<&str>).unwrap();
        fb.set_color_attachment(&mut engine, Some(TextureAttachment::new(&texture).into()))
            .unwrap();
        assert!(fb.validate(&mut engine));
        assert!(Rc::ptr_eq(&fb.color_texture().unwrap(), &texture));

        let red = vec![Color4B::new(255, 0, 0, 255); 4];
        fb.replace_pixels(&mut engine, Viewport::new(0, 0, 2, 2), &red)
            .unwrap();
        let pixels = fb.read_pixels(&mut engine, Viewport::new(1, 1, 1, 1)).unwrap();
        assert_eq!(pixels[0], red[0]);

        fb.resize_to(&mut engine, IntSize::new(16, 16)).unwrap();
        assert_eq!(texture.borrow().size(), IntSize::new(16, 16));
        let id = texture.borrow().id();
        assert_eq!(probe.texture(id).unwrap().size(TEXTURE_2D), Some(IntSize::new(16, 16)));
        assert!(fb.validate(&mut engine));
    }

    #[test]
    fn system_surface_is_kept() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        {
            let system = Framebuffer::system(&mut engine, IntSize::new(64, 64));
            assert!(system.is_system());
            assert!(system.validate(&mut engine));
        }

        engine.purge_released();
        assert_eq!(probe.call_count("delete_framebuffer"), 0);
    }
}
