//! The surfaces of the view: the window, the multisampled render target and the
//! picking surface.

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::*;
use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::identity::prelude::Shared;
use crate::math::prelude::IntSize;

use super::attachment::{Attachment, Renderbuffer};
use super::framebuffer::{Framebuffer, RenderSurface};

/// Settings of the surfaces of a view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSurfaceParams {
    pub size: IntSize,
    pub color_format: GLenum,
    /// Zero if the view has no depth buffer.
    pub depth_format: GLenum,
    /// Zero if the view has no stencil buffer. Packed depth-stencil formats share the
    /// depth buffer.
    pub stencil_format: GLenum,
    /// More than one enables multisampling.
    pub pixel_samples: u32,
    /// Whether the color content of the window can be read back. Some platforms only
    /// allow reading from off-screen surfaces.
    pub is_color_content_readable: bool,
    /// Forces picking into its own surface even when the window could be used.
    pub should_use_dedicated_picking_surface: bool,
    /// Discards buffers that are not needed after the multisample resolve.
    pub should_discard_after_resolve: bool,
}

impl Default for ViewSurfaceParams {
    fn default() -> Self {
        ViewSurfaceParams {
            size: IntSize::new(0, 0),
            color_format: RGBA8,
            depth_format: DEPTH_COMPONENT16,
            stencil_format: 0,
            pixel_samples: 1,
            is_color_content_readable: true,
            should_use_dedicated_picking_surface: false,
            should_discard_after_resolve: true,
        }
    }
}

impl ViewSurfaceParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[inline]
    pub fn is_multisampling(&self) -> bool {
        self.pixel_samples > 1
    }

    #[inline]
    pub fn is_packed_depth_stencil(&self) -> bool {
        self.depth_format == DEPTH24_STENCIL8
    }
}

/// Owns the surfaces the scene is drawn into.
///
/// Without multisampling the scene renders directly into the window framebuffer. With
/// it, the scene renders into an off-screen multisampled surface which is resolved
/// into the window at the end of each frame.
pub struct ViewSurfaceManager {
    params: ViewSurfaceParams,
    view: Shared<Framebuffer>,
    multisample: Option<Shared<Framebuffer>>,
    picking: Option<Shared<Framebuffer>>,
    depth: Option<Attachment>,
    surfaces: Vec<Shared<Framebuffer>>,
}

impl ViewSurfaceManager {
    /// Wraps the framebuffer bound at the time of the call as the view surface.
    pub fn new(engine: &mut GLEngine, params: ViewSurfaceParams) -> Result<Self> {
        let view = Rc::new(RefCell::new(Framebuffer::system(engine, params.size)));

        let multisample = if params.is_multisampling() {
            let max = engine.max_samples();
            let samples = params.pixel_samples.min(max);
            if samples < params.pixel_samples {
                info!(
                    "Clamps {} pixel samples to the platform maximum of {}.",
                    params.pixel_samples, max
                );
            }

            let mut fb = Framebuffer::new(engine, Some("Multisample"))?;
            let color =
                Renderbuffer::with_size(engine, params.color_format, samples, params.size)?;
            fb.set_color_attachment(engine, Some(color.into()))?;
            if params.depth_format != 0 {
                let depth =
                    Renderbuffer::with_size(engine, params.depth_format, samples, params.size)?;
                let depth: Attachment = depth.into();
                fb.set_depth_attachment(engine, Some(depth.clone()))?;
                if params.is_packed_depth_stencil() {
                    fb.set_stencil_attachment(engine, Some(depth))?;
                }
            }

            if !fb.validate(engine) {
                bail!("Failed to create the multisample surface.");
            }

            Some(Rc::new(RefCell::new(fb)))
        } else {
            None
        };

        let mut manager = ViewSurfaceManager {
            params,
            view: view.clone(),
            multisample: None,
            picking: None,
            depth: None,
            surfaces: Vec::new(),
        };

        manager.register(view);
        if let Some(fb) = multisample {
            manager.register(fb.clone());
            manager.multisample = Some(fb);
        }

        manager.view.borrow().activate(engine);
        Ok(manager)
    }

    #[inline]
    pub fn params(&self) -> &ViewSurfaceParams {
        &self.params
    }

    #[inline]
    pub fn size(&self) -> IntSize {
        self.params.size
    }

    #[inline]
    pub fn is_multisampling(&self) -> bool {
        self.multisample.is_some()
    }

    #[inline]
    pub fn is_color_content_readable(&self) -> bool {
        self.params.is_color_content_readable
    }

    /// The window surface, which is presented.
    #[inline]
    pub fn view_surface(&self) -> &Shared<Framebuffer> {
        &self.view
    }

    #[inline]
    pub fn multisample_surface(&self) -> Option<&Shared<Framebuffer>> {
        self.multisample.as_ref()
    }

    /// The surface the scene is drawn into.
    pub fn rendering_surface(&self) -> &Shared<Framebuffer> {
        self.multisample.as_ref().unwrap_or(&self.view)
    }

    /// Registers a surface so `resize_to` keeps it the size of the view.
    pub fn register(&mut self, surface: Shared<Framebuffer>) {
        if !self.surfaces.iter().any(|v| Rc::ptr_eq(v, &surface)) {
            self.surfaces.push(surface);
        }
    }

    pub fn unregister(&mut self, surface: &Shared<Framebuffer>) {
        self.surfaces.retain(|v| !Rc::ptr_eq(v, surface));
    }

    /// A single sampled depth buffer the size of the view, shared by the off-screen
    /// surfaces that ask for it.
    pub fn shared_depth_buffer(&mut self, engine: &mut GLEngine) -> Result<Attachment> {
        if let Some(ref v) = self.depth {
            return Ok(v.clone());
        }

        let format = if self.params.depth_format != 0 {
            self.params.depth_format
        } else {
            DEPTH_COMPONENT16
        };

        let depth: Attachment = Renderbuffer::with_size(engine, format, 0, self.size())?.into();
        self.depth = Some(depth.clone());
        Ok(depth)
    }

    /// Returns true if picking renders into a surface of its own.
    pub fn should_use_dedicated_picking_surface(&self) -> bool {
        self.params.should_use_dedicated_picking_surface
            || self.is_multisampling()
            || !self.is_color_content_readable()
    }

    /// The surface picking renders into. It is the view surface unless the view is
    /// multisampled or unreadable. A dedicated surface is created on first use and
    /// shares the depth buffer of the other off-screen surfaces.
    pub fn picking_surface(&mut self, engine: &mut GLEngine) -> Result<Shared<Framebuffer>> {
        if !self.should_use_dedicated_picking_surface() {
            return Ok(self.view.clone());
        }

        if let Some(ref v) = self.picking {
            return Ok(v.clone());
        }

        let mut fb = Framebuffer::new(engine, Some("Picking"))?;
        let color = Renderbuffer::with_size(engine, RGBA8, 0, self.size())?;
        fb.set_color_attachment(engine, Some(color.into()))?;
        let depth = self.shared_depth_buffer(engine)?;
        fb.set_depth_attachment(engine, Some(depth))?;
        if !fb.validate(engine) {
            bail!("Failed to create the picking surface.");
        }

        let fb = Rc::new(RefCell::new(fb));
        self.register(fb.clone());
        self.picking = Some(fb.clone());
        Ok(fb)
    }

    /// Blits the multisampled surface into the view surface, then discards what is no
    /// longer needed. Does nothing without multisampling.
    pub fn resolve_multisampling(&self, engine: &mut GLEngine) -> Result<()> {
        let fb = match self.multisample {
            Some(ref v) => v.borrow(),
            None => return Ok(()),
        };

        let view = self.view.borrow();
        engine.blit_framebuffer(fb.id(), view.id(), self.size())?;

        if self.params.should_discard_after_resolve {
            engine.discard_framebuffer(fb.id(), &fb.attached_slots());
        }

        view.activate(engine);
        Ok(())
    }

    /// Resizes every registered surface. Shared attachments are resized once.
    pub fn resize_to(&mut self, engine: &mut GLEngine, size: IntSize) -> Result<()> {
        if size == self.params.size {
            return Ok(());
        }

        debug!("Resizes view surfaces from {:?} to {:?}.", self.params.size, size);
        self.params.size = size;

        if let Some(ref depth) = self.depth {
            depth.resize_to(engine, size)?;
        }

        for v in &self.surfaces {
            v.borrow_mut().resize_to(engine, size)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gles::EngineParams;
    use crate::math::prelude::{Color4B, Color4F, Viewport};
    use crate::surfaces::framebuffer::fill_color;

    fn params(samples: u32) -> ViewSurfaceParams {
        ViewSurfaceParams {
            size: IntSize::new(64, 64),
            pixel_samples: samples,
            ..ViewSurfaceParams::default()
        }
    }

    #[test]
    fn single_sampled_view() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let mut manager = ViewSurfaceManager::new(&mut engine, params(1)).unwrap();
        assert!(!manager.is_multisampling());
        assert!(Rc::ptr_eq(manager.rendering_surface(), manager.view_surface()));

        let picking = manager.picking_surface(&mut engine).unwrap();
        assert!(Rc::ptr_eq(&picking, manager.view_surface()));
        assert!(manager.resolve_multisampling(&mut engine).is_ok());
    }

    #[test]
    fn multisample_resolve() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let manager = ViewSurfaceManager::new(&mut engine, params(4)).unwrap();
        assert!(manager.is_multisampling());

        let surface = manager.rendering_surface().clone();
        fill_color(&mut engine, &*surface.borrow(), Color4F::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(probe.window().pixel(5, 5), Some(Color4B::new(0, 0, 0, 0)));

        manager.resolve_multisampling(&mut engine).unwrap();
        assert_eq!(probe.window().pixel(5, 5), Some(Color4B::new(0, 0, 255, 255)));
        assert_eq!(probe.framebuffer_binding(), 0);

        let id = surface.borrow().id();
        let discarded = probe.framebuffer(id).unwrap().discarded;
        assert!(discarded.contains(&COLOR_ATTACHMENT0));
        assert!(discarded.contains(&DEPTH_ATTACHMENT));
    }

    #[test]
    fn dedicated_picking_surface() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let mut params = params(1);
        params.is_color_content_readable = false;
        let mut manager = ViewSurfaceManager::new(&mut engine, params).unwrap();

        let picking = manager.picking_surface(&mut engine).unwrap();
        assert!(!Rc::ptr_eq(&picking, manager.view_surface()));
        assert!(Rc::ptr_eq(&picking, &manager.picking_surface(&mut engine).unwrap()));

        let depth = manager.shared_depth_buffer(&mut engine).unwrap();
        assert!(picking.borrow().depth_attachment().unwrap().ptr_eq(&depth));

        manager.resize_to(&mut engine, IntSize::new(32, 16)).unwrap();
        assert_eq!(picking.borrow().size(), IntSize::new(32, 16));
        assert_eq!(depth.size(), IntSize::new(32, 16));
        assert!(picking.borrow().validate(&mut engine));

        let pixels = picking
            .borrow()
            .read_pixels(&mut engine, Viewport::new(0, 0, 1, 1))
            .unwrap();
        assert_eq!(pixels.len(), 1);
    }
}
