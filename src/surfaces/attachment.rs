//! Buffers that can be bound to the color, depth or stencil slot of a framebuffer.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::errors::*;
use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::gles::release::{self, ContextId, GLObject};
use crate::identity::prelude::Shared;
use crate::identity::{Identifiable, Identity};
use crate::materials::texture::{Texture, TextureParams};
use crate::math::prelude::IntSize;

/// A GL renderbuffer.
///
/// An on-screen renderbuffer has its storage allocated by the platform window. Its size
/// and format are read back from GL instead of being allocated by `resize_to`.
#[derive(Debug)]
pub struct Renderbuffer {
    identity: Identity,
    context: ContextId,
    id: GLuint,
    format: GLenum,
    samples: u32,
    size: IntSize,
    is_on_screen: bool,
}

impl Identifiable for Renderbuffer {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Drop for Renderbuffer {
    fn drop(&mut self) {
        if !self.is_on_screen {
            release::release(self.context, GLObject::Renderbuffer(self.id));
        }
    }
}

impl Renderbuffer {
    /// Creates a renderbuffer without storage. Storage is allocated by `resize_to`.
    pub fn new(engine: &mut GLEngine, format: GLenum, samples: u32) -> Result<Self> {
        let id = engine.create_renderbuffer()?;
        Ok(Renderbuffer {
            identity: Identity::default(),
            context: engine.context(),
            id,
            format,
            samples,
            size: IntSize::new(0, 0),
            is_on_screen: false,
        })
    }

    /// Creates a renderbuffer and allocates its storage.
    pub fn with_size(
        engine: &mut GLEngine,
        format: GLenum,
        samples: u32,
        size: IntSize,
    ) -> Result<Self> {
        let mut rb = Renderbuffer::new(engine, format, samples)?;
        rb.resize_to(engine, size)?;
        Ok(rb)
    }

    /// Wraps the renderbuffer that backs the platform window.
    pub fn on_screen(engine: &mut GLEngine, id: GLuint) -> Result<Self> {
        let mut rb = Renderbuffer {
            identity: Identity::named("OnScreen"),
            context: engine.context(),
            id,
            format: RGBA8,
            samples: 0,
            size: IntSize::new(0, 0),
            is_on_screen: true,
        };

        rb.resize_to(engine, IntSize::new(0, 0))?;
        Ok(rb)
    }

    #[inline]
    pub fn id(&self) -> GLuint {
        self.id
    }

    #[inline]
    pub fn format(&self) -> GLenum {
        self.format
    }

    #[inline]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    #[inline]
    pub fn size(&self) -> IntSize {
        self.size
    }

    #[inline]
    pub fn is_on_screen(&self) -> bool {
        self.is_on_screen
    }

    /// Reallocates the storage. On-screen renderbuffers ignore `size` and read back the
    /// size and format the window allocated.
    pub fn resize_to(&mut self, engine: &mut GLEngine, size: IntSize) -> Result<()> {
        if self.is_on_screen {
            let (size, format) = engine.renderbuffer_info(self.id)?;
            self.size = size;
            self.format = format;
            return Ok(());
        }

        if size == self.size {
            return Ok(());
        }

        engine.renderbuffer_storage(self.id, self.format, self.samples, size)?;
        self.size = size;
        trace!(
            "Allocates renderbuffer {} of {:?} with {} samples.",
            self.id,
            size,
            self.samples
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum TextureRef {
    Strong(Shared<Texture>),
    Weak(Weak<RefCell<Texture>>),
}

impl TextureRef {
    fn upgrade(&self) -> Option<Shared<Texture>> {
        match *self {
            TextureRef::Strong(ref v) => Some(v.clone()),
            TextureRef::Weak(ref v) => v.upgrade(),
        }
    }
}

/// A face and mipmap level of a texture used as a render target.
///
/// The attachment holds its texture strongly unless told otherwise. A cube texture that
/// owns a surface rendering into itself must use a weak reference to avoid a cycle.
#[derive(Debug, Clone)]
pub struct TextureAttachment {
    texture: TextureRef,
    face: GLenum,
    level: GLint,
}

impl TextureAttachment {
    pub fn new(texture: &Shared<Texture>) -> Self {
        let face = texture.borrow().target();
        TextureAttachment {
            texture: TextureRef::Strong(texture.clone()),
            face: if face == TEXTURE_CUBE_MAP {
                TEXTURE_CUBE_MAP_POSITIVE_X
            } else {
                face
            },
            level: 0,
        }
    }

    pub fn with_face(texture: &Shared<Texture>, face: GLenum) -> Self {
        let mut v = TextureAttachment::new(texture);
        v.face = face;
        v
    }

    /// The texture, or `None` if it is weakly referenced and gone.
    #[inline]
    pub fn texture(&self) -> Option<Shared<Texture>> {
        self.texture.upgrade()
    }

    #[inline]
    pub fn should_use_strong_reference_to_texture(&self) -> bool {
        match self.texture {
            TextureRef::Strong(_) => true,
            TextureRef::Weak(_) => false,
        }
    }

    pub fn set_should_use_strong_reference_to_texture(&mut self, strong: bool) {
        let texture = match self.texture.upgrade() {
            Some(v) => v,
            None => return,
        };

        self.texture = if strong {
            TextureRef::Strong(texture)
        } else {
            TextureRef::Weak(Rc::downgrade(&texture))
        };
    }

    #[inline]
    pub fn face(&self) -> GLenum {
        self.face
    }

    /// Selects the texture face rendered into. Takes effect on the next `attach`.
    #[inline]
    pub fn set_face(&mut self, face: GLenum) {
        self.face = face;
    }

    #[inline]
    pub fn level(&self) -> GLint {
        self.level
    }

    #[inline]
    pub fn set_level(&mut self, level: GLint) {
        self.level = level;
    }

    pub fn size(&self) -> IntSize {
        self.texture()
            .map(|v| v.borrow().size())
            .unwrap_or_else(|| IntSize::new(0, 0))
    }

    pub fn resize_to(&mut self, engine: &mut GLEngine, size: IntSize) -> Result<()> {
        match self.texture() {
            Some(v) => v.borrow_mut().resize_to(engine, size),
            None => bail!("The texture of the attachment has been dropped."),
        }
    }

    fn attach(&self, engine: &mut GLEngine, framebuffer: GLuint, slot: GLenum) -> Result<()> {
        let texture = match self.texture() {
            Some(v) => v,
            None => bail!("The texture of the attachment has been dropped."),
        };

        let mut texture = texture.borrow_mut();
        texture.set_params(engine, TextureParams::clamped())?;
        engine.attach_texture(framebuffer, slot, self.face, texture.id(), self.level)
    }
}

/// Anything that can be bound to a framebuffer slot. Attachments are shared by
/// reference, so resizing one resizes it for every surface that uses it.
#[derive(Debug, Clone)]
pub enum Attachment {
    Renderbuffer(Shared<Renderbuffer>),
    Texture(Shared<TextureAttachment>),
}

impl From<Renderbuffer> for Attachment {
    fn from(v: Renderbuffer) -> Self {
        Attachment::Renderbuffer(Rc::new(RefCell::new(v)))
    }
}

impl From<TextureAttachment> for Attachment {
    fn from(v: TextureAttachment) -> Self {
        Attachment::Texture(Rc::new(RefCell::new(v)))
    }
}

impl Attachment {
    pub fn size(&self) -> IntSize {
        match *self {
            Attachment::Renderbuffer(ref v) => v.borrow().size(),
            Attachment::Texture(ref v) => v.borrow().size(),
        }
    }

    pub fn resize_to(&self, engine: &mut GLEngine, size: IntSize) -> Result<()> {
        match *self {
            Attachment::Renderbuffer(ref v) => v.borrow_mut().resize_to(engine, size),
            Attachment::Texture(ref v) => v.borrow_mut().resize_to(engine, size),
        }
    }

    /// The texture rendered into, if this is a texture attachment.
    pub fn texture(&self) -> Option<Shared<Texture>> {
        match *self {
            Attachment::Renderbuffer(_) => None,
            Attachment::Texture(ref v) => v.borrow().texture(),
        }
    }

    /// Returns true if both refer to the same underlying buffer.
    pub fn ptr_eq(&self, rhs: &Attachment) -> bool {
        match (self, rhs) {
            (Attachment::Renderbuffer(a), Attachment::Renderbuffer(b)) => Rc::ptr_eq(a, b),
            (Attachment::Texture(a), Attachment::Texture(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn attach(&self, engine: &mut GLEngine, framebuffer: GLuint, slot: GLenum) -> Result<()> {
        match *self {
            Attachment::Renderbuffer(ref v) => {
                let id = v.borrow().id();
                engine.attach_renderbuffer(framebuffer, slot, id)
            }
            Attachment::Texture(ref v) => v.borrow().attach(engine, framebuffer, slot),
        }
    }

    pub fn detach(engine: &mut GLEngine, framebuffer: GLuint, slot: GLenum) -> Result<()> {
        engine.attach_renderbuffer(framebuffer, slot, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gles::EngineParams;
    use crate::materials::texture::TextureKind;

    #[test]
    fn renderbuffer_storage() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut rb = Renderbuffer::new(&mut engine, DEPTH_COMPONENT16, 0).unwrap();
        rb.resize_to(&mut engine, IntSize::new(32, 16)).unwrap();
        rb.resize_to(&mut engine, IntSize::new(32, 16)).unwrap();
        assert_eq!(probe.call_count("renderbuffer_storage"), 1);
        assert_eq!(probe.renderbuffer(rb.id()).unwrap().image.size, IntSize::new(32, 16));

        assert!(Renderbuffer::with_size(&mut engine, RGBA8, 16, IntSize::new(4, 4)).is_err());
    }

    #[test]
    fn on_screen_reads_back() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let id = {
            let rb = Renderbuffer::with_size(&mut engine, RGB565, 0, IntSize::new(20, 10))
                .unwrap();
            let id = rb.id();
            ::std::mem::forget(rb);
            id
        };

        let mut rb = Renderbuffer::on_screen(&mut engine, id).unwrap();
        assert_eq!(rb.size(), IntSize::new(20, 10));
        assert_eq!(rb.format(), RGB565);

        rb.resize_to(&mut engine, IntSize::new(64, 64)).unwrap();
        assert_eq!(rb.size(), IntSize::new(20, 10));
    }

    #[test]
    fn weak_texture_reference() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let texture = Texture::render_target(
            &mut engine,
            None,
            TextureKind::Cube,
            IntSize::new(8, 8),
            RGBA,
        )
        .unwrap();
        let texture = Rc::new(RefCell::new(texture));

        let mut attachment = TextureAttachment::new(&texture);
        assert_eq!(attachment.face(), TEXTURE_CUBE_MAP_POSITIVE_X);
        assert!(attachment.should_use_strong_reference_to_texture());
        assert_eq!(Rc::strong_count(&texture), 2);

        attachment.set_should_use_strong_reference_to_texture(false);
        assert_eq!(Rc::strong_count(&texture), 1);
        assert_eq!(attachment.size(), IntSize::new(8, 8));

        drop(texture);
        assert!(attachment.texture().is_none());
        assert_eq!(attachment.size(), IntSize::new(0, 0));
    }
}
