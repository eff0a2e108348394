//! GPU textures with their CPU side parameters.
//!
//! Images whose dimensions are not powers of two are padded into POT storage. The part
//! of the storage covered by the image is kept as `coverage`, which meshes fold into
//! their texture coordinates.

use crate::errors::*;
use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::gles::release::{self, ContextId, GLObject};
use crate::identity::{Identifiable, Identity};
use crate::math::prelude::{Color4B, IntSize, Vector2, Viewport};
use crate::math::{is_pot, next_pot};

/// Returns the size in bytes of one pixel of `format`, with unsigned byte components.
pub fn bytes_per_pixel(format: GLenum) -> usize {
    match format {
        RGBA => 4,
        RGB => 3,
        LUMINANCE_ALPHA => 2,
        _ => 1,
    }
}

/// Decoded pixels ready for upload.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub size: IntSize,
    pub format: GLenum,
    pub pixels: Vec<u8>,
    /// Rows are stored top first, so the image is upside down in GL coordinates.
    pub is_flipped_vertically: bool,
    pub has_premultiplied_alpha: bool,
}

impl TextureImage {
    pub fn new(size: IntSize, format: GLenum, pixels: Vec<u8>) -> Self {
        TextureImage {
            size,
            format,
            pixels,
            is_flipped_vertically: false,
            has_premultiplied_alpha: false,
        }
    }

    /// Creates an RGBA image filled with one color.
    pub fn solid(size: IntSize, color: Color4B) -> Self {
        let mut pixels = Vec::with_capacity(size.area() * 4);
        for _ in 0..size.area() {
            pixels.extend_from_slice(&color.rgba());
        }

        TextureImage::new(size, RGBA, pixels)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size.width <= 0 || self.size.height <= 0 {
            bail!("Image has invalid dimensions {:?}.", self.size);
        }

        let len = self.size.area() * bytes_per_pixel(self.format);
        if self.pixels.len() != len {
            bail!(
                "Image of {:?} expects {} bytes, found {}.",
                self.size,
                len,
                self.pixels.len()
            );
        }

        Ok(())
    }
}

/// Specify how the texture is used whenever the pixel being sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    pub fn to_gl(self) -> GLenum {
        match self {
            TextureFilter::Nearest => NEAREST,
            TextureFilter::Linear => LINEAR,
            TextureFilter::NearestMipmapNearest => NEAREST_MIPMAP_NEAREST,
            TextureFilter::LinearMipmapNearest => LINEAR_MIPMAP_NEAREST,
            TextureFilter::NearestMipmapLinear => NEAREST_MIPMAP_LINEAR,
            TextureFilter::LinearMipmapLinear => LINEAR_MIPMAP_LINEAR,
        }
    }

    #[inline]
    pub fn uses_mipmap(self) -> bool {
        match self {
            TextureFilter::Nearest | TextureFilter::Linear => false,
            _ => true,
        }
    }

    /// The same filter without mipmap sampling.
    pub fn without_mipmap(self) -> Self {
        match self {
            TextureFilter::Nearest
            | TextureFilter::NearestMipmapNearest
            | TextureFilter::NearestMipmapLinear => TextureFilter::Nearest,
            _ => TextureFilter::Linear,
        }
    }
}

/// Sets the wrap parameter for texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Samples at coord x + 1 map to coord x.
    Repeat,
    /// Samples at coord x + 1 map to coord 1 - x.
    Mirror,
    /// Samples at coord x + 1 map to coord 1.
    Clamp,
}

impl TextureWrap {
    pub fn to_gl(self) -> GLenum {
        match self {
            TextureWrap::Repeat => REPEAT,
            TextureWrap::Mirror => MIRRORED_REPEAT,
            TextureWrap::Clamp => CLAMP_TO_EDGE,
        }
    }
}

/// The sampling parameters of a texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureParams {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            min_filter: TextureFilter::LinearMipmapNearest,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
        }
    }
}

impl TextureParams {
    /// Parameters of render targets and non-POT textures.
    pub fn clamped() -> Self {
        TextureParams {
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::Clamp,
            wrap_t: TextureWrap::Clamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureKind {
    Texture2D,
    Cube,
}

const FACES_2D: [GLenum; 1] = [TEXTURE_2D];
const FACES_CUBE: [GLenum; 6] = [
    TEXTURE_CUBE_MAP_POSITIVE_X,
    TEXTURE_CUBE_MAP_NEGATIVE_X,
    TEXTURE_CUBE_MAP_POSITIVE_Y,
    TEXTURE_CUBE_MAP_NEGATIVE_Y,
    TEXTURE_CUBE_MAP_POSITIVE_Z,
    TEXTURE_CUBE_MAP_NEGATIVE_Z,
];

impl TextureKind {
    /// The binding target.
    pub fn target(self) -> GLenum {
        match self {
            TextureKind::Texture2D => TEXTURE_2D,
            TextureKind::Cube => TEXTURE_CUBE_MAP,
        }
    }

    /// The image targets, in +X, -X, +Y, -Y, +Z, -Z order for cube maps.
    pub fn faces(self) -> &'static [GLenum] {
        match self {
            TextureKind::Texture2D => &FACES_2D,
            TextureKind::Cube => &FACES_CUBE,
        }
    }
}

/// A GL texture object.
#[derive(Debug)]
pub struct Texture {
    identity: Identity,
    kind: TextureKind,
    context: ContextId,
    id: GLuint,
    format: GLenum,
    size: IntSize,
    image_size: IntSize,
    params: TextureParams,
    has_mipmap: bool,
    is_flipped_vertically: bool,
    has_premultiplied_alpha: bool,
}

impl Identifiable for Texture {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        release::release(self.context, GLObject::Texture(self.id));
    }
}

impl Texture {
    fn allocate(engine: &mut GLEngine, name: Option<&str>, kind: TextureKind) -> Result<Self> {
        let id = engine.create_texture()?;
        Ok(Texture {
            identity: Identity::new(name),
            kind,
            context: engine.context(),
            id,
            format: RGBA,
            size: IntSize::new(0, 0),
            image_size: IntSize::new(0, 0),
            params: TextureParams::default(),
            has_mipmap: false,
            is_flipped_vertically: false,
            has_premultiplied_alpha: false,
        })
    }

    /// Creates a 2d texture with the content of `image`.
    pub fn from_image(engine: &mut GLEngine, name: Option<&str>, image: &TextureImage) -> Result<Self> {
        image.validate()?;

        let mut texture = Texture::allocate(engine, name, TextureKind::Texture2D)?;
        texture.upload(engine, TEXTURE_2D, image)?;
        texture.adopt(image);
        texture.apply_params(engine, TextureParams::default())?;

        debug!("Creates texture {} of {:?}.", texture.describe(), texture.size);
        Ok(texture)
    }

    /// Creates a cube texture from six square images in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn cube_from_images(
        engine: &mut GLEngine,
        name: Option<&str>,
        images: &[TextureImage],
    ) -> Result<Self> {
        if images.len() != 6 {
            bail!("Cube textures need 6 images, found {}.", images.len());
        }

        for v in images {
            v.validate()?;
            if v.size != images[0].size || v.size.width != v.size.height {
                bail!("Faces of cube texture must be square and of equal size.");
            }
        }

        let mut texture = Texture::allocate(engine, name, TextureKind::Cube)?;
        for (face, image) in FACES_CUBE.iter().zip(images) {
            texture.upload(engine, *face, image)?;
        }

        texture.adopt(&images[0]);
        texture.apply_params(engine, TextureParams::default())?;

        debug!("Creates cube texture {} of {:?}.", texture.describe(), texture.size);
        Ok(texture)
    }

    /// Creates a texture with uninitialized storage of exactly `size`, to be used as a
    /// render target.
    pub fn render_target(
        engine: &mut GLEngine,
        name: Option<&str>,
        kind: TextureKind,
        size: IntSize,
        format: GLenum,
    ) -> Result<Self> {
        let mut texture = Texture::allocate(engine, name, kind)?;
        texture.format = format;
        texture.resize_to(engine, size)?;
        texture.apply_params(engine, TextureParams::clamped())?;
        Ok(texture)
    }

    fn upload(&mut self, engine: &mut GLEngine, face: GLenum, image: &TextureImage) -> Result<()> {
        let w = next_pot(image.size.width as u32) as i32;
        let h = next_pot(image.size.height as u32) as i32;
        let storage = IntSize::new(w, h);

        if storage == image.size {
            return engine.upload_texture_image(
                self.id,
                face,
                0,
                image.format,
                storage,
                Some(&image.pixels),
            );
        }

        engine.upload_texture_image(self.id, face, 0, image.format, storage, None)?;
        engine.update_texture_image(
            self.id,
            face,
            0,
            Viewport::from_size(image.size),
            image.format,
            &image.pixels,
        )?;

        self.size = storage;
        Ok(())
    }

    fn adopt(&mut self, image: &TextureImage) {
        self.format = image.format;
        self.image_size = image.size;
        self.size = IntSize::new(
            next_pot(image.size.width as u32) as i32,
            next_pot(image.size.height as u32) as i32,
        );

        self.is_flipped_vertically = image.is_flipped_vertically;
        self.has_premultiplied_alpha = image.has_premultiplied_alpha;
    }

    #[inline]
    pub fn id(&self) -> GLuint {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    #[inline]
    pub fn is_cube(&self) -> bool {
        self.kind == TextureKind::Cube
    }

    #[inline]
    pub fn target(&self) -> GLenum {
        self.kind.target()
    }

    #[inline]
    pub fn format(&self) -> GLenum {
        self.format
    }

    /// The size of the storage, which is POT for textures loaded from images.
    #[inline]
    pub fn size(&self) -> IntSize {
        self.size
    }

    /// The size of the image content.
    #[inline]
    pub fn image_size(&self) -> IntSize {
        self.image_size
    }

    /// Returns true if the storage dimensions are powers of two.
    pub fn is_pot(&self) -> bool {
        is_pot(self.size.width as u32) && is_pot(self.size.height as u32)
    }

    /// The fraction of the storage covered by the image content.
    pub fn coverage(&self) -> Vector2<f32> {
        if self.size.is_zero() {
            return Vector2::new(1.0, 1.0);
        }

        Vector2::new(
            self.image_size.width as f32 / self.size.width as f32,
            self.image_size.height as f32 / self.size.height as f32,
        )
    }

    #[inline]
    pub fn params(&self) -> TextureParams {
        self.params
    }

    #[inline]
    pub fn has_mipmap(&self) -> bool {
        self.has_mipmap
    }

    #[inline]
    pub fn is_flipped_vertically(&self) -> bool {
        self.is_flipped_vertically
    }

    #[inline]
    pub fn set_is_flipped_vertically(&mut self, flipped: bool) {
        self.is_flipped_vertically = flipped;
    }

    #[inline]
    pub fn has_premultiplied_alpha(&self) -> bool {
        self.has_premultiplied_alpha
    }

    #[inline]
    pub fn set_has_premultiplied_alpha(&mut self, v: bool) {
        self.has_premultiplied_alpha = v;
    }

    /// Sets the sampling parameters. Repeating wraps are rejected for non-POT storage.
    pub fn set_params(&mut self, engine: &mut GLEngine, params: TextureParams) -> Result<()> {
        if !self.is_pot()
            && (params.wrap_s != TextureWrap::Clamp || params.wrap_t != TextureWrap::Clamp)
        {
            bail!(
                "Texture {} of {:?} is not POT, and can only be clamped.",
                self.describe(),
                self.size
            );
        }

        self.apply_params(engine, params)
    }

    fn apply_params(&mut self, engine: &mut GLEngine, mut params: TextureParams) -> Result<()> {
        if !self.has_mipmap {
            params.min_filter = params.min_filter.without_mipmap();
        }

        if !self.is_pot() {
            params.wrap_s = TextureWrap::Clamp;
            params.wrap_t = TextureWrap::Clamp;
        }

        let target = self.target();
        engine.set_texture_parameter(self.id, target, TEXTURE_MIN_FILTER, params.min_filter.to_gl() as GLint)?;
        engine.set_texture_parameter(self.id, target, TEXTURE_MAG_FILTER, params.mag_filter.to_gl() as GLint)?;
        engine.set_texture_parameter(self.id, target, TEXTURE_WRAP_S, params.wrap_s.to_gl() as GLint)?;
        engine.set_texture_parameter(self.id, target, TEXTURE_WRAP_T, params.wrap_t.to_gl() as GLint)?;

        self.params = params;
        Ok(())
    }

    /// Generates the mipmap chain, and switches the minifying filter to a mipmap one.
    pub fn generate_mipmap(&mut self, engine: &mut GLEngine) -> Result<()> {
        if !self.is_pot() {
            bail!("Can not generate mipmap of non-POT texture {}.", self.describe());
        }

        engine.generate_mipmap(self.id, self.target())?;
        self.has_mipmap = true;

        let mut params = self.params;
        if !params.min_filter.uses_mipmap() {
            params.min_filter = TextureParams::default().min_filter;
        }

        self.apply_params(engine, params)
    }

    /// Reallocates the storage of every face, dropping content and mipmaps.
    pub fn resize_to(&mut self, engine: &mut GLEngine, size: IntSize) -> Result<()> {
        if size == self.size && !self.size.is_zero() {
            return Ok(());
        }

        for face in self.kind.faces() {
            engine.upload_texture_image(self.id, *face, 0, self.format, size, None)?;
        }

        self.size = size;
        self.image_size = size;
        self.has_mipmap = false;
        Ok(())
    }

    /// Replaces a rectangle of the content of `face` with RGBA pixels.
    pub fn replace_pixels(
        &mut self,
        engine: &mut GLEngine,
        face: GLenum,
        rect: Viewport,
        pixels: &[Color4B],
    ) -> Result<()> {
        if rect.x < 0
            || rect.y < 0
            || rect.x + rect.w > self.image_size.width
            || rect.y + rect.h > self.image_size.height
        {
            bail!("{:?} is out of the bounds of {}.", rect, self.describe());
        }

        if pixels.len() < rect.area() {
            bail!("{} pixels are not enough to fill {:?}.", pixels.len(), rect);
        }

        let mut bytes = Vec::with_capacity(rect.area() * 4);
        for v in &pixels[..rect.area()] {
            bytes.extend_from_slice(&v.rgba());
        }

        engine.update_texture_image(self.id, face, 0, rect, RGBA, &bytes)
    }

    /// Binds the texture to `unit`.
    pub fn bind(&self, engine: &mut GLEngine, unit: usize) {
        engine.bind_texture(unit, self.target(), self.id);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gles::EngineParams;

    #[test]
    fn pads_non_pot_images() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let image = TextureImage::solid(IntSize::new(48, 20), Color4B::white());
        let mut texture = Texture::from_image(&mut engine, Some("npot"), &image).unwrap();

        assert_eq!(texture.size(), IntSize::new(64, 32));
        assert_eq!(texture.coverage(), Vector2::new(0.75, 0.625));
        assert!(texture.is_pot());

        let info = probe.texture(texture.id()).unwrap();
        assert_eq!(info.size(TEXTURE_2D), Some(IntSize::new(64, 32)));

        let params = TextureParams::default();
        assert!(texture.set_params(&mut engine, params).is_ok());
        assert_eq!(texture.params().min_filter, TextureFilter::Linear);
    }

    #[test]
    fn rejects_repeat_on_non_pot_storage() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut texture = Texture::render_target(
            &mut engine,
            None,
            TextureKind::Texture2D,
            IntSize::new(30, 20),
            RGBA,
        )
        .unwrap();

        assert!(!texture.is_pot());
        assert_eq!(texture.coverage(), Vector2::new(1.0, 1.0));
        assert!(texture.set_params(&mut engine, TextureParams::default()).is_err());

        let info = probe.texture(texture.id()).unwrap();
        assert_eq!(info.params[&TEXTURE_WRAP_S], CLAMP_TO_EDGE as GLint);
        assert!(texture.generate_mipmap(&mut engine).is_err());
    }

    #[test]
    fn mipmap() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let image = TextureImage::solid(IntSize::new(4, 4), Color4B::white());
        let mut texture = Texture::from_image(&mut engine, None, &image).unwrap();
        texture.generate_mipmap(&mut engine).unwrap();

        let info = probe.texture(texture.id()).unwrap();
        assert!(info.has_mipmap);
        assert_eq!(
            info.params[&TEXTURE_MIN_FILTER],
            LINEAR_MIPMAP_NEAREST as GLint
        );
    }

    #[test]
    fn released_on_drop() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let image = TextureImage::solid(IntSize::new(2, 2), Color4B::white());
        let id = Texture::from_image(&mut engine, None, &image).unwrap().id();

        assert!(probe.texture(id).is_some());
        engine.purge_released();
        assert!(probe.texture(id).is_none());
    }

    #[test]
    fn released_to_the_creating_engine() {
        let (mut first, first_probe) = GLEngine::headless(EngineParams::default());
        let (mut second, second_probe) = GLEngine::headless(EngineParams::default());
        let image = TextureImage::solid(IntSize::new(2, 2), Color4B::white());

        let kept = Texture::from_image(&mut second, None, &image).unwrap();
        let id = Texture::from_image(&mut first, None, &image).unwrap().id();
        assert_eq!(id, kept.id());

        second.purge_released();
        assert!(second_probe.texture(id).is_some());
        assert!(first_probe.texture(id).is_some());

        first.purge_released();
        assert!(first_probe.texture(id).is_none());
        assert!(second_probe.texture(kept.id()).is_some());
    }
}
