//! The shared texture cache and the loaders that read texture files.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image;

use super::texture::{Texture, TextureImage};
use crate::errors::*;
use crate::gles::consts::RGBA;
use crate::gles::engine::GLEngine;
use crate::identity::prelude::{Cache, Shared};
use crate::math::prelude::IntSize;

/// The suffixes substituted into the placeholder of cube texture file patterns, in
/// +X, -X, +Y, -Y, +Z, -Z order.
pub const CUBE_FACE_SUFFIXES: [&str; 6] = ["PosX", "NegX", "PosY", "NegY", "PosZ", "NegZ"];

/// The placeholder of cube texture file patterns.
pub const CUBE_PATTERN_PLACEHOLDER: &str = "%@";

/// Expands a cube texture file pattern like `"env%@.png"` into the six file names.
pub fn cube_face_files(pattern: &str) -> Result<Vec<String>> {
    if pattern.matches(CUBE_PATTERN_PLACEHOLDER).count() != 1 {
        bail!(
            "Cube texture pattern {} must hold exactly one {} placeholder.",
            pattern,
            CUBE_PATTERN_PLACEHOLDER
        );
    }

    Ok(CUBE_FACE_SUFFIXES
        .iter()
        .map(|v| pattern.replace(CUBE_PATTERN_PLACEHOLDER, v))
        .collect())
}

/// Reads and decodes texture files.
pub trait TextureFileLoader {
    fn load(&mut self, file: &str) -> Result<TextureImage>;
}

/// Decodes files with the `image` crate, relative to a root directory.
pub struct ImageFileLoader {
    root: PathBuf,
    should_flip_vertically: bool,
    should_premultiply_alpha: bool,
}

impl ImageFileLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        ImageFileLoader {
            root: root.as_ref().to_owned(),
            should_flip_vertically: true,
            should_premultiply_alpha: false,
        }
    }

    /// Flips rows on load so the image is upright in GL coordinates. Enabled by default.
    pub fn set_should_flip_vertically(&mut self, v: bool) {
        self.should_flip_vertically = v;
    }

    pub fn set_should_premultiply_alpha(&mut self, v: bool) {
        self.should_premultiply_alpha = v;
    }
}

impl TextureFileLoader for ImageFileLoader {
    fn load(&mut self, file: &str) -> Result<TextureImage> {
        let path = self.root.join(file);
        let mut img = image::open(&path)
            .map_err(|err| format_err!("Failed to load {}. {}", path.display(), err))?;

        if self.should_flip_vertically {
            img = img.flipv();
        }

        let rgba = img.to_rgba();
        let (w, h) = rgba.dimensions();
        let mut pixels = rgba.into_raw();

        if self.should_premultiply_alpha {
            for v in pixels.chunks_mut(4) {
                let a = u32::from(v[3]);
                for c in &mut v[0..3] {
                    *c = ((u32::from(*c) * a + 127) / 255) as u8;
                }
            }
        }

        let mut image = TextureImage::new(IntSize::new(w as i32, h as i32), RGBA, pixels);
        image.is_flipped_vertically = !self.should_flip_vertically;
        image.has_premultiplied_alpha = self.should_premultiply_alpha;
        Ok(image)
    }
}

/// Textures keyed by the file they were loaded from.
///
/// The cache is weak unless preloading, so textures vanish once no material uses them.
/// Preloaded textures are pinned until removed.
pub struct TextureCache {
    cache: Cache<Texture>,
    should_generate_mipmaps: bool,
}

impl Default for TextureCache {
    fn default() -> Self {
        TextureCache::new()
    }
}

impl TextureCache {
    pub fn new() -> Self {
        TextureCache {
            cache: Cache::weak("Texture"),
            should_generate_mipmaps: true,
        }
    }

    /// Whether mipmaps are generated for POT textures as they are loaded.
    #[inline]
    pub fn should_generate_mipmaps(&self) -> bool {
        self.should_generate_mipmaps
    }

    #[inline]
    pub fn set_should_generate_mipmaps(&mut self, v: bool) {
        self.should_generate_mipmaps = v;
    }

    #[inline]
    pub fn is_preloading(&self) -> bool {
        !self.cache.is_weak()
    }

    /// Pins textures added from now on.
    pub fn set_is_preloading(&mut self, preloading: bool) {
        self.cache.set_is_weak(!preloading);
    }

    pub fn get(&self, name: &str) -> Option<Shared<Texture>> {
        self.cache.get(name)
    }

    pub fn add(&mut self, texture: &Shared<Texture>) {
        self.cache.add(texture);
    }

    pub fn remove(&mut self, name: &str) -> Option<Shared<Texture>> {
        self.cache.remove(name)
    }

    pub fn remove_all(&mut self) {
        self.cache.remove_all();
    }

    pub fn len(&mut self) -> usize {
        self.cache.prune();
        self.cache.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        self.cache.names()
    }

    /// Returns the cached texture of `file`, or loads it.
    pub fn load_texture(
        &mut self,
        engine: &mut GLEngine,
        loader: &mut dyn TextureFileLoader,
        file: &str,
    ) -> Result<Shared<Texture>> {
        if let Some(v) = self.cache.get(file) {
            return Ok(v);
        }

        let image = loader.load(file)?;
        let mut texture = Texture::from_image(engine, Some(file), &image)?;
        self.finish(engine, &mut texture);

        let texture = Rc::new(RefCell::new(texture));
        self.cache.add(&texture);
        Ok(texture)
    }

    /// Returns the cached cube texture of `pattern`, or loads its six faces.
    pub fn load_cube_texture(
        &mut self,
        engine: &mut GLEngine,
        loader: &mut dyn TextureFileLoader,
        pattern: &str,
    ) -> Result<Shared<Texture>> {
        if let Some(v) = self.cache.get(pattern) {
            return Ok(v);
        }

        let mut images = Vec::with_capacity(6);
        for file in cube_face_files(pattern)? {
            images.push(loader.load(&file)?);
        }

        let mut texture = Texture::cube_from_images(engine, Some(pattern), &images)?;
        self.finish(engine, &mut texture);

        let texture = Rc::new(RefCell::new(texture));
        self.cache.add(&texture);
        Ok(texture)
    }

    fn finish(&self, engine: &mut GLEngine, texture: &mut Texture) {
        if self.should_generate_mipmaps && texture.is_pot() {
            if let Err(err) = texture.generate_mipmap(engine) {
                warn!("{}", err);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cube_patterns() {
        let files = cube_face_files("env%@.png").unwrap();
        assert_eq!(files[0], "envPosX.png");
        assert_eq!(files[5], "envNegZ.png");
        assert!(cube_face_files("env.png").is_err());
        assert!(cube_face_files("%@env%@.png").is_err());
    }
}
