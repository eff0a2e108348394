use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::identity::prelude::Shared;
use crate::math::prelude::{Color4F, InnerSpace, Vector3, Zero};

use super::texture::Texture;

/// How the texture of a unit is combined with the output of the previous unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureEnvMode {
    Modulate,
    Replace,
    Decal,
    Add,
    /// Dot product of the texel (a tangent space normal) and the constant color, which
    /// encodes the light direction.
    BumpMap,
}

/// A texture attached to a material, and the way its texture unit is configured.
#[derive(Debug, Clone)]
pub struct TextureUnit {
    texture: Shared<Texture>,
    mode: TextureEnvMode,
    constant_color: Color4F,
    light_direction: Vector3<f32>,
}

impl TextureUnit {
    pub fn new(texture: Shared<Texture>) -> Self {
        TextureUnit {
            texture,
            mode: TextureEnvMode::Modulate,
            constant_color: Color4F::transparent(),
            light_direction: Vector3::zero(),
        }
    }

    /// Creates a unit that treats the texture as a tangent space normal map.
    pub fn bump_map(texture: Shared<Texture>, light_direction: Vector3<f32>) -> Self {
        let mut unit = TextureUnit::new(texture);
        unit.mode = TextureEnvMode::BumpMap;
        unit.set_light_direction(light_direction);
        unit
    }

    #[inline]
    pub fn texture(&self) -> &Shared<Texture> {
        &self.texture
    }

    #[inline]
    pub fn set_texture(&mut self, texture: Shared<Texture>) {
        self.texture = texture;
    }

    #[inline]
    pub fn mode(&self) -> TextureEnvMode {
        self.mode
    }

    #[inline]
    pub fn set_mode(&mut self, mode: TextureEnvMode) {
        self.mode = mode;
    }

    #[inline]
    pub fn constant_color(&self) -> Color4F {
        self.constant_color
    }

    #[inline]
    pub fn set_constant_color(&mut self, color: Color4F) {
        self.constant_color = color;
    }

    #[inline]
    pub fn is_bump_map(&self) -> bool {
        self.mode == TextureEnvMode::BumpMap
    }

    /// The light direction in tangent space. Zero unless this is a bump map unit.
    pub fn light_direction(&self) -> Vector3<f32> {
        if self.is_bump_map() {
            self.light_direction
        } else {
            Vector3::zero()
        }
    }

    /// Sets the light direction, which is packed into the constant color as
    /// `(v + 1) / 2`. Ignored by units that are not bump maps.
    pub fn set_light_direction(&mut self, v: Vector3<f32>) {
        if !self.is_bump_map() {
            return;
        }

        let n = if v.magnitude2() > 0.0 { v.normalize() } else { v };
        self.light_direction = v;
        self.constant_color = Color4F::new(
            (n.x + 1.0) * 0.5,
            (n.y + 1.0) * 0.5,
            (n.z + 1.0) * 0.5,
            1.0,
        );
    }

    #[inline]
    pub fn has_premultiplied_alpha(&self) -> bool {
        self.texture.borrow().has_premultiplied_alpha()
    }

    /// Binds the texture to `unit` and configures its environment.
    pub fn bind(&self, engine: &mut GLEngine, unit: usize) {
        let texture = self.texture.borrow();
        texture.bind(engine, unit);

        let (target, other) = if texture.is_cube() {
            (TEXTURE_CUBE_MAP, TEXTURE_2D)
        } else {
            (TEXTURE_2D, TEXTURE_CUBE_MAP)
        };

        engine.enable_texturing(unit, other, false);
        engine.enable_texturing(unit, target, true);
        engine.enable_texcoord_array(unit, true);

        match self.mode {
            TextureEnvMode::Modulate => engine.set_texture_env_mode(unit, MODULATE),
            TextureEnvMode::Replace => engine.set_texture_env_mode(unit, REPLACE),
            TextureEnvMode::Decal => engine.set_texture_env_mode(unit, DECAL),
            TextureEnvMode::Add => engine.set_texture_env_mode(unit, ADD),
            TextureEnvMode::BumpMap => engine.set_texture_combine(unit, DOT3_RGB, TEXTURE, CONSTANT),
        }

        engine.set_texture_env_color(unit, self.constant_color);
    }

    /// Disables texturing of `unit`.
    pub fn unbind(engine: &mut GLEngine, unit: usize) {
        engine.enable_texturing(unit, TEXTURE_2D, false);
        engine.enable_texturing(unit, TEXTURE_CUBE_MAP, false);
        engine.enable_texcoord_array(unit, false);
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::super::texture::TextureImage;
    use super::*;
    use crate::gles::EngineParams;
    use crate::math::prelude::{Color4B, IntSize};

    #[test]
    fn bump_map() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let image = TextureImage::solid(IntSize::new(2, 2), Color4B::white());
        let texture = Rc::new(RefCell::new(
            Texture::from_image(&mut engine, None, &image).unwrap(),
        ));

        let mut unit = TextureUnit::new(texture.clone());
        unit.set_light_direction(Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(unit.light_direction(), Vector3::zero());

        let mut unit = TextureUnit::bump_map(texture, Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(unit.light_direction(), Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(unit.constant_color(), Color4F::new(0.5, 0.5, 1.0, 1.0));

        unit.bind(&mut engine, 1);
        let unit1 = TEXTURE0 + 1;
        assert!(probe.is_texture_enabled(unit1, TEXTURE_2D));
        assert_eq!(probe.tex_env(unit1, TEXTURE_ENV_MODE)[0], COMBINE as f32);
        assert_eq!(probe.tex_env(unit1, COMBINE_RGB)[0], DOT3_RGB as f32);

        TextureUnit::unbind(&mut engine, 1);
        assert!(!probe.is_texture_enabled(unit1, TEXTURE_2D));
    }
}
