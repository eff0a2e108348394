//! Surface appearance: lighting colors, blending, alpha testing and textures.

use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::identity::prelude::Shared;
use crate::identity::{Identifiable, Identity};
use crate::math::color::{byte_from_float, float_from_byte};
use crate::math::prelude::{Color4F, Vector3, Zero};

use super::texture::Texture;
use super::texture_unit::TextureUnit;

pub const DEFAULT_AMBIENT: Color4F = Color4F {
    r: 0.2,
    g: 0.2,
    b: 0.2,
    a: 1.0,
};

pub const DEFAULT_DIFFUSE: Color4F = Color4F {
    r: 0.8,
    g: 0.8,
    b: 0.8,
    a: 1.0,
};

pub const DEFAULT_SPECULAR: Color4F = Color4F {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

pub const DEFAULT_EMISSION: Color4F = Color4F {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// The maximum shininess accepted by GL.
pub const MAX_SHININESS: f32 = 128.0;

/// The source and destination factors of blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendFunc {
    pub src: GLenum,
    pub dst: GLenum,
}

impl BlendFunc {
    pub const OPAQUE: BlendFunc = BlendFunc { src: ONE, dst: ZERO };

    pub fn new(src: GLenum, dst: GLenum) -> Self {
        BlendFunc { src, dst }
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self == BlendFunc::OPAQUE
    }
}

/// Comparisons of the alpha test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaFunc {
    Always,
    Never,
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
    NotEqual,
}

impl AlphaFunc {
    pub fn to_gl(self) -> GLenum {
        match self {
            AlphaFunc::Always => ALWAYS,
            AlphaFunc::Never => NEVER,
            AlphaFunc::Less => LESS,
            AlphaFunc::LessOrEqual => LEQUAL,
            AlphaFunc::Equal => EQUAL,
            AlphaFunc::GreaterOrEqual => GEQUAL,
            AlphaFunc::Greater => GREATER,
            AlphaFunc::NotEqual => NOTEQUAL,
        }
    }
}

/// The appearance of a mesh.
///
/// Opacity and blending are coupled. Making a material translucent through
/// `set_opacity` switches the blend pair to one that suits the alpha mode of the
/// attached textures, but restoring full opacity leaves blending alone. Use
/// `set_is_opaque(true)` for that.
#[derive(Debug, Clone)]
pub struct Material {
    identity: Identity,
    ambient: Color4F,
    diffuse: Color4F,
    specular: Color4F,
    emission: Color4F,
    shininess: f32,
    blend: BlendFunc,
    alpha_func: AlphaFunc,
    alpha_reference: f32,
    should_use_lighting: bool,
    should_draw_low_alpha: bool,
    units: Vec<TextureUnit>,
    max_texture_units: usize,
}

impl Identifiable for Material {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::new(None::<&str>)
    }
}

impl Material {
    pub fn new<T: AsRef<str>>(name: Option<T>) -> Self {
        Material {
            identity: Identity::new(name),
            ambient: DEFAULT_AMBIENT,
            diffuse: DEFAULT_DIFFUSE,
            specular: DEFAULT_SPECULAR,
            emission: DEFAULT_EMISSION,
            shininess: 0.0,
            blend: BlendFunc::OPAQUE,
            alpha_func: AlphaFunc::Always,
            alpha_reference: 0.0,
            should_use_lighting: true,
            should_draw_low_alpha: true,
            units: Vec::new(),
            max_texture_units: usize::max_value(),
        }
    }

    /// Creates a material with a white specular highlight.
    pub fn shiny<T: AsRef<str>>(name: Option<T>) -> Self {
        let mut material = Material::new(name);
        material.specular = Color4F::white();
        material.shininess = 75.0;
        material
    }

    /// Creates a shiny material whose lighting colors are all white.
    pub fn shiny_white<T: AsRef<str>>(name: Option<T>) -> Self {
        let mut material = Material::shiny(name);
        material.ambient = Color4F::white();
        material.diffuse = Color4F::white();
        material
    }

    /// Returns a copy with a fresh tag. Textures are shared with the original.
    pub fn copy(&self) -> Self {
        let mut material = self.clone();
        material.identity = self.identity.copy();
        material
    }

    #[inline]
    pub fn ambient(&self) -> Color4F {
        self.ambient
    }

    #[inline]
    pub fn set_ambient(&mut self, color: Color4F) {
        self.ambient = color;
    }

    #[inline]
    pub fn diffuse(&self) -> Color4F {
        self.diffuse
    }

    #[inline]
    pub fn set_diffuse(&mut self, color: Color4F) {
        self.diffuse = color;
    }

    #[inline]
    pub fn specular(&self) -> Color4F {
        self.specular
    }

    #[inline]
    pub fn set_specular(&mut self, color: Color4F) {
        self.specular = color;
    }

    #[inline]
    pub fn emission(&self) -> Color4F {
        self.emission
    }

    #[inline]
    pub fn set_emission(&mut self, color: Color4F) {
        self.emission = color;
    }

    #[inline]
    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    /// Sets the specular exponent, clamped into `[0, 128]`.
    pub fn set_shininess(&mut self, shininess: f32) {
        self.shininess = shininess.max(0.0).min(MAX_SHININESS);
    }

    /// The RGB of the diffuse color, with full alpha.
    pub fn color(&self) -> Color4F {
        self.diffuse.with_alpha(1.0)
    }

    /// Writes the RGB of `color` into the ambient and diffuse colors. Alpha is kept.
    pub fn set_color(&mut self, color: Color4F) {
        self.ambient = Color4F::new(color.r, color.g, color.b, self.ambient.a);
        self.diffuse = Color4F::new(color.r, color.g, color.b, self.diffuse.a);
    }

    /// The opacity, read from the alpha of the diffuse color.
    pub fn opacity(&self) -> u8 {
        byte_from_float(self.diffuse.a)
    }

    /// Writes the alpha of every lighting color. Any opacity below 255 makes the
    /// material translucent.
    pub fn set_opacity(&mut self, opacity: u8) {
        let a = float_from_byte(opacity);
        self.ambient.a = a;
        self.diffuse.a = a;
        self.specular.a = a;
        self.emission.a = a;

        if opacity < 255 {
            self.set_is_opaque(false);
        }
    }

    #[inline]
    pub fn blend_func(&self) -> BlendFunc {
        self.blend
    }

    #[inline]
    pub fn set_blend_func(&mut self, blend: BlendFunc) {
        self.blend = blend;
    }

    #[inline]
    pub fn source_blend(&self) -> GLenum {
        self.blend.src
    }

    #[inline]
    pub fn destination_blend(&self) -> GLenum {
        self.blend.dst
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.blend.is_opaque()
    }

    /// Switches between the opaque blend pair and a translucent one. The source factor
    /// of the translucent pair is `ONE` if any texture has premultiplied alpha.
    pub fn set_is_opaque(&mut self, opaque: bool) {
        self.blend = if opaque {
            BlendFunc::OPAQUE
        } else if self.has_premultiplied_alpha() {
            BlendFunc::new(ONE, ONE_MINUS_SRC_ALPHA)
        } else {
            BlendFunc::new(SRC_ALPHA, ONE_MINUS_SRC_ALPHA)
        };
    }

    /// Picks the translucent pair again after the textures change, unless the blend was
    /// set by hand.
    fn refresh_translucent_blend(&mut self) {
        let automatic = self.blend == BlendFunc::new(SRC_ALPHA, ONE_MINUS_SRC_ALPHA)
            || self.blend == BlendFunc::new(ONE, ONE_MINUS_SRC_ALPHA);
        if automatic {
            self.set_is_opaque(false);
        }
    }

    /// Whether any attached texture holds premultiplied alpha.
    pub fn has_premultiplied_alpha(&self) -> bool {
        self.units.iter().any(|v| v.has_premultiplied_alpha())
    }

    /// Whether colors are premultiplied by their alpha before they are submitted.
    pub fn should_apply_opacity_to_color(&self) -> bool {
        self.blend.src == ONE && self.has_premultiplied_alpha()
    }

    #[inline]
    pub fn alpha_func(&self) -> AlphaFunc {
        self.alpha_func
    }

    #[inline]
    pub fn alpha_reference(&self) -> f32 {
        self.alpha_reference
    }

    /// Sets the alpha test. The reference is clamped into `[0, 1]`.
    pub fn set_alpha_test(&mut self, func: AlphaFunc, reference: f32) {
        self.alpha_func = func;
        self.alpha_reference = reference.max(0.0).min(1.0);
    }

    #[inline]
    pub fn should_use_lighting(&self) -> bool {
        self.should_use_lighting
    }

    #[inline]
    pub fn set_should_use_lighting(&mut self, v: bool) {
        self.should_use_lighting = v;
    }

    /// If false, fragments with zero alpha are discarded while the alpha test is
    /// otherwise `ALWAYS`.
    #[inline]
    pub fn should_draw_low_alpha(&self) -> bool {
        self.should_draw_low_alpha
    }

    #[inline]
    pub fn set_should_draw_low_alpha(&mut self, v: bool) {
        self.should_draw_low_alpha = v;
    }

    /// The alpha test that is actually submitted.
    pub fn effective_alpha_test(&self) -> (AlphaFunc, f32) {
        if self.alpha_func == AlphaFunc::Always && !self.should_draw_low_alpha {
            (AlphaFunc::Greater, 0.0)
        } else {
            (self.alpha_func, self.alpha_reference)
        }
    }

    /// Bounds the number of texture units, usually by `GLEngine::max_texture_units`.
    /// Units already attached beyond the bound are dropped.
    pub fn set_max_texture_units(&mut self, max: usize) {
        self.max_texture_units = max;
        if self.units.len() > max {
            info!(
                "Material {} drops {} textures beyond the limit of {} units.",
                self.describe(),
                self.units.len() - max,
                max
            );
            self.units.truncate(max);
        }
    }

    #[inline]
    pub fn texture_unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn texture_units(&self) -> &[TextureUnit] {
        &self.units
    }

    pub fn texture_unit(&self, index: usize) -> Option<&TextureUnit> {
        self.units.get(index)
    }

    pub fn texture_unit_mut(&mut self, index: usize) -> Option<&mut TextureUnit> {
        self.units.get_mut(index)
    }

    /// The texture of the first unit.
    pub fn texture(&self) -> Option<&Shared<Texture>> {
        self.units.first().map(|v| v.texture())
    }

    /// Replaces the texture of the first unit, or removes every texture if `None`.
    pub fn set_texture(&mut self, texture: Option<Shared<Texture>>) {
        match texture {
            Some(texture) => {
                if let Some(unit) = self.units.first_mut() {
                    unit.set_texture(texture);
                } else {
                    self.add_texture_unit(TextureUnit::new(texture));
                }

                self.refresh_translucent_blend();
            }
            None => self.remove_all_textures(),
        }
    }

    pub fn add_texture(&mut self, texture: Shared<Texture>) -> bool {
        self.add_texture_unit(TextureUnit::new(texture))
    }

    /// Appends a unit. Returns false, and drops the unit, if every unit is taken.
    pub fn add_texture_unit(&mut self, unit: TextureUnit) -> bool {
        if self.units.len() >= self.max_texture_units {
            info!(
                "Material {} can not hold more than {} textures.",
                self.describe(),
                self.max_texture_units
            );
            return false;
        }

        self.units.push(unit);
        self.refresh_translucent_blend();
        true
    }

    /// Removes the unit that refers to `texture`.
    pub fn remove_texture(&mut self, texture: &Shared<Texture>) {
        let tag = texture.borrow().tag();
        self.units.retain(|v| v.texture().borrow().tag() != tag);
        self.refresh_translucent_blend();
    }

    pub fn remove_all_textures(&mut self) {
        self.units.clear();
        self.refresh_translucent_blend();
    }

    /// The light direction of the first bump map unit, or zero.
    pub fn light_direction(&self) -> Vector3<f32> {
        self.units
            .iter()
            .find(|v| v.is_bump_map())
            .map(|v| v.light_direction())
            .unwrap_or_else(Vector3::zero)
    }

    /// Sets the light direction of every bump map unit.
    pub fn set_light_direction(&mut self, direction: Vector3<f32>) {
        for v in self.units.iter_mut().filter(|v| v.is_bump_map()) {
            v.set_light_direction(direction);
        }
    }

    pub fn has_bump_map(&self) -> bool {
        self.units.iter().any(|v| v.is_bump_map())
    }

    /// Applies the material to the engine state.
    pub fn bind(&self, engine: &mut GLEngine) {
        self.bind_blending(engine);
        self.bind_alpha_test(engine);
        self.bind_colors(engine);
        self.bind_textures(engine);
    }

    /// Restores the state of an engine that draws without a material.
    pub fn unbind(engine: &mut GLEngine) {
        engine.enable(BLEND, false);
        engine.enable(ALPHA_TEST, false);
        engine.enable(LIGHTING, false);
        engine.set_color(Color4F::white());
        for unit in 0..engine.texture_units().len() {
            TextureUnit::unbind(engine, unit);
        }
    }

    fn bind_blending(&self, engine: &mut GLEngine) {
        if self.is_opaque() {
            engine.enable(BLEND, false);
        } else {
            engine.enable(BLEND, true);
            engine.set_blend_func(self.blend.src, self.blend.dst);
        }
    }

    fn bind_alpha_test(&self, engine: &mut GLEngine) {
        let (func, reference) = self.effective_alpha_test();
        if func == AlphaFunc::Always {
            engine.enable(ALPHA_TEST, false);
        } else {
            engine.enable(ALPHA_TEST, true);
            engine.set_alpha_func(func.to_gl(), reference);
        }
    }

    fn bind_colors(&self, engine: &mut GLEngine) {
        let premultiply = self.should_apply_opacity_to_color();
        let submit = |c: Color4F| if premultiply { c.premultiplied() } else { c };

        if self.should_use_lighting {
            engine.enable(LIGHTING, true);
            engine.set_material_ambient(submit(self.ambient));
            engine.set_material_diffuse(submit(self.diffuse));
            engine.set_material_specular(submit(self.specular));
            engine.set_material_emission(submit(self.emission));
            engine.set_material_shininess(self.shininess);
        } else {
            engine.enable(LIGHTING, false);
            engine.set_color(submit(self.diffuse));
        }
    }

    fn bind_textures(&self, engine: &mut GLEngine) {
        let max = engine.max_texture_units() as usize;
        if self.units.len() > max {
            info!(
                "Material {} binds {} of its {} textures.",
                self.describe(),
                max,
                self.units.len()
            );
        }

        let bound = self.units.len().min(max);
        for (i, v) in self.units.iter().take(bound).enumerate() {
            v.bind(engine, i);
        }

        for unit in bound..engine.texture_units().len() {
            TextureUnit::unbind(engine, unit);
        }
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

    fn texture(engine: &mut GLEngine, premultiplied: bool) -> Shared<Texture> {
        let mut image = TextureImage::solid(IntSize::new(4, 4), Color4B::white());
        image.has_premultiplied_alpha = premultiplied;
        Rc::new(RefCell::new(
            Texture::from_image(engine, None, &image).unwrap(),
        ))
    }

    #[test]
    fn opacity() {
        let mut material = Material::default();
        assert!(material.is_opaque());
        assert_eq!(material.opacity(), 255);

        for v in 0..256 {
            material.set_opacity(v as u8);
            assert_eq!(material.opacity(), v as u8);
        }

        material.set_opacity(128);
        assert_eq!(material.ambient().a, material.emission().a);
        assert_eq!(material.blend_func(), BlendFunc::new(SRC_ALPHA, ONE_MINUS_SRC_ALPHA));

        material.set_opacity(255);
        assert!(!material.is_opaque());

        material.set_is_opaque(true);
        assert_eq!(material.blend_func(), BlendFunc::new(ONE, ZERO));
    }

    #[test]
    fn color() {
        let mut material = Material::default();
        material.set_opacity(100);

        let c = Color4F::new(0.1, 0.2, 0.3, 0.9);
        material.set_color(c);
        let (ambient, diffuse) = (material.ambient(), material.diffuse());
        material.set_color(c);
        assert_eq!(material.ambient(), ambient);
        assert_eq!(material.diffuse(), diffuse);
        assert_eq!(material.opacity(), 100);
        assert_eq!(material.color(), c.with_alpha(1.0));
    }

    #[test]
    fn premultiplied_textures() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut material = Material::default();
        material.add_texture(texture(&mut engine, true));
        material.set_should_use_lighting(false);
        material.set_opacity(51);
        assert_eq!(material.blend_func(), BlendFunc::new(ONE, ONE_MINUS_SRC_ALPHA));
        assert!(material.should_apply_opacity_to_color());

        engine.open();
        material.bind(&mut engine);
        assert!(probe.is_enabled(BLEND));
        assert_eq!(probe.blend_func(), (ONE, ONE_MINUS_SRC_ALPHA));
        let color = probe.current_color();
        assert!((color.r - 0.8 * 0.2).abs() < 1e-3);
        engine.close();
    }

    #[test]
    fn textures_added_to_translucent_material() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let mut material = Material::default();
        material.set_opacity(128);
        assert_eq!(material.blend_func(), BlendFunc::new(SRC_ALPHA, ONE_MINUS_SRC_ALPHA));

        let premultiplied = texture(&mut engine, true);
        material.add_texture(premultiplied.clone());
        assert_eq!(material.blend_func(), BlendFunc::new(ONE, ONE_MINUS_SRC_ALPHA));
        assert!(material.should_apply_opacity_to_color());

        material.remove_texture(&premultiplied);
        assert_eq!(material.blend_func(), BlendFunc::new(SRC_ALPHA, ONE_MINUS_SRC_ALPHA));

        // Opaque and hand picked blends stay as they are.
        material.set_is_opaque(true);
        material.add_texture(premultiplied.clone());
        assert!(material.is_opaque());

        material.remove_all_textures();
        material.set_blend_func(BlendFunc::new(SRC_ALPHA, ONE));
        material.set_texture(Some(premultiplied));
        assert_eq!(material.blend_func(), BlendFunc::new(SRC_ALPHA, ONE));
    }

    #[test]
    fn alpha_test() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut material = Material::default();
        material.bind(&mut engine);
        assert!(!probe.is_enabled(ALPHA_TEST));

        material.set_alpha_test(AlphaFunc::GreaterOrEqual, 2.0);
        assert_eq!(material.alpha_reference(), 1.0);
        material.bind(&mut engine);
        assert!(probe.is_enabled(ALPHA_TEST));

        material.set_alpha_test(AlphaFunc::Always, 0.5);
        material.set_should_draw_low_alpha(false);
        assert_eq!(material.effective_alpha_test(), (AlphaFunc::Greater, 0.0));
    }

    #[test]
    fn texture_units() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let max = engine.max_texture_units() as usize;

        let mut material = Material::default();
        material.set_max_texture_units(max);
        for _ in 0..max {
            assert!(material.add_texture(texture(&mut engine, false)));
        }
        assert!(!material.add_texture(texture(&mut engine, false)));
        assert_eq!(material.texture_unit_count(), max);

        material.bind(&mut engine);
        assert!(probe.is_texture_enabled(TEXTURE0 + 1, TEXTURE_2D));

        let first = material.texture().unwrap().clone();
        material.remove_all_textures();
        material.add_texture(first);
        material.bind(&mut engine);
        assert!(probe.is_texture_enabled(TEXTURE0, TEXTURE_2D));
        assert!(!probe.is_texture_enabled(TEXTURE0 + 1, TEXTURE_2D));
    }

    #[test]
    fn bump_map_direction() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let mut material = Material::default();
        material.add_texture(texture(&mut engine, false));
        assert_eq!(material.light_direction(), Vector3::zero());

        let unit = TextureUnit::bump_map(texture(&mut engine, false), Vector3::unit_z());
        material.add_texture_unit(unit);
        material.set_light_direction(Vector3::unit_x());
        assert_eq!(material.light_direction(), Vector3::unit_x());
        assert_eq!(material.texture_unit(0).unwrap().light_direction(), Vector3::zero());
    }
}
