//! Trackers that only exist in the fixed-function pipeline.

use super::super::consts::*;
use super::super::tracker::*;
use super::super::Device;
use crate::errors::*;
use crate::math::prelude::{Color4F, Vector3, Vector4};

unsafe fn set_light_color(device: &mut dyn Device, p: GLParam, v: Color4F) -> Result<()> {
    device.light_fv(p.target, p.name, v.rgba())
}

unsafe fn set_light_vector4(device: &mut dyn Device, p: GLParam, v: Vector4<f32>) -> Result<()> {
    device.light_fv(p.target, p.name, v.into())
}

unsafe fn set_light_vector3(device: &mut dyn Device, p: GLParam, v: Vector3<f32>) -> Result<()> {
    device.light_fv(p.target, p.name, [v.x, v.y, v.z, 0.0])
}

unsafe fn set_light_float(device: &mut dyn Device, p: GLParam, v: GLfloat) -> Result<()> {
    device.light_f(p.target, p.name, v)
}

unsafe fn set_light_model_color(device: &mut dyn Device, p: GLParam, v: Color4F) -> Result<()> {
    device.light_model_fv(p.name, v.rgba())
}

unsafe fn set_light_model_bool(device: &mut dyn Device, p: GLParam, v: bool) -> Result<()> {
    device.light_model_f(p.name, if v { 1.0 } else { 0.0 })
}

unsafe fn set_fog_float(device: &mut dyn Device, p: GLParam, v: GLfloat) -> Result<()> {
    device.fog_f(p.name, v)
}

unsafe fn set_fog_mode(device: &mut dyn Device, p: GLParam, v: GLenum) -> Result<()> {
    device.fog_f(p.name, v as GLfloat)
}

unsafe fn set_fog_color(device: &mut dyn Device, p: GLParam, v: Color4F) -> Result<()> {
    device.fog_fv(p.name, v.rgba())
}

unsafe fn set_material_color(device: &mut dyn Device, p: GLParam, v: Color4F) -> Result<()> {
    device.material_fv(p.name, v.rgba())
}

unsafe fn set_material_float(device: &mut dyn Device, p: GLParam, v: GLfloat) -> Result<()> {
    device.material_f(p.name, v)
}

unsafe fn set_matrix_mode(device: &mut dyn Device, _: GLParam, v: GLenum) -> Result<()> {
    device.matrix_mode(v)
}

unsafe fn set_palette_index(device: &mut dyn Device, _: GLParam, v: GLuint) -> Result<()> {
    device.current_palette_matrix(v)
}

/// The parameters of one light.
pub struct LightState {
    pub index: usize,
    pub ambient: StateTracker<Color4F>,
    pub diffuse: StateTracker<Color4F>,
    pub specular: StateTracker<Color4F>,
    pub position: StateTracker<Vector4<f32>>,
    pub spot_direction: StateTracker<Vector3<f32>>,
    pub spot_exponent: StateTracker<GLfloat>,
    pub spot_cutoff: StateTracker<GLfloat>,
    pub constant_attenuation: StateTracker<GLfloat>,
    pub linear_attenuation: StateTracker<GLfloat>,
    pub quadratic_attenuation: StateTracker<GLfloat>,
}

impl LightState {
    pub fn new(index: usize) -> Self {
        let light = LIGHT0 + index as GLenum;
        let color = |label, name, initial| {
            StateTracker::new(
                label,
                GLParam::with_target(light, name),
                initial,
                Some(set_light_color),
                Some(get_light_color),
            )
        };

        let float = |label, name, initial| {
            StateTracker::new(
                label,
                GLParam::with_target(light, name),
                initial,
                Some(set_light_float),
                Some(get_light_float),
            )
        };

        LightState {
            index,
            ambient: color("AMBIENT", AMBIENT, Color4F::black()),
            diffuse: color("DIFFUSE", DIFFUSE, Color4F::black()),
            specular: color("SPECULAR", SPECULAR, Color4F::black()),
            position: StateTracker::new(
                "POSITION",
                GLParam::with_target(light, POSITION),
                Vector4::new(0.0, 0.0, 1.0, 0.0),
                Some(set_light_vector4),
                Some(get_light_vector4),
            ),
            spot_direction: StateTracker::new(
                "SPOT_DIRECTION",
                GLParam::with_target(light, SPOT_DIRECTION),
                Vector3::new(0.0, 0.0, -1.0),
                Some(set_light_vector3),
                Some(get_light_vector3),
            ),
            spot_exponent: float("SPOT_EXPONENT", SPOT_EXPONENT, 0.0),
            spot_cutoff: float("SPOT_CUTOFF", SPOT_CUTOFF, 180.0),
            constant_attenuation: float("CONSTANT_ATTENUATION", CONSTANT_ATTENUATION, 1.0),
            linear_attenuation: float("LINEAR_ATTENUATION", LINEAR_ATTENUATION, 0.0),
            quadratic_attenuation: float("QUADRATIC_ATTENUATION", QUADRATIC_ATTENUATION, 0.0),
        }
    }

    fn close(&mut self, device: &mut dyn Device) {
        self.ambient.close(device);
        self.diffuse.close(device);
        self.specular.close(device);
        self.position.close(device);
        self.spot_direction.close(device);
        self.spot_exponent.close(device);
        self.spot_cutoff.close(device);
        self.constant_attenuation.close(device);
        self.linear_attenuation.close(device);
        self.quadratic_attenuation.close(device);
    }
}

/// Lights and the light model. The on/off switch of each light is a capability.
pub struct Lighting {
    lights: Vec<Option<LightState>>,
    pub model_ambient: StateTracker<Color4F>,
    pub two_side: StateTracker<bool>,
}

impl Default for Lighting {
    fn default() -> Self {
        Lighting {
            lights: Vec::new(),
            model_ambient: StateTracker::new(
                "LIGHT_MODEL_AMBIENT",
                GLParam::new(LIGHT_MODEL_AMBIENT),
                Color4F::new(0.2, 0.2, 0.2, 1.0),
                Some(set_light_model_color),
                None,
            ),
            two_side: StateTracker::new(
                "LIGHT_MODEL_TWO_SIDE",
                GLParam::new(LIGHT_MODEL_TWO_SIDE),
                false,
                Some(set_light_model_bool),
                None,
            ),
        }
    }
}

impl Lighting {
    /// Returns the trackers of the light at `index`, creating them on first use.
    pub fn light_mut(&mut self, index: usize) -> &mut LightState {
        while self.lights.len() <= index {
            self.lights.push(None);
        }

        self.lights[index].get_or_insert_with(|| LightState::new(index))
    }

    pub fn light(&self, index: usize) -> Option<&LightState> {
        self.lights.get(index).and_then(|v| v.as_ref())
    }

    pub fn close(&mut self, device: &mut dyn Device) {
        for v in self.lights.iter_mut().filter_map(|v| v.as_mut()) {
            v.close(device);
        }

        self.model_ambient.close(device);
        self.two_side.close(device);
    }
}

pub struct Fog {
    pub mode: StateTracker<GLenum>,
    pub density: StateTracker<GLfloat>,
    pub start: StateTracker<GLfloat>,
    pub end: StateTracker<GLfloat>,
    pub color: StateTracker<Color4F>,
}

impl Default for Fog {
    fn default() -> Self {
        let float = |label, name, initial| {
            StateTracker::new(label, GLParam::new(name), initial, Some(set_fog_float), Some(get_float))
        };

        Fog {
            mode: StateTracker::new(
                "FOG_MODE",
                GLParam::new(FOG_MODE),
                EXP,
                Some(set_fog_mode),
                Some(get_enum),
            ),
            density: float("FOG_DENSITY", FOG_DENSITY, 1.0),
            start: float("FOG_START", FOG_START, 0.0),
            end: float("FOG_END", FOG_END, 1.0),
            color: StateTracker::new(
                "FOG_COLOR",
                GLParam::new(FOG_COLOR),
                Color4F::transparent(),
                Some(set_fog_color),
                Some(get_color),
            ),
        }
    }
}

impl Fog {
    pub fn close(&mut self, device: &mut dyn Device) {
        self.mode.close(device);
        self.density.close(device);
        self.start.close(device);
        self.end.close(device);
        self.color.close(device);
    }
}

pub struct Hints {
    pub fog: StateTracker<GLenum>,
    pub generate_mipmap: StateTracker<GLenum>,
    pub line_smooth: StateTracker<GLenum>,
    pub perspective_correction: StateTracker<GLenum>,
    pub point_smooth: StateTracker<GLenum>,
}

impl Default for Hints {
    fn default() -> Self {
        let hint = |label, name| {
            StateTracker::new(label, GLParam::new(name), DONT_CARE, Some(set_hint), Some(get_enum))
        };

        Hints {
            fog: hint("FOG_HINT", FOG_HINT),
            generate_mipmap: hint("GENERATE_MIPMAP_HINT", GENERATE_MIPMAP_HINT),
            line_smooth: hint("LINE_SMOOTH_HINT", LINE_SMOOTH_HINT),
            perspective_correction: hint("PERSPECTIVE_CORRECTION_HINT", PERSPECTIVE_CORRECTION_HINT),
            point_smooth: hint("POINT_SMOOTH_HINT", POINT_SMOOTH_HINT),
        }
    }
}

impl Hints {
    pub fn get_mut(&mut self, target: GLenum) -> Option<&mut StateTracker<GLenum>> {
        match target {
            FOG_HINT => Some(&mut self.fog),
            GENERATE_MIPMAP_HINT => Some(&mut self.generate_mipmap),
            LINE_SMOOTH_HINT => Some(&mut self.line_smooth),
            PERSPECTIVE_CORRECTION_HINT => Some(&mut self.perspective_correction),
            POINT_SMOOTH_HINT => Some(&mut self.point_smooth),
            _ => None,
        }
    }

    pub fn close(&mut self, device: &mut dyn Device) {
        self.fog.close(device);
        self.generate_mipmap.close(device);
        self.line_smooth.close(device);
        self.perspective_correction.close(device);
        self.point_smooth.close(device);
    }
}

/// The front-and-back material of the fixed-function lighting model.
pub struct MaterialState {
    pub ambient: StateTracker<Color4F>,
    pub diffuse: StateTracker<Color4F>,
    pub specular: StateTracker<Color4F>,
    pub emission: StateTracker<Color4F>,
    pub shininess: StateTracker<GLfloat>,
}

impl Default for MaterialState {
    fn default() -> Self {
        let color = |label, name, initial| {
            StateTracker::new(label, GLParam::new(name), initial, Some(set_material_color), None)
        };

        MaterialState {
            ambient: color("MATERIAL_AMBIENT", AMBIENT, Color4F::new(0.2, 0.2, 0.2, 1.0)),
            diffuse: color("MATERIAL_DIFFUSE", DIFFUSE, Color4F::new(0.8, 0.8, 0.8, 1.0)),
            specular: color("MATERIAL_SPECULAR", SPECULAR, Color4F::black()),
            emission: color("MATERIAL_EMISSION", EMISSION, Color4F::black()),
            shininess: StateTracker::new(
                "MATERIAL_SHININESS",
                GLParam::new(SHININESS),
                0.0,
                Some(set_material_float),
                None,
            ),
        }
    }
}

impl MaterialState {
    pub fn close(&mut self, device: &mut dyn Device) {
        self.ambient.close(device);
        self.diffuse.close(device);
        self.specular.close(device);
        self.emission.close(device);
        self.shininess.close(device);
    }
}

/// The matrix mode and the palette matrix selector. Matrix contents are not cached:
/// every load reaches GL.
pub struct Matrices {
    pub mode: StateTracker<GLenum>,
    pub palette_index: StateTracker<GLuint>,
}

impl Default for Matrices {
    fn default() -> Self {
        Matrices {
            mode: StateTracker::new(
                "MATRIX_MODE",
                GLParam::new(MATRIX_MODE),
                MODELVIEW,
                Some(set_matrix_mode),
                Some(get_enum),
            ),
            palette_index: StateTracker::new(
                "CURRENT_PALETTE_MATRIX_OES",
                GLParam::new(CURRENT_PALETTE_MATRIX_OES),
                0,
                Some(set_palette_index),
                Some(get_uint),
            ),
        }
    }
}

impl Matrices {
    pub fn close(&mut self, device: &mut dyn Device) {
        self.mode.close(device);
        self.palette_index.close(device);
    }
}
