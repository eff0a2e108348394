//! The OpenGL state tracker.
//!
//! Every mutable piece of GL state is wrapped in a tracker that remembers its last
//! value, its original value at `open`, and a policy telling whether that original is
//! read from GL and restored at `close`. Writes only reach GL when the value differs
//! from the cached one, so redundant state changes are filtered out before they cost
//! a driver call.
//!
//! A frame is bracketed by `GLEngine::open` and `GLEngine::close`. The 2d overlay that
//! shares the context may rely on these settings being restored on `close`:
//!
//! - blending and depth testing enabled/disabled;
//! - the texture bound to texture unit 0 and the active texture unit;
//! - the current color;
//! - the viewport and scissor box.
//!
//! Every other setting is left as the 3d pass set it.

pub mod consts;
pub mod device;
pub mod engine;
pub mod groups;
pub mod headless;
pub mod release;
pub mod tracker;

pub mod prelude {
    pub use super::engine::GLEngine;
    pub use super::headless::{HeadlessDevice, HeadlessProbe};
    pub use super::tracker::{GLParam, OriginalValuePolicy, StateTracker};
    pub use super::{ArrayPointer, Device, EngineParams, Pipeline};
}

use std::os::raw::c_void;

use self::consts::*;
use crate::errors::*;
use crate::math::prelude::{Color4B, IntSize, Viewport};

/// Which rendering pipeline the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pipeline {
    /// The fixed-function pipeline with the matrix palette extension.
    FixedFunction,
    /// Shader based rendering. Matrix palettes are uploaded as uniform arrays.
    Programmable,
}

/// Settings of the state tracker root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub pipeline: Pipeline,
    /// Arms the trackers whose values the 2d overlay expects back on `close`.
    pub restore_overlay_state: bool,
    /// Caps the number of texture units reported by the platform.
    pub max_texture_units_hint: Option<u32>,
}

impl Default for EngineParams {
    fn default() -> Self {
        EngineParams {
            pipeline: Pipeline::FixedFunction,
            restore_overlay_state: true,
            max_texture_units_hint: None,
        }
    }
}

impl EngineParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The layout of one client vertex array, as passed to `gl*Pointer`.
///
/// With a buffer bound, `offset` is a byte offset into it; otherwise it is the address
/// of client memory. The tracker treats the whole struct as an opaque pointer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayPointer {
    pub buffer: GLuint,
    pub size: GLint,
    pub ty: GLenum,
    pub stride: GLsizei,
    pub offset: usize,
}

impl Default for ArrayPointer {
    fn default() -> Self {
        ArrayPointer {
            buffer: 0,
            size: 0,
            ty: FLOAT,
            stride: 0,
            offset: 0,
        }
    }
}

impl ArrayPointer {
    #[inline]
    pub fn as_ptr(&self) -> *const c_void {
        self.offset as *const c_void
    }
}

/// The low-level GL calls the trackers are built on.
///
/// Every call either succeeds or returns the GL error it raised. Implementations must
/// not cache anything; filtering redundant calls is the job of the trackers.
pub trait Device {
    unsafe fn is_enabled(&mut self, cap: GLenum) -> Result<bool>;
    unsafe fn get_integer_v(&mut self, name: GLenum, out: &mut [GLint]) -> Result<()>;
    unsafe fn get_float_v(&mut self, name: GLenum, out: &mut [GLfloat]) -> Result<()>;
    unsafe fn get_light_fv(&mut self, light: GLenum, name: GLenum, out: &mut [GLfloat])
        -> Result<()>;

    unsafe fn set_capability(&mut self, cap: GLenum, enabled: bool) -> Result<()>;
    unsafe fn set_client_capability(&mut self, cap: GLenum, enabled: bool) -> Result<()>;

    unsafe fn blend_func(&mut self, src: GLenum, dst: GLenum) -> Result<()>;
    unsafe fn alpha_func(&mut self, func: GLenum, reference: GLfloat) -> Result<()>;
    unsafe fn clear_color(&mut self, color: [GLfloat; 4]) -> Result<()>;
    unsafe fn clear_depth(&mut self, depth: GLfloat) -> Result<()>;
    unsafe fn clear_stencil(&mut self, stencil: GLint) -> Result<()>;
    unsafe fn color_4f(&mut self, color: [GLfloat; 4]) -> Result<()>;
    unsafe fn color_4ub(&mut self, color: Color4B) -> Result<()>;
    unsafe fn color_mask(&mut self, mask: [bool; 4]) -> Result<()>;
    unsafe fn cull_face(&mut self, mode: GLenum) -> Result<()>;
    unsafe fn depth_func(&mut self, func: GLenum) -> Result<()>;
    unsafe fn depth_mask(&mut self, enabled: bool) -> Result<()>;
    unsafe fn front_face(&mut self, mode: GLenum) -> Result<()>;
    unsafe fn line_width(&mut self, width: GLfloat) -> Result<()>;
    unsafe fn point_size(&mut self, size: GLfloat) -> Result<()>;
    unsafe fn polygon_offset(&mut self, factor: GLfloat, units: GLfloat) -> Result<()>;
    unsafe fn scissor(&mut self, rect: Viewport) -> Result<()>;
    unsafe fn viewport(&mut self, rect: Viewport) -> Result<()>;
    unsafe fn shade_model(&mut self, mode: GLenum) -> Result<()>;
    unsafe fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint)
        -> Result<()>;
    unsafe fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum)
        -> Result<()>;
    unsafe fn hint(&mut self, target: GLenum, mode: GLenum) -> Result<()>;

    unsafe fn fog_f(&mut self, name: GLenum, v: GLfloat) -> Result<()>;
    unsafe fn fog_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()>;
    unsafe fn light_f(&mut self, light: GLenum, name: GLenum, v: GLfloat) -> Result<()>;
    unsafe fn light_fv(&mut self, light: GLenum, name: GLenum, v: [GLfloat; 4]) -> Result<()>;
    unsafe fn light_model_f(&mut self, name: GLenum, v: GLfloat) -> Result<()>;
    unsafe fn light_model_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()>;
    unsafe fn material_f(&mut self, name: GLenum, v: GLfloat) -> Result<()>;
    unsafe fn material_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()>;

    unsafe fn matrix_mode(&mut self, mode: GLenum) -> Result<()>;
    unsafe fn load_matrix(&mut self, m: &[GLfloat; 16]) -> Result<()>;
    unsafe fn current_palette_matrix(&mut self, index: GLuint) -> Result<()>;

    unsafe fn active_texture(&mut self, unit: GLenum) -> Result<()>;
    unsafe fn client_active_texture(&mut self, unit: GLenum) -> Result<()>;
    unsafe fn bind_texture(&mut self, target: GLenum, id: GLuint) -> Result<()>;
    unsafe fn tex_env_i(&mut self, name: GLenum, v: GLint) -> Result<()>;
    unsafe fn tex_env_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()>;

    unsafe fn gen_texture(&mut self) -> Result<GLuint>;
    unsafe fn delete_texture(&mut self, id: GLuint) -> Result<()>;
    unsafe fn tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        format: GLenum,
        ty: GLenum,
        size: IntSize,
        pixels: Option<&[u8]>,
    ) -> Result<()>;
    unsafe fn tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        rect: Viewport,
        format: GLenum,
        ty: GLenum,
        pixels: &[u8],
    ) -> Result<()>;
    unsafe fn tex_parameter_i(&mut self, target: GLenum, name: GLenum, v: GLint) -> Result<()>;
    unsafe fn generate_mipmap(&mut self, target: GLenum) -> Result<()>;
    unsafe fn pixel_store_i(&mut self, name: GLenum, v: GLint) -> Result<()>;

    unsafe fn gen_buffer(&mut self) -> Result<GLuint>;
    unsafe fn delete_buffer(&mut self, id: GLuint) -> Result<()>;
    unsafe fn bind_buffer(&mut self, target: GLenum, id: GLuint) -> Result<()>;
    unsafe fn buffer_data(&mut self, target: GLenum, data: &[u8], usage: GLenum) -> Result<()>;
    unsafe fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8])
        -> Result<()>;
    unsafe fn array_pointer(&mut self, array: GLenum, layout: ArrayPointer) -> Result<()>;

    unsafe fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) -> Result<()>;
    unsafe fn draw_elements(
        &mut self,
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        offset: usize,
    ) -> Result<()>;

    unsafe fn uniform_matrix4fv(&mut self, location: GLint, values: &[GLfloat]) -> Result<()>;
    unsafe fn uniform4fv(&mut self, location: GLint, values: &[GLfloat]) -> Result<()>;

    unsafe fn gen_framebuffer(&mut self) -> Result<GLuint>;
    unsafe fn delete_framebuffer(&mut self, id: GLuint) -> Result<()>;
    unsafe fn bind_framebuffer(&mut self, target: GLenum, id: GLuint) -> Result<()>;
    unsafe fn gen_renderbuffer(&mut self) -> Result<GLuint>;
    unsafe fn delete_renderbuffer(&mut self, id: GLuint) -> Result<()>;
    unsafe fn bind_renderbuffer(&mut self, id: GLuint) -> Result<()>;
    unsafe fn renderbuffer_storage(&mut self, format: GLenum, samples: GLuint, size: IntSize)
        -> Result<()>;
    unsafe fn get_renderbuffer_parameter(&mut self, name: GLenum) -> Result<GLint>;
    unsafe fn framebuffer_renderbuffer(&mut self, attachment: GLenum, id: GLuint) -> Result<()>;
    unsafe fn framebuffer_texture_2d(
        &mut self,
        attachment: GLenum,
        face: GLenum,
        id: GLuint,
        level: GLint,
    ) -> Result<()>;
    unsafe fn check_framebuffer_status(&mut self) -> Result<GLenum>;
    unsafe fn blit_framebuffer(&mut self, from: GLuint, to: GLuint, size: IntSize) -> Result<()>;
    unsafe fn discard_framebuffer(&mut self, attachments: &[GLenum]) -> Result<()>;
    unsafe fn clear(&mut self, mask: GLbitfield) -> Result<()>;
    unsafe fn read_pixels(&mut self, rect: Viewport, out: &mut [u8]) -> Result<()>;

    /// Blocks until all issued commands are complete.
    unsafe fn finish(&mut self) -> Result<()>;
}
