//! The `Device` backed by a live OpenGL context.
//!
//! Core entry points come from the `gl` crate. Fixed-function and OES entry points are
//! not part of the core profile it generates, so `FixedFunctionFns` loads them from the
//! same proc address loader.

use std::mem;
use std::os::raw::c_void;
use std::ptr;

use gl;

use super::consts::*;
use super::{ArrayPointer, Device, Pipeline};
use crate::errors::*;
use crate::math::prelude::{Color4B, Color4F, IntSize, Viewport};

/// Generic vertex attribute locations used by the programmable pipeline in place of the
/// fixed-function client arrays.
pub const ATTRIB_POSITION: GLuint = 0;
pub const ATTRIB_NORMAL: GLuint = 1;
pub const ATTRIB_COLOR: GLuint = 2;
pub const ATTRIB_POINT_SIZE: GLuint = 3;
pub const ATTRIB_WEIGHT: GLuint = 4;
pub const ATTRIB_MATRIX_INDEX: GLuint = 5;
pub const ATTRIB_TEXCOORD0: GLuint = 6;

type PointerFn = extern "system" fn(GLint, GLenum, GLsizei, *const c_void);

/// Entry points outside of the core profile.
#[derive(Default)]
pub struct FixedFunctionFns {
    alpha_func: Option<extern "system" fn(GLenum, GLfloat)>,
    color_4f: Option<extern "system" fn(GLfloat, GLfloat, GLfloat, GLfloat)>,
    color_4ub: Option<extern "system" fn(GLubyte, GLubyte, GLubyte, GLubyte)>,
    shade_model: Option<extern "system" fn(GLenum)>,
    enable_client_state: Option<extern "system" fn(GLenum)>,
    disable_client_state: Option<extern "system" fn(GLenum)>,
    client_active_texture: Option<extern "system" fn(GLenum)>,
    tex_env_i: Option<extern "system" fn(GLenum, GLenum, GLint)>,
    tex_env_fv: Option<extern "system" fn(GLenum, GLenum, *const GLfloat)>,
    fog_f: Option<extern "system" fn(GLenum, GLfloat)>,
    fog_fv: Option<extern "system" fn(GLenum, *const GLfloat)>,
    light_f: Option<extern "system" fn(GLenum, GLenum, GLfloat)>,
    light_fv: Option<extern "system" fn(GLenum, GLenum, *const GLfloat)>,
    get_light_fv: Option<extern "system" fn(GLenum, GLenum, *mut GLfloat)>,
    light_model_f: Option<extern "system" fn(GLenum, GLfloat)>,
    light_model_fv: Option<extern "system" fn(GLenum, *const GLfloat)>,
    material_f: Option<extern "system" fn(GLenum, GLenum, GLfloat)>,
    material_fv: Option<extern "system" fn(GLenum, GLenum, *const GLfloat)>,
    matrix_mode: Option<extern "system" fn(GLenum)>,
    load_matrix_f: Option<extern "system" fn(*const GLfloat)>,
    current_palette_matrix: Option<extern "system" fn(GLuint)>,
    vertex_pointer: Option<PointerFn>,
    normal_pointer: Option<extern "system" fn(GLenum, GLsizei, *const c_void)>,
    color_pointer: Option<PointerFn>,
    tex_coord_pointer: Option<PointerFn>,
    point_size_pointer: Option<extern "system" fn(GLenum, GLsizei, *const c_void)>,
    matrix_index_pointer: Option<PointerFn>,
    weight_pointer: Option<PointerFn>,
    discard_framebuffer: Option<extern "system" fn(GLenum, GLsizei, *const GLenum)>,
}

macro_rules! load {
    ($loader:expr, $($name:expr),+) => {{
        let mut v = None;
        $(
            if v.is_none() {
                let p = $loader($name);
                if !p.is_null() {
                    v = Some(unsafe { mem::transmute::<*const c_void, _>(p) });
                }
            }
        )+
        v
    }};
}

macro_rules! entry {
    ($fns:expr, $name:ident) => {
        match $fns.$name {
            Some(f) => f,
            None => bail!("[GL] {} is not available.", stringify!($name)),
        }
    };
}

impl FixedFunctionFns {
    pub fn load<F>(mut loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        FixedFunctionFns {
            alpha_func: load!(loader, "glAlphaFunc"),
            color_4f: load!(loader, "glColor4f"),
            color_4ub: load!(loader, "glColor4ub"),
            shade_model: load!(loader, "glShadeModel"),
            enable_client_state: load!(loader, "glEnableClientState"),
            disable_client_state: load!(loader, "glDisableClientState"),
            client_active_texture: load!(loader, "glClientActiveTexture"),
            tex_env_i: load!(loader, "glTexEnvi"),
            tex_env_fv: load!(loader, "glTexEnvfv"),
            fog_f: load!(loader, "glFogf"),
            fog_fv: load!(loader, "glFogfv"),
            light_f: load!(loader, "glLightf"),
            light_fv: load!(loader, "glLightfv"),
            get_light_fv: load!(loader, "glGetLightfv"),
            light_model_f: load!(loader, "glLightModelf"),
            light_model_fv: load!(loader, "glLightModelfv"),
            material_f: load!(loader, "glMaterialf"),
            material_fv: load!(loader, "glMaterialfv"),
            matrix_mode: load!(loader, "glMatrixMode"),
            load_matrix_f: load!(loader, "glLoadMatrixf"),
            current_palette_matrix: load!(loader, "glCurrentPaletteMatrixOES", "glCurrentPaletteMatrixARB"),
            vertex_pointer: load!(loader, "glVertexPointer"),
            normal_pointer: load!(loader, "glNormalPointer"),
            color_pointer: load!(loader, "glColorPointer"),
            tex_coord_pointer: load!(loader, "glTexCoordPointer"),
            point_size_pointer: load!(loader, "glPointSizePointerOES"),
            matrix_index_pointer: load!(loader, "glMatrixIndexPointerOES", "glMatrixIndexPointerARB"),
            weight_pointer: load!(loader, "glWeightPointerOES", "glWeightPointerARB"),
            discard_framebuffer: load!(loader, "glDiscardFramebufferEXT"),
        }
    }
}

/// The device of a live GL context. The context must be current on the calling thread
/// for every call.
pub struct GLDevice {
    pipeline: Pipeline,
    fns: FixedFunctionFns,
    client_active: GLuint,
}

impl GLDevice {
    /// Loads the entry points with `loader`, which maps a symbol name to its address.
    pub unsafe fn load<F>(pipeline: Pipeline, mut loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        gl::load_with(|symbol| loader(symbol));
        let fns = FixedFunctionFns::load(&mut loader);

        info!(
            "Loads GL device with {:?} pipeline, fixed-function entries {}.",
            pipeline,
            if fns.matrix_mode.is_some() { "found" } else { "missing" }
        );

        GLDevice {
            pipeline,
            fns,
            client_active: 0,
        }
    }

    #[inline]
    fn is_fixed_function(&self) -> bool {
        self.pipeline == Pipeline::FixedFunction
    }

    fn attribute(&self, array: GLenum) -> Option<GLuint> {
        match array {
            VERTEX_ARRAY => Some(ATTRIB_POSITION),
            NORMAL_ARRAY => Some(ATTRIB_NORMAL),
            COLOR_ARRAY => Some(ATTRIB_COLOR),
            POINT_SIZE_ARRAY_OES => Some(ATTRIB_POINT_SIZE),
            WEIGHT_ARRAY_OES => Some(ATTRIB_WEIGHT),
            MATRIX_INDEX_ARRAY_OES => Some(ATTRIB_MATRIX_INDEX),
            TEXTURE_COORD_ARRAY => Some(ATTRIB_TEXCOORD0 + self.client_active),
            _ => None,
        }
    }
}

fn gl_bool(v: bool) -> GLboolean {
    if v {
        gl::TRUE
    } else {
        gl::FALSE
    }
}

impl Device for GLDevice {
    unsafe fn is_enabled(&mut self, cap: GLenum) -> Result<bool> {
        let v = gl::IsEnabled(cap);
        check()?;
        Ok(v == gl::TRUE)
    }

    unsafe fn get_integer_v(&mut self, name: GLenum, out: &mut [GLint]) -> Result<()> {
        gl::GetIntegerv(name, out.as_mut_ptr());
        check()
    }

    unsafe fn get_float_v(&mut self, name: GLenum, out: &mut [GLfloat]) -> Result<()> {
        gl::GetFloatv(name, out.as_mut_ptr());
        check()
    }

    unsafe fn get_light_fv(&mut self, light: GLenum, name: GLenum, out: &mut [GLfloat]) -> Result<()> {
        entry!(self.fns, get_light_fv)(light, name, out.as_mut_ptr());
        check()
    }

    unsafe fn set_capability(&mut self, cap: GLenum, enabled: bool) -> Result<()> {
        if enabled {
            gl::Enable(cap);
        } else {
            gl::Disable(cap);
        }

        check()
    }

    unsafe fn set_client_capability(&mut self, cap: GLenum, enabled: bool) -> Result<()> {
        if self.is_fixed_function() {
            if enabled {
                entry!(self.fns, enable_client_state)(cap);
            } else {
                entry!(self.fns, disable_client_state)(cap);
            }

            return check();
        }

        let location = match self.attribute(cap) {
            Some(v) => v,
            None => bail!("[GL] {:#x} has no vertex attribute.", cap),
        };

        if enabled {
            gl::EnableVertexAttribArray(location);
        } else {
            gl::DisableVertexAttribArray(location);
        }

        check()
    }

    unsafe fn blend_func(&mut self, src: GLenum, dst: GLenum) -> Result<()> {
        gl::BlendFunc(src, dst);
        check()
    }

    unsafe fn alpha_func(&mut self, func: GLenum, reference: GLfloat) -> Result<()> {
        entry!(self.fns, alpha_func)(func, reference);
        check()
    }

    unsafe fn clear_color(&mut self, color: [GLfloat; 4]) -> Result<()> {
        gl::ClearColor(color[0], color[1], color[2], color[3]);
        check()
    }

    unsafe fn clear_depth(&mut self, depth: GLfloat) -> Result<()> {
        gl::ClearDepthf(depth);
        check()
    }

    unsafe fn clear_stencil(&mut self, stencil: GLint) -> Result<()> {
        gl::ClearStencil(stencil);
        check()
    }

    unsafe fn color_4f(&mut self, color: [GLfloat; 4]) -> Result<()> {
        if self.is_fixed_function() {
            entry!(self.fns, color_4f)(color[0], color[1], color[2], color[3]);
        } else {
            gl::VertexAttrib4f(ATTRIB_COLOR, color[0], color[1], color[2], color[3]);
        }

        check()
    }

    unsafe fn color_4ub(&mut self, color: Color4B) -> Result<()> {
        if self.is_fixed_function() {
            entry!(self.fns, color_4ub)(color.r, color.g, color.b, color.a);
            check()
        } else {
            self.color_4f(Color4F::from(color).rgba())
        }
    }

    unsafe fn color_mask(&mut self, mask: [bool; 4]) -> Result<()> {
        gl::ColorMask(
            gl_bool(mask[0]),
            gl_bool(mask[1]),
            gl_bool(mask[2]),
            gl_bool(mask[3]),
        );
        check()
    }

    unsafe fn cull_face(&mut self, mode: GLenum) -> Result<()> {
        gl::CullFace(mode);
        check()
    }

    unsafe fn depth_func(&mut self, func: GLenum) -> Result<()> {
        gl::DepthFunc(func);
        check()
    }

    unsafe fn depth_mask(&mut self, enabled: bool) -> Result<()> {
        gl::DepthMask(gl_bool(enabled));
        check()
    }

    unsafe fn front_face(&mut self, mode: GLenum) -> Result<()> {
        gl::FrontFace(mode);
        check()
    }

    unsafe fn line_width(&mut self, width: GLfloat) -> Result<()> {
        gl::LineWidth(width);
        check()
    }

    unsafe fn point_size(&mut self, size: GLfloat) -> Result<()> {
        gl::PointSize(size);
        check()
    }

    unsafe fn polygon_offset(&mut self, factor: GLfloat, units: GLfloat) -> Result<()> {
        gl::PolygonOffset(factor, units);
        check()
    }

    unsafe fn scissor(&mut self, rect: Viewport) -> Result<()> {
        gl::Scissor(rect.x, rect.y, rect.w, rect.h);
        check()
    }

    unsafe fn viewport(&mut self, rect: Viewport) -> Result<()> {
        gl::Viewport(rect.x, rect.y, rect.w, rect.h);
        check()
    }

    unsafe fn shade_model(&mut self, mode: GLenum) -> Result<()> {
        entry!(self.fns, shade_model)(mode);
        check()
    }

    unsafe fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) -> Result<()> {
        gl::StencilFunc(func, reference, mask);
        check()
    }

    unsafe fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum) -> Result<()> {
        gl::StencilOp(sfail, dpfail, dppass);
        check()
    }

    unsafe fn hint(&mut self, target: GLenum, mode: GLenum) -> Result<()> {
        gl::Hint(target, mode);
        check()
    }

    unsafe fn fog_f(&mut self, name: GLenum, v: GLfloat) -> Result<()> {
        entry!(self.fns, fog_f)(name, v);
        check()
    }

    unsafe fn fog_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        entry!(self.fns, fog_fv)(name, v.as_ptr());
        check()
    }

    unsafe fn light_f(&mut self, light: GLenum, name: GLenum, v: GLfloat) -> Result<()> {
        entry!(self.fns, light_f)(light, name, v);
        check()
    }

    unsafe fn light_fv(&mut self, light: GLenum, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        entry!(self.fns, light_fv)(light, name, v.as_ptr());
        check()
    }

    unsafe fn light_model_f(&mut self, name: GLenum, v: GLfloat) -> Result<()> {
        entry!(self.fns, light_model_f)(name, v);
        check()
    }

    unsafe fn light_model_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        entry!(self.fns, light_model_fv)(name, v.as_ptr());
        check()
    }

    unsafe fn material_f(&mut self, name: GLenum, v: GLfloat) -> Result<()> {
        entry!(self.fns, material_f)(FRONT_AND_BACK, name, v);
        check()
    }

    unsafe fn material_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        entry!(self.fns, material_fv)(FRONT_AND_BACK, name, v.as_ptr());
        check()
    }

    unsafe fn matrix_mode(&mut self, mode: GLenum) -> Result<()> {
        entry!(self.fns, matrix_mode)(mode);
        check()
    }

    unsafe fn load_matrix(&mut self, m: &[GLfloat; 16]) -> Result<()> {
        entry!(self.fns, load_matrix_f)(m.as_ptr());
        check()
    }

    unsafe fn current_palette_matrix(&mut self, index: GLuint) -> Result<()> {
        entry!(self.fns, current_palette_matrix)(index);
        check()
    }

    unsafe fn active_texture(&mut self, unit: GLenum) -> Result<()> {
        gl::ActiveTexture(unit);
        check()
    }

    unsafe fn client_active_texture(&mut self, unit: GLenum) -> Result<()> {
        if self.is_fixed_function() {
            entry!(self.fns, client_active_texture)(unit);
            check()?;
        }

        self.client_active = unit - TEXTURE0;
        Ok(())
    }

    unsafe fn bind_texture(&mut self, target: GLenum, id: GLuint) -> Result<()> {
        gl::BindTexture(target, id);
        check()
    }

    unsafe fn tex_env_i(&mut self, name: GLenum, v: GLint) -> Result<()> {
        entry!(self.fns, tex_env_i)(TEXTURE_ENV, name, v);
        check()
    }

    unsafe fn tex_env_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        entry!(self.fns, tex_env_fv)(TEXTURE_ENV, name, v.as_ptr());
        check()
    }

    unsafe fn gen_texture(&mut self) -> Result<GLuint> {
        let mut id = 0;
        gl::GenTextures(1, &mut id);
        check()?;
        Ok(id)
    }

    unsafe fn delete_texture(&mut self, id: GLuint) -> Result<()> {
        gl::DeleteTextures(1, &id);
        check()
    }

    unsafe fn tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        format: GLenum,
        ty: GLenum,
        size: IntSize,
        pixels: Option<&[u8]>,
    ) -> Result<()> {
        let data = pixels.map(|v| v.as_ptr() as *const c_void).unwrap_or(ptr::null());
        gl::TexImage2D(
            target,
            level,
            format as GLint,
            size.width,
            size.height,
            0,
            format,
            ty,
            data,
        );
        check()
    }

    unsafe fn tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        rect: Viewport,
        format: GLenum,
        ty: GLenum,
        pixels: &[u8],
    ) -> Result<()> {
        gl::TexSubImage2D(
            target,
            level,
            rect.x,
            rect.y,
            rect.w,
            rect.h,
            format,
            ty,
            pixels.as_ptr() as *const c_void,
        );
        check()
    }

    unsafe fn tex_parameter_i(&mut self, target: GLenum, name: GLenum, v: GLint) -> Result<()> {
        gl::TexParameteri(target, name, v);
        check()
    }

    unsafe fn generate_mipmap(&mut self, target: GLenum) -> Result<()> {
        gl::GenerateMipmap(target);
        check()
    }

    unsafe fn pixel_store_i(&mut self, name: GLenum, v: GLint) -> Result<()> {
        gl::PixelStorei(name, v);
        check()
    }

    unsafe fn gen_buffer(&mut self) -> Result<GLuint> {
        let mut id = 0;
        gl::GenBuffers(1, &mut id);
        check()?;
        Ok(id)
    }

    unsafe fn delete_buffer(&mut self, id: GLuint) -> Result<()> {
        gl::DeleteBuffers(1, &id);
        check()
    }

    unsafe fn bind_buffer(&mut self, target: GLenum, id: GLuint) -> Result<()> {
        gl::BindBuffer(target, id);
        check()
    }

    unsafe fn buffer_data(&mut self, target: GLenum, data: &[u8], usage: GLenum) -> Result<()> {
        gl::BufferData(
            target,
            data.len() as isize,
            data.as_ptr() as *const c_void,
            usage,
        );
        check()
    }

    unsafe fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) -> Result<()> {
        gl::BufferSubData(
            target,
            offset as isize,
            data.len() as isize,
            data.as_ptr() as *const c_void,
        );
        check()
    }

    unsafe fn array_pointer(&mut self, array: GLenum, layout: ArrayPointer) -> Result<()> {
        if !self.is_fixed_function() {
            let location = match self.attribute(array) {
                Some(v) => v,
                None => bail!("[GL] {:#x} has no vertex attribute.", array),
            };

            let normalized = layout.ty != FLOAT;
            gl::VertexAttribPointer(
                location,
                layout.size,
                layout.ty,
                gl_bool(normalized && array == COLOR_ARRAY),
                layout.stride,
                layout.as_ptr(),
            );
            return check();
        }

        let (size, ty, stride, p) = (layout.size, layout.ty, layout.stride, layout.as_ptr());
        match array {
            VERTEX_ARRAY => entry!(self.fns, vertex_pointer)(size, ty, stride, p),
            NORMAL_ARRAY => entry!(self.fns, normal_pointer)(ty, stride, p),
            COLOR_ARRAY => entry!(self.fns, color_pointer)(size, ty, stride, p),
            TEXTURE_COORD_ARRAY => entry!(self.fns, tex_coord_pointer)(size, ty, stride, p),
            POINT_SIZE_ARRAY_OES => entry!(self.fns, point_size_pointer)(ty, stride, p),
            MATRIX_INDEX_ARRAY_OES => entry!(self.fns, matrix_index_pointer)(size, ty, stride, p),
            WEIGHT_ARRAY_OES => entry!(self.fns, weight_pointer)(size, ty, stride, p),
            _ => bail!("[GL] {:#x} is not a client array.", array),
        }

        check()
    }

    unsafe fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) -> Result<()> {
        gl::DrawArrays(mode, first, count);
        check()
    }

    unsafe fn draw_elements(&mut self, mode: GLenum, count: GLsizei, ty: GLenum, offset: usize) -> Result<()> {
        gl::DrawElements(mode, count, ty, offset as *const c_void);
        check()
    }

    unsafe fn uniform_matrix4fv(&mut self, location: GLint, values: &[GLfloat]) -> Result<()> {
        gl::UniformMatrix4fv(location, (values.len() / 16) as GLsizei, gl::FALSE, values.as_ptr());
        check()
    }

    unsafe fn uniform4fv(&mut self, location: GLint, values: &[GLfloat]) -> Result<()> {
        gl::Uniform4fv(location, (values.len() / 4) as GLsizei, values.as_ptr());
        check()
    }

    unsafe fn gen_framebuffer(&mut self) -> Result<GLuint> {
        let mut id = 0;
        gl::GenFramebuffers(1, &mut id);
        check()?;
        Ok(id)
    }

    unsafe fn delete_framebuffer(&mut self, id: GLuint) -> Result<()> {
        gl::DeleteFramebuffers(1, &id);
        check()
    }

    unsafe fn bind_framebuffer(&mut self, target: GLenum, id: GLuint) -> Result<()> {
        gl::BindFramebuffer(target, id);
        check()
    }

    unsafe fn gen_renderbuffer(&mut self) -> Result<GLuint> {
        let mut id = 0;
        gl::GenRenderbuffers(1, &mut id);
        check()?;
        Ok(id)
    }

    unsafe fn delete_renderbuffer(&mut self, id: GLuint) -> Result<()> {
        gl::DeleteRenderbuffers(1, &id);
        check()
    }

    unsafe fn bind_renderbuffer(&mut self, id: GLuint) -> Result<()> {
        gl::BindRenderbuffer(gl::RENDERBUFFER, id);
        check()
    }

    unsafe fn renderbuffer_storage(&mut self, format: GLenum, samples: GLuint, size: IntSize) -> Result<()> {
        if samples > 1 {
            gl::RenderbufferStorageMultisample(
                gl::RENDERBUFFER,
                samples as GLsizei,
                format,
                size.width,
                size.height,
            );
        } else {
            gl::RenderbufferStorage(gl::RENDERBUFFER, format, size.width, size.height);
        }

        check()
    }

    unsafe fn get_renderbuffer_parameter(&mut self, name: GLenum) -> Result<GLint> {
        let mut v = 0;
        gl::GetRenderbufferParameteriv(gl::RENDERBUFFER, name, &mut v);
        check()?;
        Ok(v)
    }

    unsafe fn framebuffer_renderbuffer(&mut self, attachment: GLenum, id: GLuint) -> Result<()> {
        gl::FramebufferRenderbuffer(gl::FRAMEBUFFER, attachment, gl::RENDERBUFFER, id);
        check()
    }

    unsafe fn framebuffer_texture_2d(
        &mut self,
        attachment: GLenum,
        face: GLenum,
        id: GLuint,
        level: GLint,
    ) -> Result<()> {
        gl::FramebufferTexture2D(gl::FRAMEBUFFER, attachment, face, id, level);
        check()
    }

    unsafe fn check_framebuffer_status(&mut self) -> Result<GLenum> {
        let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
        check()?;
        Ok(status)
    }

    unsafe fn blit_framebuffer(&mut self, from: GLuint, to: GLuint, size: IntSize) -> Result<()> {
        let mut bound = 0;
        gl::GetIntegerv(gl::FRAMEBUFFER_BINDING, &mut bound);

        gl::BindFramebuffer(gl::READ_FRAMEBUFFER, from);
        gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, to);
        gl::BlitFramebuffer(
            0,
            0,
            size.width,
            size.height,
            0,
            0,
            size.width,
            size.height,
            gl::COLOR_BUFFER_BIT,
            gl::NEAREST,
        );

        let result = check();
        gl::BindFramebuffer(gl::FRAMEBUFFER, bound as GLuint);
        result
    }

    unsafe fn discard_framebuffer(&mut self, attachments: &[GLenum]) -> Result<()> {
        if let Some(f) = self.fns.discard_framebuffer {
            f(gl::FRAMEBUFFER, attachments.len() as GLsizei, attachments.as_ptr());
        } else if gl::InvalidateFramebuffer::is_loaded() {
            gl::InvalidateFramebuffer(
                gl::FRAMEBUFFER,
                attachments.len() as GLsizei,
                attachments.as_ptr(),
            );
        }

        check()
    }

    unsafe fn clear(&mut self, mask: GLbitfield) -> Result<()> {
        gl::Clear(mask);
        check()
    }

    unsafe fn read_pixels(&mut self, rect: Viewport, out: &mut [u8]) -> Result<()> {
        if out.len() < (rect.w * rect.h * 4) as usize {
            bail!("The buffer is too small to read {:?}.", rect);
        }

        gl::ReadPixels(
            rect.x,
            rect.y,
            rect.w,
            rect.h,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            out.as_mut_ptr() as *mut c_void,
        );
        check()
    }

    unsafe fn finish(&mut self) -> Result<()> {
        gl::Finish();
        check()
    }
}

unsafe fn check() -> Result<()> {
    match gl::GetError() {
        gl::NO_ERROR => Ok(()),
        code => bail!("[GL] {}", error_str(code)),
    }
}
