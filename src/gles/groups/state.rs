use super::super::consts::*;
use super::super::tracker::*;
use super::super::Device;
use crate::errors::*;
use crate::math::prelude::{Color4F, Viewport};

unsafe fn set_blend_func(device: &mut dyn Device, src: GLenum, dst: GLenum) -> Result<()> {
    device.blend_func(src, dst)
}

unsafe fn set_alpha_func(device: &mut dyn Device, func: GLenum, reference: GLfloat) -> Result<()> {
    device.alpha_func(func, reference)
}

unsafe fn set_polygon_offset(device: &mut dyn Device, factor: GLfloat, units: GLfloat) -> Result<()> {
    device.polygon_offset(factor, units)
}

unsafe fn set_clear_color(device: &mut dyn Device, _: GLParam, v: Color4F) -> Result<()> {
    device.clear_color(v.rgba())
}

unsafe fn set_clear_depth(device: &mut dyn Device, _: GLParam, v: GLfloat) -> Result<()> {
    device.clear_depth(v)
}

unsafe fn set_clear_stencil(device: &mut dyn Device, _: GLParam, v: GLint) -> Result<()> {
    device.clear_stencil(v)
}

unsafe fn set_color(device: &mut dyn Device, _: GLParam, v: Color4F) -> Result<()> {
    device.color_4f(v.rgba())
}

unsafe fn set_color_mask(device: &mut dyn Device, _: GLParam, v: [bool; 4]) -> Result<()> {
    device.color_mask(v)
}

unsafe fn get_color_mask(device: &mut dyn Device, p: GLParam) -> Result<[bool; 4]> {
    let mut v = [0; 4];
    device.get_integer_v(p.name, &mut v)?;
    Ok([v[0] != 0, v[1] != 0, v[2] != 0, v[3] != 0])
}

unsafe fn set_cull_face(device: &mut dyn Device, _: GLParam, v: GLenum) -> Result<()> {
    device.cull_face(v)
}

unsafe fn set_depth_func(device: &mut dyn Device, _: GLParam, v: GLenum) -> Result<()> {
    device.depth_func(v)
}

unsafe fn set_depth_mask(device: &mut dyn Device, _: GLParam, v: bool) -> Result<()> {
    device.depth_mask(v)
}

unsafe fn set_front_face(device: &mut dyn Device, _: GLParam, v: GLenum) -> Result<()> {
    device.front_face(v)
}

unsafe fn set_line_width(device: &mut dyn Device, _: GLParam, v: GLfloat) -> Result<()> {
    device.line_width(v)
}

unsafe fn set_point_size(device: &mut dyn Device, _: GLParam, v: GLfloat) -> Result<()> {
    device.point_size(v)
}

unsafe fn set_shade_model(device: &mut dyn Device, _: GLParam, v: GLenum) -> Result<()> {
    device.shade_model(v)
}

unsafe fn set_scissor(device: &mut dyn Device, _: GLParam, v: Viewport) -> Result<()> {
    device.scissor(v)
}

unsafe fn set_viewport(device: &mut dyn Device, _: GLParam, v: Viewport) -> Result<()> {
    device.viewport(v)
}

unsafe fn set_stencil_func(
    device: &mut dyn Device,
    _: GLParam,
    v: (GLenum, GLint, GLuint),
) -> Result<()> {
    device.stencil_func(v.0, v.1, v.2)
}

unsafe fn set_stencil_op(
    device: &mut dyn Device,
    _: GLParam,
    v: (GLenum, GLenum, GLenum),
) -> Result<()> {
    device.stencil_op(v.0, v.1, v.2)
}

unsafe fn set_framebuffer(device: &mut dyn Device, _: GLParam, v: GLuint) -> Result<()> {
    device.bind_framebuffer(FRAMEBUFFER, v)
}

unsafe fn set_renderbuffer(device: &mut dyn Device, _: GLParam, v: GLuint) -> Result<()> {
    device.bind_renderbuffer(v)
}

/// The plain raster state: colors, depth, stencil, rectangles and bindings of
/// framebuffers.
pub struct GLState {
    pub blend_func: CompositeTracker<GLenum, GLenum>,
    pub alpha_func: CompositeTracker<GLenum, GLfloat>,
    pub polygon_offset: CompositeTracker<GLfloat, GLfloat>,
    pub clear_color: StateTracker<Color4F>,
    pub clear_depth: StateTracker<GLfloat>,
    pub clear_stencil: StateTracker<GLint>,
    pub color: StateTracker<Color4F>,
    pub color_mask: StateTracker<[bool; 4]>,
    pub cull_face: StateTracker<GLenum>,
    pub depth_func: StateTracker<GLenum>,
    pub depth_mask: StateTracker<bool>,
    pub front_face: StateTracker<GLenum>,
    pub line_width: StateTracker<GLfloat>,
    pub point_size: StateTracker<GLfloat>,
    pub shade_model: StateTracker<GLenum>,
    pub scissor: StateTracker<Viewport>,
    pub viewport: StateTracker<Viewport>,
    pub stencil_func: StateTracker<(GLenum, GLint, GLuint)>,
    pub stencil_op: StateTracker<(GLenum, GLenum, GLenum)>,
    pub framebuffer: StateTracker<GLuint>,
    pub renderbuffer: StateTracker<GLuint>,
}

impl GLState {
    /// Creates the group. `restore` is the policy of the settings the 2d overlay relies
    /// on; everything else is ignored.
    pub fn new(restore: OriginalValuePolicy, fixed_function: bool) -> Self {
        let blend_src = StateTracker::new("BLEND_SRC", GLParam::new(BLEND_SRC), ONE, None, Some(get_enum));
        let blend_dst = StateTracker::new("BLEND_DST", GLParam::new(BLEND_DST), ZERO, None, Some(get_enum));

        let alpha_func = StateTracker::new(
            "ALPHA_TEST_FUNC",
            GLParam::new(ALPHA_TEST_FUNC),
            ALWAYS,
            None,
            Some(get_enum),
        );
        let alpha_ref = StateTracker::new(
            "ALPHA_TEST_REF",
            GLParam::new(ALPHA_TEST_REF),
            0.0,
            None,
            Some(get_float),
        );

        let offset_factor = StateTracker::new(
            "POLYGON_OFFSET_FACTOR",
            GLParam::new(POLYGON_OFFSET_FACTOR),
            0.0,
            None,
            Some(get_float),
        );
        let offset_units = StateTracker::new(
            "POLYGON_OFFSET_UNITS",
            GLParam::new(POLYGON_OFFSET_UNITS),
            0.0,
            None,
            Some(get_float),
        );

        // Without a fixed-function pipeline the current color is a vertex attribute
        // GL can not report.
        let color_policy = if fixed_function {
            restore
        } else {
            OriginalValuePolicy::Ignore
        };

        GLState {
            blend_func: CompositeTracker::new("blend func", blend_src, blend_dst, set_blend_func),
            alpha_func: CompositeTracker::new("alpha func", alpha_func, alpha_ref, set_alpha_func),
            polygon_offset: CompositeTracker::new(
                "polygon offset",
                offset_factor,
                offset_units,
                set_polygon_offset,
            ),
            clear_color: StateTracker::new(
                "COLOR_CLEAR_VALUE",
                GLParam::new(COLOR_CLEAR_VALUE),
                Color4F::transparent(),
                Some(set_clear_color),
                Some(get_color),
            ),
            clear_depth: StateTracker::new(
                "DEPTH_CLEAR_VALUE",
                GLParam::new(DEPTH_CLEAR_VALUE),
                1.0,
                Some(set_clear_depth),
                Some(get_float),
            ),
            clear_stencil: StateTracker::new(
                "STENCIL_CLEAR_VALUE",
                GLParam::new(STENCIL_CLEAR_VALUE),
                0,
                Some(set_clear_stencil),
                Some(get_int),
            ),
            color: StateTracker::new(
                "CURRENT_COLOR",
                GLParam::new(CURRENT_COLOR),
                Color4F::white(),
                Some(set_color),
                Some(get_color),
            )
            .with_policy(color_policy),
            color_mask: StateTracker::new(
                "COLOR_WRITEMASK",
                GLParam::new(COLOR_WRITEMASK),
                [true; 4],
                Some(set_color_mask),
                Some(get_color_mask),
            ),
            cull_face: StateTracker::new(
                "CULL_FACE_MODE",
                GLParam::new(CULL_FACE_MODE),
                BACK,
                Some(set_cull_face),
                Some(get_enum),
            ),
            depth_func: StateTracker::new(
                "DEPTH_FUNC",
                GLParam::new(DEPTH_FUNC),
                LESS,
                Some(set_depth_func),
                Some(get_enum),
            ),
            depth_mask: StateTracker::new(
                "DEPTH_WRITEMASK",
                GLParam::new(DEPTH_WRITEMASK),
                true,
                Some(set_depth_mask),
                Some(get_bool),
            ),
            front_face: StateTracker::new(
                "FRONT_FACE",
                GLParam::new(FRONT_FACE),
                CCW,
                Some(set_front_face),
                Some(get_enum),
            ),
            line_width: StateTracker::new(
                "LINE_WIDTH",
                GLParam::new(LINE_WIDTH),
                1.0,
                Some(set_line_width),
                Some(get_float),
            ),
            point_size: StateTracker::new(
                "POINT_SIZE",
                GLParam::new(POINT_SIZE),
                1.0,
                Some(set_point_size),
                Some(get_float),
            ),
            shade_model: StateTracker::new(
                "SHADE_MODEL",
                GLParam::new(SHADE_MODEL),
                SMOOTH,
                Some(set_shade_model),
                Some(get_enum),
            ),
            scissor: StateTracker::new(
                "SCISSOR_BOX",
                GLParam::new(SCISSOR_BOX),
                Viewport::default(),
                Some(set_scissor),
                Some(get_viewport),
            )
            .with_policy(restore),
            viewport: StateTracker::new(
                "VIEWPORT",
                GLParam::new(VIEWPORT),
                Viewport::default(),
                Some(set_viewport),
                Some(get_viewport),
            )
            .with_policy(restore),
            stencil_func: StateTracker::new(
                "stencil func",
                GLParam::new(STENCIL_FUNC),
                (ALWAYS, 0, ::std::u32::MAX),
                Some(set_stencil_func),
                None,
            ),
            stencil_op: StateTracker::new(
                "stencil op",
                GLParam::new(STENCIL_FAIL),
                (KEEP, KEEP, KEEP),
                Some(set_stencil_op),
                None,
            ),
            framebuffer: StateTracker::new(
                "FRAMEBUFFER_BINDING",
                GLParam::new(FRAMEBUFFER_BINDING),
                0,
                Some(set_framebuffer),
                Some(get_uint),
            )
            .with_policy(restore),
            renderbuffer: StateTracker::new(
                "RENDERBUFFER_BINDING",
                GLParam::new(RENDERBUFFER_BINDING),
                0,
                Some(set_renderbuffer),
                Some(get_uint),
            ),
        }
    }

    pub fn open(&mut self, device: &mut dyn Device) {
        self.blend_func.open(device);
        self.alpha_func.open(device);
        self.polygon_offset.open(device);
        self.clear_color.open(device);
        self.clear_depth.open(device);
        self.clear_stencil.open(device);
        self.color.open(device);
        self.color_mask.open(device);
        self.cull_face.open(device);
        self.depth_func.open(device);
        self.depth_mask.open(device);
        self.front_face.open(device);
        self.line_width.open(device);
        self.point_size.open(device);
        self.shade_model.open(device);
        self.scissor.open(device);
        self.viewport.open(device);
        self.stencil_func.open(device);
        self.stencil_op.open(device);
        self.framebuffer.open(device);
        self.renderbuffer.open(device);
    }

    pub fn close(&mut self, device: &mut dyn Device) {
        self.blend_func.close(device);
        self.alpha_func.close(device);
        self.polygon_offset.close(device);
        self.clear_color.close(device);
        self.clear_depth.close(device);
        self.clear_stencil.close(device);
        self.color.close(device);
        self.color_mask.close(device);
        self.cull_face.close(device);
        self.depth_func.close(device);
        self.depth_mask.close(device);
        self.front_face.close(device);
        self.line_width.close(device);
        self.point_size.close(device);
        self.shade_model.close(device);
        self.scissor.close(device);
        self.viewport.close(device);
        self.stencil_func.close(device);
        self.stencil_op.close(device);
        self.framebuffer.close(device);
        self.renderbuffer.close(device);
    }
}
