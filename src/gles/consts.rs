//! GL enums used by the trackers.
//!
//! The `gl` bindings only expose the core profile, so the fixed-function and OES
//! values are listed here along with the core ones, keeping one naming scheme.

#![allow(missing_docs)]

pub use gl::types::{
    GLbitfield, GLboolean, GLenum, GLfloat, GLint, GLshort, GLsizei, GLubyte, GLuint, GLushort,
};

// Errors.
pub const NO_ERROR: GLenum = 0;
pub const INVALID_ENUM: GLenum = 0x0500;
pub const INVALID_VALUE: GLenum = 0x0501;
pub const INVALID_OPERATION: GLenum = 0x0502;
pub const STACK_OVERFLOW: GLenum = 0x0503;
pub const STACK_UNDERFLOW: GLenum = 0x0504;
pub const OUT_OF_MEMORY: GLenum = 0x0505;
pub const INVALID_FRAMEBUFFER_OPERATION: GLenum = 0x0506;

// Blend factors.
pub const ZERO: GLenum = 0;
pub const ONE: GLenum = 1;
pub const SRC_COLOR: GLenum = 0x0300;
pub const ONE_MINUS_SRC_COLOR: GLenum = 0x0301;
pub const SRC_ALPHA: GLenum = 0x0302;
pub const ONE_MINUS_SRC_ALPHA: GLenum = 0x0303;
pub const DST_ALPHA: GLenum = 0x0304;
pub const ONE_MINUS_DST_ALPHA: GLenum = 0x0305;
pub const DST_COLOR: GLenum = 0x0306;
pub const ONE_MINUS_DST_COLOR: GLenum = 0x0307;
pub const SRC_ALPHA_SATURATE: GLenum = 0x0308;

// Comparison functions.
pub const NEVER: GLenum = 0x0200;
pub const LESS: GLenum = 0x0201;
pub const EQUAL: GLenum = 0x0202;
pub const LEQUAL: GLenum = 0x0203;
pub const GREATER: GLenum = 0x0204;
pub const NOTEQUAL: GLenum = 0x0205;
pub const GEQUAL: GLenum = 0x0206;
pub const ALWAYS: GLenum = 0x0207;

// Capabilities.
pub const ALPHA_TEST: GLenum = 0x0BC0;
pub const BLEND: GLenum = 0x0BE2;
pub const CLIP_PLANE0: GLenum = 0x3000;
pub const COLOR_LOGIC_OP: GLenum = 0x0BF2;
pub const COLOR_MATERIAL: GLenum = 0x0B57;
pub const CULL_FACE: GLenum = 0x0B44;
pub const DEPTH_TEST: GLenum = 0x0B71;
pub const DITHER: GLenum = 0x0BD0;
pub const FOG: GLenum = 0x0B60;
pub const LIGHT0: GLenum = 0x4000;
pub const LIGHTING: GLenum = 0x0B50;
pub const LINE_SMOOTH: GLenum = 0x0B20;
pub const MATRIX_PALETTE_OES: GLenum = 0x8840;
pub const MULTISAMPLE: GLenum = 0x809D;
pub const NORMALIZE: GLenum = 0x0BA1;
pub const POINT_SMOOTH: GLenum = 0x0B10;
pub const POINT_SPRITE_OES: GLenum = 0x8861;
pub const POLYGON_OFFSET_FILL: GLenum = 0x8037;
pub const RESCALE_NORMAL: GLenum = 0x803A;
pub const SAMPLE_ALPHA_TO_COVERAGE: GLenum = 0x809E;
pub const SAMPLE_ALPHA_TO_ONE: GLenum = 0x809F;
pub const SAMPLE_COVERAGE: GLenum = 0x80A0;
pub const SCISSOR_TEST: GLenum = 0x0C11;
pub const STENCIL_TEST: GLenum = 0x0B90;
pub const TEXTURE_2D: GLenum = 0x0DE1;
pub const TEXTURE_CUBE_MAP: GLenum = 0x8513;

// Client capabilities.
pub const VERTEX_ARRAY: GLenum = 0x8074;
pub const NORMAL_ARRAY: GLenum = 0x8075;
pub const COLOR_ARRAY: GLenum = 0x8076;
pub const TEXTURE_COORD_ARRAY: GLenum = 0x8078;
pub const POINT_SIZE_ARRAY_OES: GLenum = 0x8B9C;
pub const MATRIX_INDEX_ARRAY_OES: GLenum = 0x8844;
pub const WEIGHT_ARRAY_OES: GLenum = 0x86AD;

// State queries.
pub const ALPHA_TEST_FUNC: GLenum = 0x0BC1;
pub const ALPHA_TEST_REF: GLenum = 0x0BC2;
pub const BLEND_DST: GLenum = 0x0BE0;
pub const BLEND_SRC: GLenum = 0x0BE1;
pub const COLOR_CLEAR_VALUE: GLenum = 0x0C22;
pub const COLOR_WRITEMASK: GLenum = 0x0C23;
pub const CULL_FACE_MODE: GLenum = 0x0B45;
pub const CURRENT_COLOR: GLenum = 0x0B00;
pub const DEPTH_CLEAR_VALUE: GLenum = 0x0B73;
pub const DEPTH_FUNC: GLenum = 0x0B74;
pub const DEPTH_WRITEMASK: GLenum = 0x0B72;
pub const FRONT_FACE: GLenum = 0x0B46;
pub const LINE_WIDTH: GLenum = 0x0B21;
pub const MATRIX_MODE: GLenum = 0x0BA0;
pub const POINT_SIZE: GLenum = 0x0B11;
pub const POLYGON_OFFSET_FACTOR: GLenum = 0x8038;
pub const POLYGON_OFFSET_UNITS: GLenum = 0x2A00;
pub const SCISSOR_BOX: GLenum = 0x0C10;
pub const SHADE_MODEL: GLenum = 0x0B54;
pub const STENCIL_CLEAR_VALUE: GLenum = 0x0B91;
pub const STENCIL_FAIL: GLenum = 0x0B94;
pub const STENCIL_FUNC: GLenum = 0x0B92;
pub const STENCIL_PASS_DEPTH_FAIL: GLenum = 0x0B95;
pub const STENCIL_PASS_DEPTH_PASS: GLenum = 0x0B96;
pub const STENCIL_REF: GLenum = 0x0B97;
pub const STENCIL_VALUE_MASK: GLenum = 0x0B93;
pub const VIEWPORT: GLenum = 0x0BA2;

// Platform limits.
pub const MAX_CLIP_PLANES: GLenum = 0x0D32;
pub const MAX_LIGHTS: GLenum = 0x0D31;
pub const MAX_PALETTE_MATRICES_OES: GLenum = 0x8842;
pub const MAX_SAMPLES: GLenum = 0x8D57;
pub const MAX_TEXTURE_SIZE: GLenum = 0x0D33;
pub const MAX_TEXTURE_UNITS: GLenum = 0x84E2;
pub const MAX_TEXTURE_IMAGE_UNITS: GLenum = 0x8872;
pub const MAX_VERTEX_UNITS_OES: GLenum = 0x86A4;

// Faces and winding.
pub const FRONT: GLenum = 0x0404;
pub const BACK: GLenum = 0x0405;
pub const FRONT_AND_BACK: GLenum = 0x0408;
pub const CW: GLenum = 0x0900;
pub const CCW: GLenum = 0x0901;

// Stencil operations.
pub const KEEP: GLenum = 0x1E00;
pub const REPLACE: GLenum = 0x1E01;
pub const INCR: GLenum = 0x1E02;
pub const DECR: GLenum = 0x1E03;
pub const INVERT: GLenum = 0x150A;

// Shading.
pub const FLAT: GLenum = 0x1D00;
pub const SMOOTH: GLenum = 0x1D01;

// Hints.
pub const DONT_CARE: GLenum = 0x1100;
pub const FASTEST: GLenum = 0x1101;
pub const NICEST: GLenum = 0x1102;
pub const PERSPECTIVE_CORRECTION_HINT: GLenum = 0x0C50;
pub const POINT_SMOOTH_HINT: GLenum = 0x0C51;
pub const LINE_SMOOTH_HINT: GLenum = 0x0C52;
pub const FOG_HINT: GLenum = 0x0C54;
pub const GENERATE_MIPMAP_HINT: GLenum = 0x8192;

// Fog.
pub const FOG_DENSITY: GLenum = 0x0B62;
pub const FOG_START: GLenum = 0x0B63;
pub const FOG_END: GLenum = 0x0B64;
pub const FOG_MODE: GLenum = 0x0B65;
pub const FOG_COLOR: GLenum = 0x0B66;
pub const EXP: GLenum = 0x0800;
pub const EXP2: GLenum = 0x0801;

// Lights and materials.
pub const AMBIENT: GLenum = 0x1200;
pub const DIFFUSE: GLenum = 0x1201;
pub const SPECULAR: GLenum = 0x1202;
pub const POSITION: GLenum = 0x1203;
pub const SPOT_DIRECTION: GLenum = 0x1204;
pub const SPOT_EXPONENT: GLenum = 0x1205;
pub const SPOT_CUTOFF: GLenum = 0x1206;
pub const CONSTANT_ATTENUATION: GLenum = 0x1207;
pub const LINEAR_ATTENUATION: GLenum = 0x1208;
pub const QUADRATIC_ATTENUATION: GLenum = 0x1209;
pub const EMISSION: GLenum = 0x1600;
pub const SHININESS: GLenum = 0x1601;
pub const LIGHT_MODEL_TWO_SIDE: GLenum = 0x0B52;
pub const LIGHT_MODEL_AMBIENT: GLenum = 0x0B53;

// Matrices.
pub const MODELVIEW: GLenum = 0x1700;
pub const PROJECTION: GLenum = 0x1701;
pub const TEXTURE: GLenum = 0x1702;
pub const CURRENT_PALETTE_MATRIX_OES: GLenum = 0x8843;

// Texture units and environment.
pub const TEXTURE0: GLenum = 0x84C0;
pub const ACTIVE_TEXTURE: GLenum = 0x84E0;
pub const CLIENT_ACTIVE_TEXTURE: GLenum = 0x84E1;
pub const TEXTURE_BINDING_2D: GLenum = 0x8069;
pub const TEXTURE_BINDING_CUBE_MAP: GLenum = 0x8514;
pub const TEXTURE_ENV: GLenum = 0x2300;
pub const TEXTURE_ENV_MODE: GLenum = 0x2200;
pub const TEXTURE_ENV_COLOR: GLenum = 0x2201;
pub const MODULATE: GLenum = 0x2100;
pub const DECAL: GLenum = 0x2101;
pub const ADD: GLenum = 0x0104;
pub const COMBINE: GLenum = 0x8570;
pub const COMBINE_RGB: GLenum = 0x8571;
pub const COMBINE_ALPHA: GLenum = 0x8572;
pub const SRC0_RGB: GLenum = 0x8580;
pub const SRC1_RGB: GLenum = 0x8581;
pub const OPERAND0_RGB: GLenum = 0x8590;
pub const OPERAND1_RGB: GLenum = 0x8591;
pub const DOT3_RGB: GLenum = 0x86AE;
pub const DOT3_RGBA: GLenum = 0x86AF;
pub const CONSTANT: GLenum = 0x8576;
pub const PRIMARY_COLOR: GLenum = 0x8577;
pub const PREVIOUS: GLenum = 0x8578;
pub const COORD_REPLACE_OES: GLenum = 0x8862;

// Texture objects.
pub const TEXTURE_CUBE_MAP_POSITIVE_X: GLenum = 0x8515;
pub const TEXTURE_CUBE_MAP_NEGATIVE_X: GLenum = 0x8516;
pub const TEXTURE_CUBE_MAP_POSITIVE_Y: GLenum = 0x8517;
pub const TEXTURE_CUBE_MAP_NEGATIVE_Y: GLenum = 0x8518;
pub const TEXTURE_CUBE_MAP_POSITIVE_Z: GLenum = 0x8519;
pub const TEXTURE_CUBE_MAP_NEGATIVE_Z: GLenum = 0x851A;
pub const TEXTURE_MAG_FILTER: GLenum = 0x2800;
pub const TEXTURE_MIN_FILTER: GLenum = 0x2801;
pub const TEXTURE_WRAP_S: GLenum = 0x2802;
pub const TEXTURE_WRAP_T: GLenum = 0x2803;
pub const NEAREST: GLenum = 0x2600;
pub const LINEAR: GLenum = 0x2601;
pub const NEAREST_MIPMAP_NEAREST: GLenum = 0x2700;
pub const LINEAR_MIPMAP_NEAREST: GLenum = 0x2701;
pub const NEAREST_MIPMAP_LINEAR: GLenum = 0x2702;
pub const LINEAR_MIPMAP_LINEAR: GLenum = 0x2703;
pub const REPEAT: GLenum = 0x2901;
pub const CLAMP_TO_EDGE: GLenum = 0x812F;
pub const MIRRORED_REPEAT: GLenum = 0x8370;
pub const UNPACK_ALIGNMENT: GLenum = 0x0CF5;
pub const PACK_ALIGNMENT: GLenum = 0x0D05;

// Pixel formats and types.
pub const ALPHA: GLenum = 0x1906;
pub const RGB: GLenum = 0x1907;
pub const RGBA: GLenum = 0x1908;
pub const LUMINANCE: GLenum = 0x1909;
pub const LUMINANCE_ALPHA: GLenum = 0x190A;
pub const DEPTH_COMPONENT: GLenum = 0x1902;
pub const BYTE: GLenum = 0x1400;
pub const UNSIGNED_BYTE: GLenum = 0x1401;
pub const SHORT: GLenum = 0x1402;
pub const UNSIGNED_SHORT: GLenum = 0x1403;
pub const INT: GLenum = 0x1404;
pub const UNSIGNED_INT: GLenum = 0x1405;
pub const FLOAT: GLenum = 0x1406;
pub const FIXED: GLenum = 0x140C;
pub const UNSIGNED_SHORT_4_4_4_4: GLenum = 0x8033;
pub const UNSIGNED_SHORT_5_5_5_1: GLenum = 0x8034;
pub const UNSIGNED_SHORT_5_6_5: GLenum = 0x8363;

// Buffers and drawing.
pub const ARRAY_BUFFER: GLenum = 0x8892;
pub const ELEMENT_ARRAY_BUFFER: GLenum = 0x8893;
pub const ARRAY_BUFFER_BINDING: GLenum = 0x8894;
pub const ELEMENT_ARRAY_BUFFER_BINDING: GLenum = 0x8895;
pub const STREAM_DRAW: GLenum = 0x88E0;
pub const STATIC_DRAW: GLenum = 0x88E4;
pub const DYNAMIC_DRAW: GLenum = 0x88E8;
pub const POINTS: GLenum = 0x0000;
pub const LINES: GLenum = 0x0001;
pub const LINE_LOOP: GLenum = 0x0002;
pub const LINE_STRIP: GLenum = 0x0003;
pub const TRIANGLES: GLenum = 0x0004;
pub const TRIANGLE_STRIP: GLenum = 0x0005;
pub const TRIANGLE_FAN: GLenum = 0x0006;
pub const COLOR_BUFFER_BIT: GLbitfield = 0x4000;
pub const DEPTH_BUFFER_BIT: GLbitfield = 0x0100;
pub const STENCIL_BUFFER_BIT: GLbitfield = 0x0400;

// Framebuffers.
pub const FRAMEBUFFER: GLenum = 0x8D40;
pub const READ_FRAMEBUFFER: GLenum = 0x8CA8;
pub const DRAW_FRAMEBUFFER: GLenum = 0x8CA9;
pub const RENDERBUFFER: GLenum = 0x8D41;
pub const FRAMEBUFFER_BINDING: GLenum = 0x8CA6;
pub const RENDERBUFFER_BINDING: GLenum = 0x8CA7;
pub const COLOR_ATTACHMENT0: GLenum = 0x8CE0;
pub const DEPTH_ATTACHMENT: GLenum = 0x8D00;
pub const STENCIL_ATTACHMENT: GLenum = 0x8D20;
pub const COLOR: GLenum = 0x1800;
pub const DEPTH: GLenum = 0x1801;
pub const STENCIL: GLenum = 0x1802;
pub const FRAMEBUFFER_COMPLETE: GLenum = 0x8CD5;
pub const FRAMEBUFFER_INCOMPLETE_ATTACHMENT: GLenum = 0x8CD6;
pub const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: GLenum = 0x8CD7;
pub const FRAMEBUFFER_INCOMPLETE_DIMENSIONS: GLenum = 0x8CD9;
pub const FRAMEBUFFER_UNSUPPORTED: GLenum = 0x8CDD;
pub const FRAMEBUFFER_INCOMPLETE_MULTISAMPLE: GLenum = 0x8D56;
pub const RENDERBUFFER_WIDTH: GLenum = 0x8D42;
pub const RENDERBUFFER_HEIGHT: GLenum = 0x8D43;
pub const RENDERBUFFER_INTERNAL_FORMAT: GLenum = 0x8D44;
pub const RENDERBUFFER_SAMPLES: GLenum = 0x8CAB;
pub const RGBA8: GLenum = 0x8058;
pub const RGB8: GLenum = 0x8051;
pub const RGBA4: GLenum = 0x8056;
pub const RGB5_A1: GLenum = 0x8057;
pub const RGB565: GLenum = 0x8D62;
pub const DEPTH_COMPONENT16: GLenum = 0x81A5;
pub const DEPTH_COMPONENT24: GLenum = 0x81A6;
pub const STENCIL_INDEX8: GLenum = 0x8D48;
pub const DEPTH24_STENCIL8: GLenum = 0x88F0;

/// Returns a readable name of an error code raised by GL.
pub fn error_str(code: GLenum) -> &'static str {
    match code {
        INVALID_ENUM => "An unacceptable value is specified for an enumerated argument.",
        INVALID_VALUE => "A numeric argument is out of range.",
        INVALID_OPERATION => "The specified operation is not allowed in the current state.",
        INVALID_FRAMEBUFFER_OPERATION => {
            "The command is trying to render to or read from the framebuffer while the \
             currently bound framebuffer is not framebuffer complete."
        }
        OUT_OF_MEMORY => "There is not enough memory left to execute the command.",
        STACK_OVERFLOW => "An operation would cause an internal stack to overflow.",
        STACK_UNDERFLOW => "An operation would cause an internal stack to underflow.",
        _ => "Unknown GL error.",
    }
}

/// Returns a readable description of a framebuffer status.
pub fn framebuffer_status_str(status: GLenum) -> &'static str {
    match status {
        FRAMEBUFFER_COMPLETE => "Framebuffer is complete.",
        FRAMEBUFFER_INCOMPLETE_ATTACHMENT => {
            "Not all framebuffer attachment points are framebuffer attachment complete."
        }
        FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
            "Framebuffer does not have at least one image attached to it."
        }
        FRAMEBUFFER_INCOMPLETE_DIMENSIONS => "Attached images do not share the same dimensions.",
        FRAMEBUFFER_UNSUPPORTED => {
            "The combination of internal formats of the attached images violates an \
             implementation-dependent set of restrictions."
        }
        FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => {
            "The value of RENDERBUFFER_SAMPLES is not the same for all attached renderbuffers."
        }
        _ => "Framebuffer is incomplete for an unknown reason.",
    }
}

/// Returns the cube face target of the face index, in +X, -X, +Y, -Y, +Z, -Z order.
#[inline]
pub fn cube_face(index: usize) -> GLenum {
    TEXTURE_CUBE_MAP_POSITIVE_X + (index as GLenum % 6)
}

/// Returns the number of bytes of a component type.
pub fn type_size(ty: GLenum) -> usize {
    match ty {
        BYTE | UNSIGNED_BYTE => 1,
        SHORT | UNSIGNED_SHORT => 2,
        _ => 4,
    }
}
