//! An in-memory device that stands in for a GL context in tests.
//!
//! It keeps every setting the trackers touch, counts calls per entry point, can be told
//! to fail the next call of a given kind, and owns pixel storage for renderbuffers,
//! textures and the window. Triangles are rasterized with flat, unblended color so the
//! picking pass can be verified end to end.

use std::cell::RefCell;
use std::rc::Rc;

use super::consts::*;
use super::{ArrayPointer, Device};
use crate::errors::*;
use crate::math::prelude::{Color4B, Color4F, IntSize, Matrix4, SquareMatrix, Vector4, Viewport};
use crate::utils::hash::{FastHashMap, FastHashSet};

/// A draw call issued to the headless device.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub mode: GLenum,
    pub first: GLint,
    pub count: GLsizei,
    pub indexed: bool,
    pub color: Color4F,
    pub framebuffer: GLuint,
    pub texture: GLuint,
    pub palette_enabled: bool,
}

/// Pixel storage of a color buffer, with an optional depth plane.
#[derive(Debug, Clone, Default)]
pub struct Image {
    pub size: IntSize,
    pub pixels: Vec<u8>,
    pub depth: Vec<f32>,
}

impl Image {
    fn new(size: IntSize) -> Self {
        Image {
            size,
            pixels: vec![0; size.area() * 4],
            depth: vec![1.0; size.area()],
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.size.width || y >= self.size.height {
            None
        } else {
            Some((y * self.size.width + x) as usize)
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color4B> {
        let i = self.index(x, y)? * 4;
        Some(Color4B::new(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextureInfo {
    pub target: GLenum,
    pub format: GLenum,
    pub ty: GLenum,
    pub params: FastHashMap<GLenum, GLint>,
    pub has_mipmap: bool,
    /// Images keyed by (face target, level).
    pub images: FastHashMap<(GLenum, GLint), Image>,
}

impl TextureInfo {
    pub fn size(&self, face: GLenum) -> Option<IntSize> {
        self.images.get(&(face, 0)).map(|v| v.size)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderbufferInfo {
    pub format: GLenum,
    pub samples: GLuint,
    pub image: Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attached {
    Renderbuffer(GLuint),
    Texture { id: GLuint, face: GLenum, level: GLint },
}

#[derive(Debug, Clone, Default)]
pub struct FramebufferInfo {
    pub attachments: FastHashMap<GLenum, Attached>,
    pub discarded: Vec<GLenum>,
}

struct HeadlessState {
    calls: FastHashMap<&'static str, usize>,
    failures: FastHashSet<&'static str>,
    next_id: GLuint,

    capabilities: FastHashMap<(GLenum, GLenum), bool>,
    client_capabilities: FastHashMap<(GLenum, GLenum), bool>,
    params: FastHashMap<GLenum, [f64; 4]>,
    lights: FastHashMap<(GLenum, GLenum), [f32; 4]>,
    light_model: FastHashMap<GLenum, [f32; 4]>,
    materials: FastHashMap<GLenum, [f32; 4]>,
    fog: FastHashMap<GLenum, [f32; 4]>,
    hints: FastHashMap<GLenum, GLenum>,

    matrix_mode: GLenum,
    matrices: FastHashMap<GLenum, [f32; 16]>,
    current_palette: GLuint,
    palette: FastHashMap<GLuint, [f32; 16]>,
    uniforms: FastHashMap<GLint, Vec<f32>>,

    active_texture: GLenum,
    client_active_texture: GLenum,
    texture_bindings: FastHashMap<(GLenum, GLenum), GLuint>,
    tex_env: FastHashMap<(GLenum, GLenum), [f32; 4]>,
    textures: FastHashMap<GLuint, TextureInfo>,
    pixel_store: FastHashMap<GLenum, GLint>,

    buffers: FastHashMap<GLuint, Vec<u8>>,
    buffer_bindings: FastHashMap<GLenum, GLuint>,
    pointers: FastHashMap<(GLenum, GLenum), ArrayPointer>,

    framebuffer: GLuint,
    renderbuffer: GLuint,
    framebuffers: FastHashMap<GLuint, FramebufferInfo>,
    renderbuffers: FastHashMap<GLuint, RenderbufferInfo>,
    window: Image,
    draws: Vec<DrawCall>,
}

impl HeadlessState {
    fn new(window: IntSize) -> Self {
        let mut params = FastHashMap::default();
        let mut set = |name: GLenum, v: &[f64]| {
            let mut p = [0.0; 4];
            p[..v.len()].copy_from_slice(v);
            params.insert(name, p);
        };

        let (w, h) = (f64::from(window.width), f64::from(window.height));
        set(VIEWPORT, &[0.0, 0.0, w, h]);
        set(SCISSOR_BOX, &[0.0, 0.0, w, h]);
        set(BLEND_SRC, &[f64::from(ONE)]);
        set(BLEND_DST, &[f64::from(ZERO)]);
        set(ALPHA_TEST_FUNC, &[f64::from(ALWAYS)]);
        set(DEPTH_FUNC, &[f64::from(LESS)]);
        set(DEPTH_WRITEMASK, &[1.0]);
        set(DEPTH_CLEAR_VALUE, &[1.0]);
        set(CULL_FACE_MODE, &[f64::from(BACK)]);
        set(FRONT_FACE, &[f64::from(CCW)]);
        set(SHADE_MODEL, &[f64::from(SMOOTH)]);
        set(CURRENT_COLOR, &[1.0, 1.0, 1.0, 1.0]);
        set(COLOR_WRITEMASK, &[1.0, 1.0, 1.0, 1.0]);
        set(LINE_WIDTH, &[1.0]);
        set(POINT_SIZE, &[1.0]);
        set(STENCIL_FUNC, &[f64::from(ALWAYS)]);
        set(STENCIL_VALUE_MASK, &[f64::from(::std::u32::MAX)]);
        set(STENCIL_FAIL, &[f64::from(KEEP)]);
        set(STENCIL_PASS_DEPTH_FAIL, &[f64::from(KEEP)]);
        set(STENCIL_PASS_DEPTH_PASS, &[f64::from(KEEP)]);
        set(MAX_LIGHTS, &[8.0]);
        set(MAX_CLIP_PLANES, &[6.0]);
        set(MAX_PALETTE_MATRICES_OES, &[11.0]);
        set(MAX_TEXTURE_UNITS, &[4.0]);
        set(MAX_VERTEX_UNITS_OES, &[4.0]);
        set(MAX_SAMPLES, &[4.0]);
        set(MAX_TEXTURE_SIZE, &[4096.0]);

        let mut capabilities = FastHashMap::default();
        capabilities.insert((DITHER, 0), true);
        capabilities.insert((MULTISAMPLE, 0), true);

        let mut fog = FastHashMap::default();
        fog.insert(FOG_MODE, [EXP as f32, 0.0, 0.0, 0.0]);
        fog.insert(FOG_DENSITY, [1.0, 0.0, 0.0, 0.0]);
        fog.insert(FOG_END, [1.0, 0.0, 0.0, 0.0]);

        let mut light_model = FastHashMap::default();
        light_model.insert(LIGHT_MODEL_AMBIENT, [0.2, 0.2, 0.2, 1.0]);

        HeadlessState {
            calls: FastHashMap::default(),
            failures: FastHashSet::default(),
            next_id: 1,

            capabilities,
            client_capabilities: FastHashMap::default(),
            params,
            lights: FastHashMap::default(),
            light_model,
            materials: FastHashMap::default(),
            fog,
            hints: FastHashMap::default(),

            matrix_mode: MODELVIEW,
            matrices: FastHashMap::default(),
            current_palette: 0,
            palette: FastHashMap::default(),
            uniforms: FastHashMap::default(),

            active_texture: TEXTURE0,
            client_active_texture: TEXTURE0,
            texture_bindings: FastHashMap::default(),
            tex_env: FastHashMap::default(),
            textures: FastHashMap::default(),
            pixel_store: FastHashMap::default(),

            buffers: FastHashMap::default(),
            buffer_bindings: FastHashMap::default(),
            pointers: FastHashMap::default(),

            framebuffer: 0,
            renderbuffer: 0,
            framebuffers: FastHashMap::default(),
            renderbuffers: FastHashMap::default(),
            window: Image::new(window),
            draws: Vec::new(),
        }
    }

    fn call(&mut self, name: &'static str) -> Result<()> {
        *self.calls.entry(name).or_insert(0) += 1;
        if self.failures.remove(name) {
            bail!("[GL] {} (injected by {})", error_str(INVALID_OPERATION), name);
        }

        Ok(())
    }

    fn gen(&mut self) -> GLuint {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn param(&self, name: GLenum) -> [f64; 4] {
        self.params.get(&name).cloned().unwrap_or([0.0; 4])
    }

    fn set_param(&mut self, name: GLenum, v: &[f64]) {
        let mut p = [0.0; 4];
        p[..v.len()].copy_from_slice(v);
        self.params.insert(name, p);
    }

    fn integer(&self, name: GLenum) -> [GLint; 4] {
        let single = |v: GLuint| [v as GLint, 0, 0, 0];
        match name {
            ACTIVE_TEXTURE => single(self.active_texture),
            CLIENT_ACTIVE_TEXTURE => single(self.client_active_texture),
            TEXTURE_BINDING_2D => single(self.binding(TEXTURE_2D)),
            TEXTURE_BINDING_CUBE_MAP => single(self.binding(TEXTURE_CUBE_MAP)),
            ARRAY_BUFFER_BINDING => single(self.buffer_binding(ARRAY_BUFFER)),
            ELEMENT_ARRAY_BUFFER_BINDING => single(self.buffer_binding(ELEMENT_ARRAY_BUFFER)),
            FRAMEBUFFER_BINDING => single(self.framebuffer),
            RENDERBUFFER_BINDING => single(self.renderbuffer),
            MATRIX_MODE => single(self.matrix_mode),
            CURRENT_PALETTE_MATRIX_OES => single(self.current_palette),
            _ => {
                let p = self.param(name);
                [p[0] as GLint, p[1] as GLint, p[2] as GLint, p[3] as GLint]
            }
        }
    }

    fn binding(&self, target: GLenum) -> GLuint {
        self.texture_bindings
            .get(&(self.active_texture, target))
            .cloned()
            .unwrap_or(0)
    }

    fn buffer_binding(&self, target: GLenum) -> GLuint {
        self.buffer_bindings.get(&target).cloned().unwrap_or(0)
    }

    fn capability_key(&self, cap: GLenum) -> (GLenum, GLenum) {
        match cap {
            TEXTURE_2D | TEXTURE_CUBE_MAP => (cap, self.active_texture),
            _ => (cap, 0),
        }
    }

    fn is_enabled(&self, cap: GLenum) -> bool {
        let key = self.capability_key(cap);
        self.capabilities.get(&key).cloned().unwrap_or(false)
    }

    fn is_client_enabled(&self, unit: GLenum, array: GLenum) -> bool {
        self.client_capabilities
            .get(&(client_unit(unit, array), array))
            .cloned()
            .unwrap_or(false)
    }

    fn color_attachment(&self) -> Option<Attached> {
        if self.framebuffer == 0 {
            return None;
        }

        self.framebuffers
            .get(&self.framebuffer)
            .and_then(|v| v.attachments.get(&COLOR_ATTACHMENT0).cloned())
    }

    fn depth_attachment(&self) -> Option<Attached> {
        if self.framebuffer == 0 {
            return None;
        }

        self.framebuffers
            .get(&self.framebuffer)
            .and_then(|v| v.attachments.get(&DEPTH_ATTACHMENT).cloned())
    }

    fn image_mut(&mut self, attached: Option<Attached>) -> Option<&mut Image> {
        match attached {
            None if self.framebuffer == 0 => Some(&mut self.window),
            None => None,
            Some(Attached::Renderbuffer(id)) => self.renderbuffers.get_mut(&id).map(|v| &mut v.image),
            Some(Attached::Texture { id, face, level }) => self
                .textures
                .get_mut(&id)
                .and_then(|v| v.images.get_mut(&(face, level))),
        }
    }

    fn color_target(&mut self) -> Option<&mut Image> {
        let attached = self.color_attachment();
        self.image_mut(attached)
    }

    fn depth_target(&mut self) -> Option<&mut Image> {
        let attached = self.depth_attachment();
        self.image_mut(attached)
    }

    fn matrix(&self, mode: GLenum) -> Matrix4<f32> {
        match self.matrices.get(&mode) {
            Some(m) => matrix_from_slice(m),
            None => Matrix4::identity(),
        }
    }

    fn read_bytes(&self, buffer: GLuint, offset: usize, len: usize) -> Option<Vec<u8>> {
        if buffer != 0 {
            let data = self.buffers.get(&buffer)?;
            if offset + len > data.len() {
                return None;
            }

            Some(data[offset..offset + len].to_vec())
        } else if offset == 0 {
            None
        } else {
            // Client memory, as handed to the pointer call by the caller.
            unsafe {
                let ptr = offset as *const u8;
                Some(::std::slice::from_raw_parts(ptr, len).to_vec())
            }
        }
    }

    fn fetch_location(&self, index: usize) -> Option<Vector4<f32>> {
        let layout = *self.pointers.get(&(TEXTURE0, VERTEX_ARRAY))?;
        if layout.ty != FLOAT || layout.size < 2 {
            return None;
        }

        let size = layout.size as usize;
        let stride = if layout.stride == 0 {
            size * 4
        } else {
            layout.stride as usize
        };

        let bytes = self.read_bytes(layout.buffer, layout.offset + index * stride, size * 4)?;
        let mut v = [0.0, 0.0, 0.0, 1.0];
        for (i, c) in bytes.chunks(4).enumerate().take(size) {
            v[i] = f32::from_bits(u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        }

        Some(Vector4::new(v[0], v[1], v[2], v[3]))
    }

    fn fetch_index(&self, ty: GLenum, offset: usize, i: usize) -> Option<usize> {
        let size = type_size(ty);
        let buffer = self.buffer_binding(ELEMENT_ARRAY_BUFFER);
        let bytes = self.read_bytes(buffer, offset + i * size, size)?;
        Some(match size {
            1 => bytes[0] as usize,
            2 => u16::from_le_bytes([bytes[0], bytes[1]]) as usize,
            _ => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize,
        })
    }

    fn record_draw(&mut self, mode: GLenum, first: GLint, count: GLsizei, indexed: bool) {
        let p = self.param(CURRENT_COLOR);
        let color = Color4F::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32);
        let texture = self
            .texture_bindings
            .get(&(TEXTURE0, TEXTURE_2D))
            .cloned()
            .unwrap_or(0);

        self.draws.push(DrawCall {
            mode,
            first,
            count,
            indexed,
            color,
            framebuffer: self.framebuffer,
            texture,
            palette_enabled: self.is_enabled(MATRIX_PALETTE_OES),
        });
    }

    fn triangles(&self, mode: GLenum, indices: &[usize]) -> Vec<[usize; 3]> {
        let mut tris = Vec::new();
        match mode {
            TRIANGLES => {
                for c in indices.chunks(3).filter(|c| c.len() == 3) {
                    tris.push([c[0], c[1], c[2]]);
                }
            }
            TRIANGLE_STRIP => {
                for i in 2..indices.len() {
                    tris.push([indices[i - 2], indices[i - 1], indices[i]]);
                }
            }
            TRIANGLE_FAN => {
                for i in 2..indices.len() {
                    tris.push([indices[0], indices[i - 1], indices[i]]);
                }
            }
            _ => {}
        }

        tris
    }

    fn rasterize(&mut self, mode: GLenum, indices: &[usize]) {
        if !self.is_client_enabled(TEXTURE0, VERTEX_ARRAY) {
            return;
        }

        let mvp = self.matrix(PROJECTION) * self.matrix(MODELVIEW);
        let vp = self.param(VIEWPORT);
        let scissor = if self.is_enabled(SCISSOR_TEST) {
            let s = self.param(SCISSOR_BOX);
            Some(Viewport::new(s[0] as i32, s[1] as i32, s[2] as i32, s[3] as i32))
        } else {
            None
        };

        let depth_test = self.is_enabled(DEPTH_TEST);
        let depth_func = self.param(DEPTH_FUNC)[0] as GLenum;
        let depth_write = self.param(DEPTH_WRITEMASK)[0] != 0.0;
        let c = self.param(CURRENT_COLOR);
        let color = Color4B::from(Color4F::new(c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32));

        let mut fragments = Vec::new();
        for tri in self.triangles(mode, indices) {
            let mut screen = [[0.0f32; 3]; 3];
            let mut valid = true;
            for (i, &index) in tri.iter().enumerate() {
                match self.fetch_location(index) {
                    Some(v) => {
                        let clip = mvp * v;
                        if clip.w <= 0.0 {
                            valid = false;
                            break;
                        }

                        let ndc = clip.truncate() / clip.w;
                        screen[i] = [
                            vp[0] as f32 + (ndc.x + 1.0) * 0.5 * vp[2] as f32,
                            vp[1] as f32 + (ndc.y + 1.0) * 0.5 * vp[3] as f32,
                            (ndc.z + 1.0) * 0.5,
                        ];
                    }
                    None => {
                        valid = false;
                        break;
                    }
                }
            }

            if valid {
                cover(&screen, &mut fragments);
            }
        }

        // Without a depth attachment, the color image's own depth plane is used.
        let depth_attachment = self.depth_attachment();
        let mut depth = match depth_attachment {
            Some(_) => self.image_mut(depth_attachment).map(|v| v.depth.clone()),
            None => None,
        };

        {
            let target = match self.color_target() {
                Some(v) => v,
                None => return,
            };

            for (x, y, z) in fragments {
                if let Some(ref s) = scissor {
                    if !s.contains(x, y) {
                        continue;
                    }
                }

                let i = match target.index(x, y) {
                    Some(i) => i,
                    None => continue,
                };

                if depth_test {
                    let plane = match depth {
                        Some(ref mut d) if d.len() == target.depth.len() => d,
                        _ => &mut target.depth,
                    };

                    let stored = plane[i];
                    let pass = match depth_func {
                        NEVER => false,
                        LESS => z < stored,
                        EQUAL => z == stored,
                        LEQUAL => z <= stored,
                        GREATER => z > stored,
                        NOTEQUAL => z != stored,
                        GEQUAL => z >= stored,
                        _ => true,
                    };

                    if !pass {
                        continue;
                    }

                    if depth_write {
                        plane[i] = z;
                    }
                }

                target.pixels[i * 4..i * 4 + 4].copy_from_slice(&color.rgba());
            }
        }

        if let Some(d) = depth {
            if let Some(image) = self.image_mut(depth_attachment) {
                image.depth = d;
            }
        }
    }
}

// Texture coordinate arrays are per client texture unit, the others are global.
fn client_unit(unit: GLenum, array: GLenum) -> GLenum {
    if array == TEXTURE_COORD_ARRAY {
        unit
    } else {
        TEXTURE0
    }
}

fn matrix_from_slice(m: &[f32; 16]) -> Matrix4<f32> {
    Matrix4::new(
        m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8], m[9], m[10], m[11], m[12], m[13],
        m[14], m[15],
    )
}

// Collects the pixel centers covered by a triangle in window coordinates.
fn cover(v: &[[f32; 3]; 3], out: &mut Vec<(i32, i32, f32)>) {
    let edge = |a: [f32; 3], b: [f32; 3], x: f32, y: f32| {
        (b[0] - a[0]) * (y - a[1]) - (b[1] - a[1]) * (x - a[0])
    };

    let area = edge(v[0], v[1], v[2][0], v[2][1]);
    if area.abs() < ::std::f32::EPSILON {
        return;
    }

    let min_x = v.iter().map(|p| p[0]).fold(::std::f32::MAX, f32::min).floor() as i32;
    let max_x = v.iter().map(|p| p[0]).fold(::std::f32::MIN, f32::max).ceil() as i32;
    let min_y = v.iter().map(|p| p[1]).fold(::std::f32::MAX, f32::min).floor() as i32;
    let max_y = v.iter().map(|p| p[1]).fold(::std::f32::MIN, f32::max).ceil() as i32;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(v[1], v[2], px, py) / area;
            let w1 = edge(v[2], v[0], px, py) / area;
            let w2 = edge(v[0], v[1], px, py) / area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                out.push((x, y, w0 * v[0][2] + w1 * v[1][2] + w2 * v[2][2]));
            }
        }
    }
}

/// A handle to the state of a `HeadlessDevice`, which stays usable after the device
/// has been boxed into a `GLEngine`.
#[derive(Clone)]
pub struct HeadlessProbe {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessProbe {
    /// Returns the number of calls made to the named device method.
    pub fn call_count(&self, name: &str) -> usize {
        self.state.borrow().calls.get(name).cloned().unwrap_or(0)
    }

    /// Returns the number of calls made to the device in total.
    pub fn total_calls(&self) -> usize {
        self.state.borrow().calls.values().sum()
    }

    pub fn reset_call_counts(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Makes the next call of the named device method fail with `INVALID_OPERATION`.
    pub fn fail_next(&self, name: &'static str) {
        self.state.borrow_mut().failures.insert(name);
    }

    pub fn is_enabled(&self, cap: GLenum) -> bool {
        self.state.borrow().is_enabled(cap)
    }

    /// Changes a capability behind the back of the trackers, like the 2d overlay does.
    pub fn set_capability(&self, cap: GLenum, enabled: bool) {
        let mut s = self.state.borrow_mut();
        let key = s.capability_key(cap);
        s.capabilities.insert(key, enabled);
    }

    pub fn is_texture_enabled(&self, unit: GLenum, target: GLenum) -> bool {
        self.state
            .borrow()
            .capabilities
            .get(&(target, unit))
            .cloned()
            .unwrap_or(false)
    }

    pub fn is_client_enabled(&self, unit: GLenum, array: GLenum) -> bool {
        self.state.borrow().is_client_enabled(unit, array)
    }

    /// Returns the first four integer values of a query.
    pub fn integer(&self, name: GLenum) -> [GLint; 4] {
        self.state.borrow().integer(name)
    }

    pub fn float(&self, name: GLenum) -> [f32; 4] {
        let p = self.state.borrow().param(name);
        [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
    }

    /// Changes a queryable value behind the back of the trackers.
    pub fn set_param(&self, name: GLenum, v: &[f64]) {
        self.state.borrow_mut().set_param(name, v);
    }

    pub fn blend_func(&self) -> (GLenum, GLenum) {
        let s = self.state.borrow();
        (s.param(BLEND_SRC)[0] as GLenum, s.param(BLEND_DST)[0] as GLenum)
    }

    pub fn current_color(&self) -> Color4F {
        self.float(CURRENT_COLOR).into()
    }

    pub fn viewport(&self) -> Viewport {
        let v = self.integer(VIEWPORT);
        Viewport::new(v[0], v[1], v[2], v[3])
    }

    pub fn active_texture(&self) -> GLenum {
        self.state.borrow().active_texture
    }

    pub fn texture_binding(&self, unit: GLenum, target: GLenum) -> GLuint {
        self.state
            .borrow()
            .texture_bindings
            .get(&(unit, target))
            .cloned()
            .unwrap_or(0)
    }

    pub fn tex_env(&self, unit: GLenum, name: GLenum) -> [f32; 4] {
        self.state
            .borrow()
            .tex_env
            .get(&(unit, name))
            .cloned()
            .unwrap_or([0.0; 4])
    }

    pub fn light(&self, light: GLenum, name: GLenum) -> [f32; 4] {
        self.state
            .borrow()
            .lights
            .get(&(light, name))
            .cloned()
            .unwrap_or([0.0; 4])
    }

    pub fn material(&self, name: GLenum) -> [f32; 4] {
        self.state
            .borrow()
            .materials
            .get(&name)
            .cloned()
            .unwrap_or([0.0; 4])
    }

    pub fn fog(&self, name: GLenum) -> [f32; 4] {
        self.state.borrow().fog.get(&name).cloned().unwrap_or([0.0; 4])
    }

    pub fn hint(&self, target: GLenum) -> GLenum {
        self.state
            .borrow()
            .hints
            .get(&target)
            .cloned()
            .unwrap_or(DONT_CARE)
    }

    pub fn matrix(&self, mode: GLenum) -> Matrix4<f32> {
        self.state.borrow().matrix(mode)
    }

    pub fn palette_matrix(&self, index: GLuint) -> Option<Matrix4<f32>> {
        self.state
            .borrow()
            .palette
            .get(&index)
            .map(|m| matrix_from_slice(m))
    }

    pub fn uniform(&self, location: GLint) -> Option<Vec<f32>> {
        self.state.borrow().uniforms.get(&location).cloned()
    }

    pub fn pointer(&self, unit: GLenum, array: GLenum) -> Option<ArrayPointer> {
        self.state
            .borrow()
            .pointers
            .get(&(client_unit(unit, array), array))
            .cloned()
    }

    pub fn texture(&self, id: GLuint) -> Option<TextureInfo> {
        self.state.borrow().textures.get(&id).cloned()
    }

    pub fn texture_count(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn buffer(&self, id: GLuint) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&id).cloned()
    }

    pub fn buffer_count(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn framebuffer_binding(&self) -> GLuint {
        self.state.borrow().framebuffer
    }

    pub fn framebuffer(&self, id: GLuint) -> Option<FramebufferInfo> {
        self.state.borrow().framebuffers.get(&id).cloned()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    pub fn renderbuffer(&self, id: GLuint) -> Option<RenderbufferInfo> {
        self.state.borrow().renderbuffers.get(&id).cloned()
    }

    pub fn renderbuffer_count(&self) -> usize {
        self.state.borrow().renderbuffers.len()
    }

    pub fn window(&self) -> Image {
        self.state.borrow().window.clone()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    pub fn clear_draws(&self) {
        self.state.borrow_mut().draws.clear();
    }
}

/// The headless implementation of `Device`.
pub struct HeadlessDevice {
    state: Rc<RefCell<HeadlessState>>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        HeadlessDevice::new()
    }
}

impl HeadlessDevice {
    /// Creates a device with a 64x64 window.
    pub fn new() -> Self {
        HeadlessDevice::with_window_size(IntSize::new(64, 64))
    }

    pub fn with_window_size(size: IntSize) -> Self {
        HeadlessDevice {
            state: Rc::new(RefCell::new(HeadlessState::new(size))),
        }
    }

    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: self.state.clone(),
        }
    }
}

impl Device for HeadlessDevice {
    unsafe fn is_enabled(&mut self, cap: GLenum) -> Result<bool> {
        let mut s = self.state.borrow_mut();
        s.call("is_enabled")?;
        Ok(s.is_enabled(cap))
    }

    unsafe fn get_integer_v(&mut self, name: GLenum, out: &mut [GLint]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("get_integer_v")?;
        let v = s.integer(name);
        for (o, v) in out.iter_mut().zip(v.iter()) {
            *o = *v;
        }
        Ok(())
    }

    unsafe fn get_float_v(&mut self, name: GLenum, out: &mut [GLfloat]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("get_float_v")?;
        let v = s.param(name);
        for (o, v) in out.iter_mut().zip(v.iter()) {
            *o = *v as f32;
        }
        Ok(())
    }

    unsafe fn get_light_fv(
        &mut self,
        light: GLenum,
        name: GLenum,
        out: &mut [GLfloat],
    ) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("get_light_fv")?;
        let v = s
            .lights
            .get(&(light, name))
            .cloned()
            .unwrap_or_else(|| default_light(light, name));
        for (o, v) in out.iter_mut().zip(v.iter()) {
            *o = *v;
        }
        Ok(())
    }

    unsafe fn set_capability(&mut self, cap: GLenum, enabled: bool) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("set_capability")?;
        let key = s.capability_key(cap);
        s.capabilities.insert(key, enabled);
        Ok(())
    }

    unsafe fn set_client_capability(&mut self, cap: GLenum, enabled: bool) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("set_client_capability")?;
        let unit = client_unit(s.client_active_texture, cap);
        s.client_capabilities.insert((unit, cap), enabled);
        Ok(())
    }

    unsafe fn blend_func(&mut self, src: GLenum, dst: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("blend_func")?;
        s.set_param(BLEND_SRC, &[f64::from(src)]);
        s.set_param(BLEND_DST, &[f64::from(dst)]);
        Ok(())
    }

    unsafe fn alpha_func(&mut self, func: GLenum, reference: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("alpha_func")?;
        s.set_param(ALPHA_TEST_FUNC, &[f64::from(func)]);
        s.set_param(ALPHA_TEST_REF, &[f64::from(reference)]);
        Ok(())
    }

    unsafe fn clear_color(&mut self, color: [GLfloat; 4]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("clear_color")?;
        s.set_param(COLOR_CLEAR_VALUE, &to_f64(&color));
        Ok(())
    }

    unsafe fn clear_depth(&mut self, depth: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("clear_depth")?;
        s.set_param(DEPTH_CLEAR_VALUE, &[f64::from(depth)]);
        Ok(())
    }

    unsafe fn clear_stencil(&mut self, stencil: GLint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("clear_stencil")?;
        s.set_param(STENCIL_CLEAR_VALUE, &[f64::from(stencil)]);
        Ok(())
    }

    unsafe fn color_4f(&mut self, color: [GLfloat; 4]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("color_4f")?;
        s.set_param(CURRENT_COLOR, &to_f64(&color));
        Ok(())
    }

    unsafe fn color_4ub(&mut self, color: Color4B) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("color_4ub")?;
        s.set_param(CURRENT_COLOR, &to_f64(&Color4F::from(color).rgba()));
        Ok(())
    }

    unsafe fn color_mask(&mut self, mask: [bool; 4]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("color_mask")?;
        let v: Vec<f64> = mask.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect();
        s.set_param(COLOR_WRITEMASK, &v);
        Ok(())
    }

    unsafe fn cull_face(&mut self, mode: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("cull_face")?;
        s.set_param(CULL_FACE_MODE, &[f64::from(mode)]);
        Ok(())
    }

    unsafe fn depth_func(&mut self, func: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("depth_func")?;
        s.set_param(DEPTH_FUNC, &[f64::from(func)]);
        Ok(())
    }

    unsafe fn depth_mask(&mut self, enabled: bool) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("depth_mask")?;
        s.set_param(DEPTH_WRITEMASK, &[if enabled { 1.0 } else { 0.0 }]);
        Ok(())
    }

    unsafe fn front_face(&mut self, mode: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("front_face")?;
        s.set_param(FRONT_FACE, &[f64::from(mode)]);
        Ok(())
    }

    unsafe fn line_width(&mut self, width: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("line_width")?;
        s.set_param(LINE_WIDTH, &[f64::from(width)]);
        Ok(())
    }

    unsafe fn point_size(&mut self, size: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("point_size")?;
        s.set_param(POINT_SIZE, &[f64::from(size)]);
        Ok(())
    }

    unsafe fn polygon_offset(&mut self, factor: GLfloat, units: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("polygon_offset")?;
        s.set_param(POLYGON_OFFSET_FACTOR, &[f64::from(factor)]);
        s.set_param(POLYGON_OFFSET_UNITS, &[f64::from(units)]);
        Ok(())
    }

    unsafe fn scissor(&mut self, rect: Viewport) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("scissor")?;
        s.set_param(SCISSOR_BOX, &rect_to_f64(rect));
        Ok(())
    }

    unsafe fn viewport(&mut self, rect: Viewport) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("viewport")?;
        s.set_param(VIEWPORT, &rect_to_f64(rect));
        Ok(())
    }

    unsafe fn shade_model(&mut self, mode: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("shade_model")?;
        s.set_param(SHADE_MODEL, &[f64::from(mode)]);
        Ok(())
    }

    unsafe fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("stencil_func")?;
        s.set_param(STENCIL_FUNC, &[f64::from(func)]);
        s.set_param(STENCIL_REF, &[f64::from(reference)]);
        s.set_param(STENCIL_VALUE_MASK, &[f64::from(mask)]);
        Ok(())
    }

    unsafe fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("stencil_op")?;
        s.set_param(STENCIL_FAIL, &[f64::from(sfail)]);
        s.set_param(STENCIL_PASS_DEPTH_FAIL, &[f64::from(dpfail)]);
        s.set_param(STENCIL_PASS_DEPTH_PASS, &[f64::from(dppass)]);
        Ok(())
    }

    unsafe fn hint(&mut self, target: GLenum, mode: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("hint")?;
        s.hints.insert(target, mode);
        s.set_param(target, &[f64::from(mode)]);
        Ok(())
    }

    unsafe fn fog_f(&mut self, name: GLenum, v: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("fog_f")?;
        s.fog.insert(name, [v, 0.0, 0.0, 0.0]);
        Ok(())
    }

    unsafe fn fog_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("fog_fv")?;
        s.fog.insert(name, v);
        Ok(())
    }

    unsafe fn light_f(&mut self, light: GLenum, name: GLenum, v: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("light_f")?;
        s.lights.insert((light, name), [v, 0.0, 0.0, 0.0]);
        Ok(())
    }

    unsafe fn light_fv(&mut self, light: GLenum, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("light_fv")?;
        s.lights.insert((light, name), v);
        Ok(())
    }

    unsafe fn light_model_f(&mut self, name: GLenum, v: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("light_model_f")?;
        s.light_model.insert(name, [v, 0.0, 0.0, 0.0]);
        Ok(())
    }

    unsafe fn light_model_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("light_model_fv")?;
        s.light_model.insert(name, v);
        Ok(())
    }

    unsafe fn material_f(&mut self, name: GLenum, v: GLfloat) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("material_f")?;
        s.materials.insert(name, [v, 0.0, 0.0, 0.0]);
        Ok(())
    }

    unsafe fn material_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("material_fv")?;
        s.materials.insert(name, v);
        Ok(())
    }

    unsafe fn matrix_mode(&mut self, mode: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("matrix_mode")?;
        s.matrix_mode = mode;
        Ok(())
    }

    unsafe fn load_matrix(&mut self, m: &[GLfloat; 16]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("load_matrix")?;
        if s.matrix_mode == MATRIX_PALETTE_OES {
            let index = s.current_palette;
            s.palette.insert(index, *m);
        } else {
            let mode = s.matrix_mode;
            s.matrices.insert(mode, *m);
        }
        Ok(())
    }

    unsafe fn current_palette_matrix(&mut self, index: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("current_palette_matrix")?;
        if index as f64 >= s.param(MAX_PALETTE_MATRICES_OES)[0] {
            bail!("[GL] {}", error_str(INVALID_VALUE));
        }
        s.current_palette = index;
        Ok(())
    }

    unsafe fn active_texture(&mut self, unit: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("active_texture")?;
        s.active_texture = unit;
        Ok(())
    }

    unsafe fn client_active_texture(&mut self, unit: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("client_active_texture")?;
        s.client_active_texture = unit;
        Ok(())
    }

    unsafe fn bind_texture(&mut self, target: GLenum, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("bind_texture")?;
        if id != 0 {
            let info = s.textures.entry(id).or_insert_with(TextureInfo::default);
            info.target = target;
        }
        let unit = s.active_texture;
        s.texture_bindings.insert((unit, target), id);
        Ok(())
    }

    unsafe fn tex_env_i(&mut self, name: GLenum, v: GLint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("tex_env_i")?;
        let unit = s.active_texture;
        s.tex_env.insert((unit, name), [v as f32, 0.0, 0.0, 0.0]);
        Ok(())
    }

    unsafe fn tex_env_fv(&mut self, name: GLenum, v: [GLfloat; 4]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("tex_env_fv")?;
        let unit = s.active_texture;
        s.tex_env.insert((unit, name), v);
        Ok(())
    }

    unsafe fn gen_texture(&mut self) -> Result<GLuint> {
        let mut s = self.state.borrow_mut();
        s.call("gen_texture")?;
        let id = s.gen();
        s.textures.insert(id, TextureInfo::default());
        Ok(id)
    }

    unsafe fn delete_texture(&mut self, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("delete_texture")?;
        s.textures.remove(&id);
        for v in s.texture_bindings.values_mut() {
            if *v == id {
                *v = 0;
            }
        }
        Ok(())
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
        let mut s = self.state.borrow_mut();
        s.call("tex_image_2d")?;

        let max = s.param(MAX_TEXTURE_SIZE)[0] as i32;
        if size.width > max || size.height > max || size.width < 0 || size.height < 0 {
            bail!("[GL] {}", error_str(INVALID_VALUE));
        }

        let binding = if target == TEXTURE_2D {
            TEXTURE_2D
        } else {
            TEXTURE_CUBE_MAP
        };

        let id = s.binding(binding);
        let info = match s.textures.get_mut(&id) {
            Some(info) if id != 0 => info,
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        };

        let mut image = Image::new(size);
        if let Some(pixels) = pixels {
            if format == RGBA && ty == UNSIGNED_BYTE && pixels.len() == image.pixels.len() {
                image.pixels.copy_from_slice(pixels);
            }
        }

        info.format = format;
        info.ty = ty;
        info.images.insert((target, level), image);
        Ok(())
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
        let mut s = self.state.borrow_mut();
        s.call("tex_sub_image_2d")?;

        let binding = if target == TEXTURE_2D {
            TEXTURE_2D
        } else {
            TEXTURE_CUBE_MAP
        };

        let id = s.binding(binding);
        let image = match s
            .textures
            .get_mut(&id)
            .and_then(|v| v.images.get_mut(&(target, level)))
        {
            Some(image) => image,
            None => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        };

        if rect.x < 0
            || rect.y < 0
            || rect.x + rect.w > image.size.width
            || rect.y + rect.h > image.size.height
        {
            bail!("[GL] {}", error_str(INVALID_VALUE));
        }

        if format == RGBA && ty == UNSIGNED_BYTE && pixels.len() >= rect.area() * 4 {
            for row in 0..rect.h {
                let src = (row * rect.w * 4) as usize;
                let dst = (((rect.y + row) * image.size.width + rect.x) * 4) as usize;
                let len = (rect.w * 4) as usize;
                image.pixels[dst..dst + len].copy_from_slice(&pixels[src..src + len]);
            }
        }

        Ok(())
    }

    unsafe fn tex_parameter_i(&mut self, target: GLenum, name: GLenum, v: GLint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("tex_parameter_i")?;
        let id = s.binding(target);
        match s.textures.get_mut(&id) {
            Some(info) if id != 0 => {
                info.params.insert(name, v);
                Ok(())
            }
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        }
    }

    unsafe fn generate_mipmap(&mut self, target: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("generate_mipmap")?;
        let id = s.binding(target);
        match s.textures.get_mut(&id) {
            Some(info) if id != 0 => {
                info.has_mipmap = true;
                Ok(())
            }
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        }
    }

    unsafe fn pixel_store_i(&mut self, name: GLenum, v: GLint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("pixel_store_i")?;
        s.pixel_store.insert(name, v);
        Ok(())
    }

    unsafe fn gen_buffer(&mut self) -> Result<GLuint> {
        let mut s = self.state.borrow_mut();
        s.call("gen_buffer")?;
        let id = s.gen();
        s.buffers.insert(id, Vec::new());
        Ok(id)
    }

    unsafe fn delete_buffer(&mut self, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("delete_buffer")?;
        s.buffers.remove(&id);
        for v in s.buffer_bindings.values_mut() {
            if *v == id {
                *v = 0;
            }
        }
        Ok(())
    }

    unsafe fn bind_buffer(&mut self, target: GLenum, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("bind_buffer")?;
        if id != 0 && !s.buffers.contains_key(&id) {
            bail!("[GL] {}", error_str(INVALID_OPERATION));
        }
        s.buffer_bindings.insert(target, id);
        Ok(())
    }

    unsafe fn buffer_data(&mut self, target: GLenum, data: &[u8], _: GLenum) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("buffer_data")?;
        let id = s.buffer_binding(target);
        match s.buffers.get_mut(&id) {
            Some(buf) if id != 0 => {
                *buf = data.to_vec();
                Ok(())
            }
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        }
    }

    unsafe fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("buffer_sub_data")?;
        let id = s.buffer_binding(target);
        match s.buffers.get_mut(&id) {
            Some(buf) if id != 0 => {
                if offset + data.len() > buf.len() {
                    bail!("[GL] {}", error_str(INVALID_VALUE));
                }
                buf[offset..offset + data.len()].copy_from_slice(data);
                Ok(())
            }
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        }
    }

    unsafe fn array_pointer(&mut self, array: GLenum, layout: ArrayPointer) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("array_pointer")?;
        let unit = client_unit(s.client_active_texture, array);
        s.pointers.insert((unit, array), layout);
        Ok(())
    }

    unsafe fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("draw_arrays")?;
        s.record_draw(mode, first, count, false);
        let indices: Vec<usize> = (first.max(0)..first.max(0) + count.max(0))
            .map(|v| v as usize)
            .collect();
        s.rasterize(mode, &indices);
        Ok(())
    }

    unsafe fn draw_elements(
        &mut self,
        mode: GLenum,
        count: GLsizei,
        ty: GLenum,
        offset: usize,
    ) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("draw_elements")?;
        s.record_draw(mode, offset as GLint, count, true);

        let mut indices = Vec::with_capacity(count.max(0) as usize);
        for i in 0..count.max(0) as usize {
            match s.fetch_index(ty, offset, i) {
                Some(v) => indices.push(v),
                None => return Ok(()),
            }
        }

        s.rasterize(mode, &indices);
        Ok(())
    }

    unsafe fn uniform_matrix4fv(&mut self, location: GLint, values: &[GLfloat]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("uniform_matrix4fv")?;
        s.uniforms.insert(location, values.to_vec());
        Ok(())
    }

    unsafe fn uniform4fv(&mut self, location: GLint, values: &[GLfloat]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("uniform4fv")?;
        s.uniforms.insert(location, values.to_vec());
        Ok(())
    }

    unsafe fn gen_framebuffer(&mut self) -> Result<GLuint> {
        let mut s = self.state.borrow_mut();
        s.call("gen_framebuffer")?;
        let id = s.gen();
        s.framebuffers.insert(id, FramebufferInfo::default());
        Ok(id)
    }

    unsafe fn delete_framebuffer(&mut self, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("delete_framebuffer")?;
        s.framebuffers.remove(&id);
        if s.framebuffer == id {
            s.framebuffer = 0;
        }
        Ok(())
    }

    unsafe fn bind_framebuffer(&mut self, _: GLenum, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("bind_framebuffer")?;
        if id != 0 && !s.framebuffers.contains_key(&id) {
            bail!("[GL] {}", error_str(INVALID_OPERATION));
        }
        s.framebuffer = id;
        Ok(())
    }

    unsafe fn gen_renderbuffer(&mut self) -> Result<GLuint> {
        let mut s = self.state.borrow_mut();
        s.call("gen_renderbuffer")?;
        let id = s.gen();
        s.renderbuffers.insert(id, RenderbufferInfo::default());
        Ok(id)
    }

    unsafe fn delete_renderbuffer(&mut self, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("delete_renderbuffer")?;
        s.renderbuffers.remove(&id);
        if s.renderbuffer == id {
            s.renderbuffer = 0;
        }
        Ok(())
    }

    unsafe fn bind_renderbuffer(&mut self, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("bind_renderbuffer")?;
        if id != 0 && !s.renderbuffers.contains_key(&id) {
            bail!("[GL] {}", error_str(INVALID_OPERATION));
        }
        s.renderbuffer = id;
        Ok(())
    }

    unsafe fn renderbuffer_storage(
        &mut self,
        format: GLenum,
        samples: GLuint,
        size: IntSize,
    ) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("renderbuffer_storage")?;
        if samples as f64 > s.param(MAX_SAMPLES)[0] {
            bail!("[GL] {}", error_str(INVALID_VALUE));
        }

        let id = s.renderbuffer;
        match s.renderbuffers.get_mut(&id) {
            Some(info) if id != 0 => {
                info.format = format;
                info.samples = samples;
                info.image = Image::new(size);
                Ok(())
            }
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        }
    }

    unsafe fn get_renderbuffer_parameter(&mut self, name: GLenum) -> Result<GLint> {
        let mut s = self.state.borrow_mut();
        s.call("get_renderbuffer_parameter")?;
        let id = s.renderbuffer;
        let info = match s.renderbuffers.get(&id) {
            Some(info) if id != 0 => info,
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        };

        Ok(match name {
            RENDERBUFFER_WIDTH => info.image.size.width,
            RENDERBUFFER_HEIGHT => info.image.size.height,
            RENDERBUFFER_INTERNAL_FORMAT => info.format as GLint,
            RENDERBUFFER_SAMPLES => info.samples as GLint,
            _ => bail!("[GL] {}", error_str(INVALID_ENUM)),
        })
    }

    unsafe fn framebuffer_renderbuffer(&mut self, attachment: GLenum, id: GLuint) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("framebuffer_renderbuffer")?;
        let fb = s.framebuffer;
        match s.framebuffers.get_mut(&fb) {
            Some(info) if fb != 0 => {
                if id == 0 {
                    info.attachments.remove(&attachment);
                } else {
                    info.attachments.insert(attachment, Attached::Renderbuffer(id));
                }
                Ok(())
            }
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        }
    }

    unsafe fn framebuffer_texture_2d(
        &mut self,
        attachment: GLenum,
        face: GLenum,
        id: GLuint,
        level: GLint,
    ) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("framebuffer_texture_2d")?;
        let fb = s.framebuffer;
        match s.framebuffers.get_mut(&fb) {
            Some(info) if fb != 0 => {
                if id == 0 {
                    info.attachments.remove(&attachment);
                } else {
                    info.attachments
                        .insert(attachment, Attached::Texture { id, face, level });
                }
                Ok(())
            }
            _ => bail!("[GL] {}", error_str(INVALID_OPERATION)),
        }
    }

    unsafe fn check_framebuffer_status(&mut self) -> Result<GLenum> {
        let mut s = self.state.borrow_mut();
        s.call("check_framebuffer_status")?;
        let fb = s.framebuffer;
        if fb == 0 {
            return Ok(FRAMEBUFFER_COMPLETE);
        }

        let attachments: Vec<Attached> = match s.framebuffers.get(&fb) {
            Some(info) => info.attachments.values().cloned().collect(),
            None => return Ok(FRAMEBUFFER_UNSUPPORTED),
        };

        if attachments.is_empty() {
            return Ok(FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT);
        }

        let mut sizes = Vec::new();
        let mut samples = Vec::new();
        for v in attachments {
            match v {
                Attached::Renderbuffer(id) => match s.renderbuffers.get(&id) {
                    Some(info) if !info.image.size.is_zero() => {
                        sizes.push(info.image.size);
                        samples.push(info.samples);
                    }
                    _ => return Ok(FRAMEBUFFER_INCOMPLETE_ATTACHMENT),
                },
                Attached::Texture { id, face, level } => {
                    match s.textures.get(&id).and_then(|t| t.images.get(&(face, level))) {
                        Some(image) if !image.size.is_zero() => {
                            sizes.push(image.size);
                            samples.push(0);
                        }
                        _ => return Ok(FRAMEBUFFER_INCOMPLETE_ATTACHMENT),
                    }
                }
            }
        }

        if sizes.iter().any(|v| *v != sizes[0]) {
            return Ok(FRAMEBUFFER_INCOMPLETE_DIMENSIONS);
        }

        if samples.iter().any(|v| *v != samples[0]) {
            return Ok(FRAMEBUFFER_INCOMPLETE_MULTISAMPLE);
        }

        Ok(FRAMEBUFFER_COMPLETE)
    }

    unsafe fn blit_framebuffer(&mut self, from: GLuint, to: GLuint, size: IntSize) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("blit_framebuffer")?;

        let bound = s.framebuffer;
        s.framebuffer = from;
        let src = s.color_target().map(|v| v.clone());
        s.framebuffer = to;
        if let (Some(src), Some(dst)) = (src, s.color_target()) {
            for y in 0..size.height.min(src.size.height).min(dst.size.height) {
                for x in 0..size.width.min(src.size.width).min(dst.size.width) {
                    if let (Some(i), Some(j)) = (src.index(x, y), dst.index(x, y)) {
                        dst.pixels[j * 4..j * 4 + 4].copy_from_slice(&src.pixels[i * 4..i * 4 + 4]);
                    }
                }
            }
        }

        s.framebuffer = bound;
        Ok(())
    }

    unsafe fn discard_framebuffer(&mut self, attachments: &[GLenum]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("discard_framebuffer")?;
        let fb = s.framebuffer;
        if let Some(info) = s.framebuffers.get_mut(&fb) {
            info.discarded.extend_from_slice(attachments);
        }
        Ok(())
    }

    unsafe fn clear(&mut self, mask: GLbitfield) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("clear")?;

        let c = s.param(COLOR_CLEAR_VALUE);
        let color = Color4B::from(Color4F::new(c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32));
        let depth = s.param(DEPTH_CLEAR_VALUE)[0] as f32;

        if mask & COLOR_BUFFER_BIT != 0 {
            if let Some(image) = s.color_target() {
                for px in image.pixels.chunks_mut(4) {
                    px.copy_from_slice(&color.rgba());
                }
            }
        }

        if mask & DEPTH_BUFFER_BIT != 0 {
            if let Some(image) = s.depth_target() {
                for v in &mut image.depth {
                    *v = depth;
                }
            }

            // Color renderbuffers carry their own depth plane in this device.
            if let Some(image) = s.color_target() {
                for v in &mut image.depth {
                    *v = depth;
                }
            }
        }

        Ok(())
    }

    unsafe fn read_pixels(&mut self, rect: Viewport, out: &mut [u8]) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.call("read_pixels")?;
        if out.len() < rect.area() * 4 {
            bail!("[GL] {}", error_str(INVALID_VALUE));
        }

        let image = match s.color_target() {
            Some(image) => image,
            None => bail!("[GL] {}", error_str(INVALID_FRAMEBUFFER_OPERATION)),
        };

        for y in 0..rect.h {
            for x in 0..rect.w {
                let dst = ((y * rect.w + x) * 4) as usize;
                let px = image
                    .pixel(rect.x + x, rect.y + y)
                    .unwrap_or_else(|| Color4B::new(0, 0, 0, 0));
                out[dst..dst + 4].copy_from_slice(&px.rgba());
            }
        }

        Ok(())
    }

    unsafe fn finish(&mut self) -> Result<()> {
        self.state.borrow_mut().call("finish")
    }
}

fn default_light(light: GLenum, name: GLenum) -> [f32; 4] {
    match name {
        AMBIENT => [0.0, 0.0, 0.0, 1.0],
        DIFFUSE | SPECULAR if light == LIGHT0 => [1.0, 1.0, 1.0, 1.0],
        DIFFUSE | SPECULAR => [0.0, 0.0, 0.0, 1.0],
        POSITION => [0.0, 0.0, 1.0, 0.0],
        SPOT_DIRECTION => [0.0, 0.0, -1.0, 0.0],
        SPOT_CUTOFF => [180.0, 0.0, 0.0, 0.0],
        CONSTANT_ATTENUATION => [1.0, 0.0, 0.0, 0.0],
        _ => [0.0; 4],
    }
}

fn to_f64(v: &[f32]) -> Vec<f64> {
    v.iter().map(|&v| f64::from(v)).collect()
}

fn rect_to_f64(rect: Viewport) -> [f64; 4] {
    [
        f64::from(rect.x),
        f64::from(rect.y),
        f64::from(rect.w),
        f64::from(rect.h),
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn injected_failures_fire_once() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();

        probe.fail_next("clear");
        unsafe {
            assert!(device.clear(COLOR_BUFFER_BIT).is_err());
            assert!(device.clear(COLOR_BUFFER_BIT).is_ok());
        }

        assert_eq!(probe.call_count("clear"), 2);
    }

    #[test]
    fn clear_and_read_window() {
        let mut device = HeadlessDevice::with_window_size(IntSize::new(4, 4));
        let mut out = [0u8; 4];
        unsafe {
            device.clear_color([1.0, 0.0, 0.0, 1.0]).unwrap();
            device.clear(COLOR_BUFFER_BIT).unwrap();
            device.read_pixels(Viewport::new(3, 3, 1, 1), &mut out).unwrap();
        }

        assert_eq!(out, [255, 0, 0, 255]);
    }

    #[test]
    fn rasterize_triangle_from_client_memory() {
        let mut device = HeadlessDevice::with_window_size(IntSize::new(8, 8));
        let probe = device.probe();

        // Covers the lower-left half of the window in clip space.
        let vertices: [f32; 6] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0];
        let layout = ArrayPointer {
            buffer: 0,
            size: 2,
            ty: FLOAT,
            stride: 0,
            offset: vertices.as_ptr() as usize,
        };

        unsafe {
            device.set_client_capability(VERTEX_ARRAY, true).unwrap();
            device.array_pointer(VERTEX_ARRAY, layout).unwrap();
            device.color_4ub(Color4B::new(0, 0, 7, 255)).unwrap();
            device.draw_arrays(TRIANGLES, 0, 3).unwrap();
        }

        let window = probe.window();
        assert_eq!(window.pixel(0, 0), Some(Color4B::new(0, 0, 7, 255)));
        assert_eq!(window.pixel(7, 7), Some(Color4B::new(0, 0, 0, 0)));
        assert_eq!(probe.draws().len(), 1);
    }

    #[test]
    fn framebuffer_completeness() {
        let mut device = HeadlessDevice::new();
        unsafe {
            let fb = device.gen_framebuffer().unwrap();
            device.bind_framebuffer(FRAMEBUFFER, fb).unwrap();
            assert_eq!(
                device.check_framebuffer_status().unwrap(),
                FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
            );

            let color = device.gen_renderbuffer().unwrap();
            device.bind_renderbuffer(color).unwrap();
            device
                .renderbuffer_storage(RGBA8, 0, IntSize::new(16, 16))
                .unwrap();
            device
                .framebuffer_renderbuffer(COLOR_ATTACHMENT0, color)
                .unwrap();
            assert_eq!(device.check_framebuffer_status().unwrap(), FRAMEBUFFER_COMPLETE);

            let depth = device.gen_renderbuffer().unwrap();
            device.bind_renderbuffer(depth).unwrap();
            device
                .renderbuffer_storage(DEPTH_COMPONENT16, 0, IntSize::new(8, 8))
                .unwrap();
            device.framebuffer_renderbuffer(DEPTH_ATTACHMENT, depth).unwrap();
            assert_eq!(
                device.check_framebuffer_status().unwrap(),
                FRAMEBUFFER_INCOMPLETE_DIMENSIONS
            );
        }
    }
}
