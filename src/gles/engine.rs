use super::consts::*;
use super::groups::*;
use super::headless::{HeadlessDevice, HeadlessProbe};
use super::release::{self, ContextId, GLObject};
use super::tracker::{get_uint, OriginalValuePolicy, StateTracker};
use super::{ArrayPointer, Device, EngineParams, Pipeline};
use crate::errors::*;
use crate::math::prelude::{Color4F, IntSize, Matrix4, Vector3, Vector4, Viewport};

/// The root of the state trackers, and the only way the rest of the crate talks to GL.
///
/// State setters are filtered through trackers and never fail; errors are logged and
/// the offending tracker forgets its value. Object creation and uploads return
/// `Result` so their owners can stay in an unloaded state.
pub struct GLEngine {
    params: EngineParams,
    device: Box<dyn Device>,
    context: ContextId,
    is_open: bool,
    frames: u64,

    capabilities: Capabilities,
    state: GLState,
    textures: TextureUnits,
    arrays: VertexArrays,
    lighting: Lighting,
    fog: Fog,
    hints: Hints,
    material: MaterialState,
    matrices: Matrices,
    limits: PlatformLimits,
}

impl GLEngine {
    pub fn new(device: Box<dyn Device>, params: EngineParams) -> Self {
        let restore = if params.restore_overlay_state {
            OriginalValuePolicy::ReadOnceAndRestore
        } else {
            OriginalValuePolicy::Ignore
        };

        let fixed = params.pipeline == Pipeline::FixedFunction;
        GLEngine {
            device,
            context: ContextId::next(),
            is_open: false,
            frames: 0,
            capabilities: Capabilities::new(params.pipeline, restore),
            state: GLState::new(restore, fixed),
            textures: TextureUnits::new(restore),
            arrays: VertexArrays::new(fixed),
            lighting: Lighting::default(),
            fog: Fog::default(),
            hints: Hints::default(),
            material: MaterialState::default(),
            matrices: Matrices::default(),
            limits: PlatformLimits::new(params.pipeline, params.max_texture_units_hint),
            params,
        }
    }

    /// Creates an engine over a `HeadlessDevice`, and returns the probe of the device.
    pub fn headless(params: EngineParams) -> (Self, HeadlessProbe) {
        GLEngine::headless_with_window(params, IntSize::new(64, 64))
    }

    pub fn headless_with_window(params: EngineParams, size: IntSize) -> (Self, HeadlessProbe) {
        let device = HeadlessDevice::with_window_size(size);
        let probe = device.probe();
        (GLEngine::new(Box::new(device), params), probe)
    }

    #[inline]
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Identifies the GL context of this engine. Objects it creates are released back to
    /// it, and to no other engine.
    #[inline]
    pub fn context(&self) -> ContextId {
        self.context
    }

    #[inline]
    pub fn pipeline(&self) -> Pipeline {
        self.params.pipeline
    }

    #[inline]
    pub fn is_fixed_function(&self) -> bool {
        self.params.pipeline == Pipeline::FixedFunction
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Returns the number of frames opened so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Starts a frame. Trackers that need their original values read them now.
    pub fn open(&mut self) {
        if self.is_open {
            warn!("GLEngine is already open.");
            return;
        }

        self.purge_released();

        let device = &mut *self.device;
        self.capabilities.open(device);
        self.state.open(device);
        self.textures.open(device);

        self.is_open = true;
        self.frames += 1;
        trace!("Opens GL frame {}.", self.frames);
    }

    /// Ends a frame. Dirty trackers whose policy asks for it get their originals back.
    pub fn close(&mut self) {
        if !self.is_open {
            warn!("GLEngine is not open.");
            return;
        }

        self.purge_released();

        let device = &mut *self.device;
        self.capabilities.close(device);
        self.state.close(device);
        self.arrays.close(device);
        self.lighting.close(device);
        self.fog.close(device);
        self.hints.close(device);
        self.material.close(device);
        self.matrices.close(device);
        self.textures.close(device);

        self.is_open = false;
        trace!("Closes GL frame {}.", self.frames);
    }

    /// Deletes the GL objects of this engine whose owners have been dropped.
    pub fn purge_released(&mut self) {
        for v in release::drain(self.context) {
            match v {
                GLObject::Buffer(id) => self.delete_buffer(id),
                GLObject::Texture(id) => self.delete_texture(id),
                GLObject::Framebuffer(id) => self.delete_framebuffer(id),
                GLObject::Renderbuffer(id) => self.delete_renderbuffer(id),
            }
        }
    }

    // Capabilities.

    pub fn enable(&mut self, cap: GLenum, enabled: bool) {
        self.capabilities
            .set(&mut *self.device, self.is_open, cap, enabled);
    }

    /// Returns the cached state of a capability, if known.
    pub fn is_enabled(&self, cap: GLenum) -> Option<bool> {
        self.capabilities.is_enabled(cap)
    }

    pub fn capability(&self, cap: GLenum) -> Option<&StateTracker<bool>> {
        self.capabilities.get(cap)
    }

    pub fn capability_mut(&mut self, cap: GLenum) -> Option<&mut StateTracker<bool>> {
        self.capabilities.get_mut(cap)
    }

    pub fn state(&self) -> &GLState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GLState {
        &mut self.state
    }

    // Raster state.

    pub fn set_blend_func(&mut self, src: GLenum, dst: GLenum) {
        self.state.blend_func.set(&mut *self.device, src, dst);
    }

    pub fn blend_func(&self) -> (GLenum, GLenum) {
        self.state.blend_func.value()
    }

    pub fn set_alpha_func(&mut self, func: GLenum, reference: f32) {
        if self.is_fixed_function() {
            self.state.alpha_func.set(&mut *self.device, func, reference);
        }
    }

    pub fn set_polygon_offset(&mut self, factor: f32, units: f32) {
        self.state.polygon_offset.set(&mut *self.device, factor, units);
    }

    pub fn set_clear_color(&mut self, color: Color4F) {
        self.state.clear_color.set(&mut *self.device, color);
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        self.state.clear_depth.set(&mut *self.device, depth);
    }

    pub fn set_clear_stencil(&mut self, stencil: GLint) {
        self.state.clear_stencil.set(&mut *self.device, stencil);
    }

    /// Sets the current color, which colors vertices when no color array is enabled.
    pub fn set_color(&mut self, color: Color4F) {
        self.state.color.set(&mut *self.device, color);
    }

    pub fn color(&self) -> Color4F {
        self.state.color.value()
    }

    pub fn set_color_mask(&mut self, mask: [bool; 4]) {
        self.state.color_mask.set(&mut *self.device, mask);
    }

    pub fn set_cull_face(&mut self, mode: GLenum) {
        self.state.cull_face.set(&mut *self.device, mode);
    }

    pub fn set_depth_func(&mut self, func: GLenum) {
        self.state.depth_func.set(&mut *self.device, func);
    }

    pub fn set_depth_mask(&mut self, enabled: bool) {
        self.state.depth_mask.set(&mut *self.device, enabled);
    }

    pub fn set_front_face(&mut self, mode: GLenum) {
        self.state.front_face.set(&mut *self.device, mode);
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.state.line_width.set(&mut *self.device, width);
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.state.point_size.set(&mut *self.device, size);
    }

    pub fn set_shade_model(&mut self, mode: GLenum) {
        if self.is_fixed_function() {
            self.state.shade_model.set(&mut *self.device, mode);
        }
    }

    pub fn set_scissor(&mut self, rect: Viewport) {
        self.state.scissor.set(&mut *self.device, rect);
    }

    pub fn set_viewport(&mut self, rect: Viewport) {
        self.state.viewport.set(&mut *self.device, rect);
    }

    pub fn viewport(&self) -> Viewport {
        self.state.viewport.value()
    }

    pub fn set_stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) {
        self.state
            .stencil_func
            .set(&mut *self.device, (func, reference, mask));
    }

    pub fn set_stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        self.state
            .stencil_op
            .set(&mut *self.device, (sfail, dpfail, dppass));
    }

    // Fog, hints, lighting and material.

    pub fn set_fog_mode(&mut self, mode: GLenum) {
        if self.is_fixed_function() {
            self.fog.mode.set(&mut *self.device, mode);
        }
    }

    pub fn set_fog_density(&mut self, density: f32) {
        if self.is_fixed_function() {
            self.fog.density.set(&mut *self.device, density);
        }
    }

    pub fn set_fog_range(&mut self, start: f32, end: f32) {
        if self.is_fixed_function() {
            self.fog.start.set(&mut *self.device, start);
            self.fog.end.set(&mut *self.device, end);
        }
    }

    pub fn set_fog_color(&mut self, color: Color4F) {
        if self.is_fixed_function() {
            self.fog.color.set(&mut *self.device, color);
        }
    }

    pub fn set_hint(&mut self, target: GLenum, mode: GLenum) {
        if !self.is_fixed_function() && target != GENERATE_MIPMAP_HINT {
            return;
        }

        match self.hints.get_mut(target) {
            Some(tracker) => {
                tracker.set(&mut *self.device, mode);
            }
            None => warn!("Unknown hint target {:#x}.", target),
        }
    }

    pub fn set_light_model_ambient(&mut self, color: Color4F) {
        if self.is_fixed_function() {
            self.lighting.model_ambient.set(&mut *self.device, color);
        }
    }

    pub fn set_light_two_side(&mut self, two_side: bool) {
        if self.is_fixed_function() {
            self.lighting.two_side.set(&mut *self.device, two_side);
        }
    }

    /// Returns the trackers of the light at `index`, or none if the index exceeds the
    /// platform limit or the pipeline has no fixed lights.
    pub fn light(&mut self, index: usize) -> Option<LightHandle> {
        if !self.is_fixed_function() {
            return None;
        }

        let max = self.limits.max_lights(&mut *self.device) as usize;
        if index >= max {
            info!("Light {} exceeds the platform limit of {} lights.", index, max);
            return None;
        }

        Some(LightHandle {
            device: &mut *self.device,
            light: self.lighting.light_mut(index),
        })
    }

    pub fn set_material_ambient(&mut self, color: Color4F) {
        if self.is_fixed_function() {
            self.material.ambient.set(&mut *self.device, color);
        }
    }

    pub fn set_material_diffuse(&mut self, color: Color4F) {
        if self.is_fixed_function() {
            self.material.diffuse.set(&mut *self.device, color);
        }
    }

    pub fn set_material_specular(&mut self, color: Color4F) {
        if self.is_fixed_function() {
            self.material.specular.set(&mut *self.device, color);
        }
    }

    pub fn set_material_emission(&mut self, color: Color4F) {
        if self.is_fixed_function() {
            self.material.emission.set(&mut *self.device, color);
        }
    }

    pub fn set_material_shininess(&mut self, shininess: f32) {
        if self.is_fixed_function() {
            self.material
                .shininess
                .set(&mut *self.device, shininess.max(0.0).min(128.0));
        }
    }

    pub fn material(&self) -> &MaterialState {
        &self.material
    }

    // Matrices.

    fn load_matrix(&mut self, mode: GLenum, m: &Matrix4<f32>) {
        self.matrices.mode.set(&mut *self.device, mode);
        if let Err(err) = unsafe { self.device.load_matrix(m.as_ref()) } {
            warn!("Failed to load matrix into {:#x}. {}", mode, err);
        }
    }

    pub fn load_modelview_matrix(&mut self, m: &Matrix4<f32>) {
        if self.is_fixed_function() {
            self.load_matrix(MODELVIEW, m);
        }
    }

    pub fn load_projection_matrix(&mut self, m: &Matrix4<f32>) {
        if self.is_fixed_function() {
            self.load_matrix(PROJECTION, m);
        }
    }

    /// Loads a matrix into the palette slot. Returns false if the slot exceeds the
    /// platform limit.
    pub fn load_palette_matrix(&mut self, index: u32, m: &Matrix4<f32>) -> bool {
        let max = self.limits.max_palette_matrices(&mut *self.device);
        if index >= max {
            info!("Palette matrix {} exceeds the platform limit of {}.", index, max);
            return false;
        }

        self.matrices.mode.set(&mut *self.device, MATRIX_PALETTE_OES);
        self.matrices.palette_index.set(&mut *self.device, index);
        if let Err(err) = unsafe { self.device.load_matrix(m.as_ref()) } {
            warn!("Failed to load palette matrix {}. {}", index, err);
            return false;
        }

        true
    }

    // Texture units.

    pub fn texture_units(&self) -> &TextureUnits {
        &self.textures
    }

    pub fn activate_texture_unit(&mut self, unit: usize) {
        self.textures.activate(&mut *self.device, unit);
    }

    pub fn active_texture_unit(&self) -> usize {
        (self.textures.active.value() - TEXTURE0) as usize
    }

    /// Binds a texture to `TEXTURE_2D` or `TEXTURE_CUBE_MAP` of the unit.
    pub fn bind_texture(&mut self, unit: usize, target: GLenum, id: GLuint) {
        let device = &mut *self.device;
        let state = self.textures.activate(device, unit);
        if target == TEXTURE_CUBE_MAP {
            state.binding_cube.set(device, id);
        } else {
            state.binding_2d.set(device, id);
        }
    }

    /// Returns the cached binding of the unit, if known.
    pub fn texture_binding(&self, unit: usize, target: GLenum) -> Option<GLuint> {
        let state = self.textures.get(unit)?;
        let tracker = if target == TEXTURE_CUBE_MAP {
            &state.binding_cube
        } else {
            &state.binding_2d
        };

        if tracker.is_value_known() {
            Some(tracker.value())
        } else {
            None
        }
    }

    /// Enables or disables texturing of the unit. Only meaningful for the
    /// fixed-function pipeline.
    pub fn enable_texturing(&mut self, unit: usize, target: GLenum, enabled: bool) {
        if !self.is_fixed_function() {
            return;
        }

        let device = &mut *self.device;
        let state = self.textures.activate(device, unit);
        if target == TEXTURE_CUBE_MAP {
            state.texture_cube.set(device, enabled);
        } else {
            state.texture_2d.set(device, enabled);
        }
    }

    pub fn set_texture_env_mode(&mut self, unit: usize, mode: GLenum) {
        if !self.is_fixed_function() {
            return;
        }

        let device = &mut *self.device;
        self.textures.activate(device, unit).env_mode.set(device, mode);
    }

    pub fn set_texture_env_color(&mut self, unit: usize, color: Color4F) {
        if !self.is_fixed_function() {
            return;
        }

        let device = &mut *self.device;
        self.textures.activate(device, unit).env_color.set(device, color);
    }

    /// Sets the `COMBINE` function of the unit with its two RGB sources.
    pub fn set_texture_combine(&mut self, unit: usize, func: GLenum, src0: GLenum, src1: GLenum) {
        if !self.is_fixed_function() {
            return;
        }

        let device = &mut *self.device;
        let state = self.textures.activate(device, unit);
        state.env_mode.set(device, COMBINE);
        state.combine_rgb.set(device, func);
        state.src0_rgb.set(device, src0);
        state.src1_rgb.set(device, src1);
    }

    pub fn enable_texcoord_array(&mut self, unit: usize, enabled: bool) {
        let device = &mut *self.device;
        let state = self.textures.activate_client(device, unit);
        state.texcoord_array.set(device, enabled);
    }

    pub fn set_texcoord_pointer(&mut self, unit: usize, layout: ArrayPointer) {
        let device = &mut *self.device;
        let state = self.textures.activate_client(device, unit);
        state.texcoord_pointer.set(device, layout);
    }

    // Buffers and client arrays.

    pub fn bind_buffer(&mut self, target: GLenum, id: GLuint) {
        self.arrays.binding_mut(target).set(&mut *self.device, id);
    }

    pub fn enable_client_array(&mut self, array: GLenum, enabled: bool) {
        let device = &mut *self.device;
        match self.arrays.get_mut(array) {
            Some(v) => {
                v.enabled.set(device, enabled);
            }
            None => trace!("Skips client array {:#x}.", array),
        }
    }

    pub fn set_array_pointer(&mut self, array: GLenum, layout: ArrayPointer) {
        let device = &mut *self.device;
        match self.arrays.get_mut(array) {
            Some(v) => {
                v.pointer.set(device, layout);
            }
            None => trace!("Skips client array {:#x}.", array),
        }
    }

    /// Creates a buffer and fills it with `data`. The buffer stays bound to `target`.
    pub fn create_buffer(&mut self, target: GLenum, data: &[u8], usage: GLenum) -> Result<GLuint> {
        let id = unsafe { self.device.gen_buffer()? };
        self.bind_buffer(target, id);

        if let Err(err) = unsafe { self.device.buffer_data(target, data, usage) } {
            self.delete_buffer(id);
            return Err(err);
        }

        debug!("Creates buffer {} with {} bytes.", id, data.len());
        Ok(id)
    }

    pub fn update_buffer(
        &mut self,
        target: GLenum,
        id: GLuint,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        self.bind_buffer(target, id);
        unsafe { self.device.buffer_sub_data(target, offset, data) }
    }

    /// Replaces the whole content of the buffer, resizing it if needed.
    pub fn reset_buffer(&mut self, target: GLenum, id: GLuint, data: &[u8], usage: GLenum) -> Result<()> {
        self.bind_buffer(target, id);
        unsafe { self.device.buffer_data(target, data, usage) }
    }

    pub fn delete_buffer(&mut self, id: GLuint) {
        if id == 0 {
            return;
        }

        if let Err(err) = unsafe { self.device.delete_buffer(id) } {
            warn!("Failed to delete buffer {}. {}", id, err);
        }

        self.arrays.unbind(id);
    }

    // Textures.

    pub fn create_texture(&mut self) -> Result<GLuint> {
        unsafe { self.device.gen_texture() }
    }

    pub fn delete_texture(&mut self, id: GLuint) {
        if id == 0 {
            return;
        }

        if let Err(err) = unsafe { self.device.delete_texture(id) } {
            warn!("Failed to delete texture {}. {}", id, err);
        }

        self.textures.unbind(id);
    }

    /// Uploads a level of a texture image. `face` is `TEXTURE_2D` or one of the cube
    /// faces. The texture is bound to the active unit on return.
    pub fn upload_texture_image(
        &mut self,
        id: GLuint,
        face: GLenum,
        level: GLint,
        format: GLenum,
        size: IntSize,
        pixels: Option<&[u8]>,
    ) -> Result<()> {
        let target = binding_target(face);
        let unit = self.active_texture_unit();
        self.bind_texture(unit, target, id);

        unsafe {
            self.device.pixel_store_i(UNPACK_ALIGNMENT, 1)?;
            self.device
                .tex_image_2d(face, level, format, UNSIGNED_BYTE, size, pixels)
        }
    }

    pub fn update_texture_image(
        &mut self,
        id: GLuint,
        face: GLenum,
        level: GLint,
        rect: Viewport,
        format: GLenum,
        pixels: &[u8],
    ) -> Result<()> {
        let target = binding_target(face);
        let unit = self.active_texture_unit();
        self.bind_texture(unit, target, id);

        unsafe {
            self.device.pixel_store_i(UNPACK_ALIGNMENT, 1)?;
            self.device
                .tex_sub_image_2d(face, level, rect, format, UNSIGNED_BYTE, pixels)
        }
    }

    pub fn set_texture_parameter(&mut self, id: GLuint, target: GLenum, name: GLenum, v: GLint) -> Result<()> {
        let unit = self.active_texture_unit();
        self.bind_texture(unit, target, id);
        unsafe { self.device.tex_parameter_i(target, name, v) }
    }

    pub fn generate_mipmap(&mut self, id: GLuint, target: GLenum) -> Result<()> {
        let unit = self.active_texture_unit();
        self.bind_texture(unit, target, id);
        unsafe { self.device.generate_mipmap(target) }
    }

    // Framebuffers and renderbuffers.

    pub fn create_framebuffer(&mut self) -> Result<GLuint> {
        unsafe { self.device.gen_framebuffer() }
    }

    pub fn delete_framebuffer(&mut self, id: GLuint) {
        if id == 0 {
            return;
        }

        if let Err(err) = unsafe { self.device.delete_framebuffer(id) } {
            warn!("Failed to delete framebuffer {}. {}", id, err);
        }

        if self.state.framebuffer.value() == id {
            self.state.framebuffer.record(0);
        }
    }

    pub fn bind_framebuffer(&mut self, id: GLuint) {
        self.state.framebuffer.set(&mut *self.device, id);
    }

    /// Returns the cached framebuffer binding, reading it from GL if unknown.
    pub fn framebuffer_binding(&mut self) -> GLuint {
        if !self.state.framebuffer.is_value_known() {
            let param = self.state.framebuffer.param();
            match unsafe { get_uint(&mut *self.device, param) } {
                Ok(v) => {
                    self.state.framebuffer.record(v);
                }
                Err(err) => warn!("Failed to read framebuffer binding. {}", err),
            }
        }

        self.state.framebuffer.value()
    }

    pub fn create_renderbuffer(&mut self) -> Result<GLuint> {
        unsafe { self.device.gen_renderbuffer() }
    }

    pub fn delete_renderbuffer(&mut self, id: GLuint) {
        if id == 0 {
            return;
        }

        if let Err(err) = unsafe { self.device.delete_renderbuffer(id) } {
            warn!("Failed to delete renderbuffer {}. {}", id, err);
        }

        if self.state.renderbuffer.value() == id {
            self.state.renderbuffer.record(0);
        }
    }

    pub fn bind_renderbuffer(&mut self, id: GLuint) {
        self.state.renderbuffer.set(&mut *self.device, id);
    }

    /// Allocates storage of the renderbuffer.
    pub fn renderbuffer_storage(
        &mut self,
        id: GLuint,
        format: GLenum,
        samples: u32,
        size: IntSize,
    ) -> Result<()> {
        self.bind_renderbuffer(id);
        unsafe { self.device.renderbuffer_storage(format, samples, size) }
    }

    /// Reads the size and format of the renderbuffer, as allocated by someone else.
    pub fn renderbuffer_info(&mut self, id: GLuint) -> Result<(IntSize, GLenum)> {
        self.bind_renderbuffer(id);
        unsafe {
            let w = self.device.get_renderbuffer_parameter(RENDERBUFFER_WIDTH)?;
            let h = self.device.get_renderbuffer_parameter(RENDERBUFFER_HEIGHT)?;
            let f = self
                .device
                .get_renderbuffer_parameter(RENDERBUFFER_INTERNAL_FORMAT)?;
            Ok((IntSize::new(w, h), f as GLenum))
        }
    }

    /// Attaches a renderbuffer to the framebuffer. Zero detaches.
    pub fn attach_renderbuffer(
        &mut self,
        framebuffer: GLuint,
        attachment: GLenum,
        id: GLuint,
    ) -> Result<()> {
        self.bind_framebuffer(framebuffer);
        unsafe { self.device.framebuffer_renderbuffer(attachment, id) }
    }

    /// Attaches a face and mipmap level of a texture to the framebuffer. Zero detaches.
    pub fn attach_texture(
        &mut self,
        framebuffer: GLuint,
        attachment: GLenum,
        face: GLenum,
        id: GLuint,
        level: GLint,
    ) -> Result<()> {
        self.bind_framebuffer(framebuffer);
        unsafe { self.device.framebuffer_texture_2d(attachment, face, id, level) }
    }

    /// Checks the completeness of the framebuffer. Incomplete states are logged.
    pub fn check_framebuffer(&mut self, framebuffer: GLuint) -> bool {
        self.bind_framebuffer(framebuffer);
        match unsafe { self.device.check_framebuffer_status() } {
            Ok(FRAMEBUFFER_COMPLETE) => true,
            Ok(status) => {
                error!(
                    "Framebuffer {} is incomplete. {}",
                    framebuffer,
                    framebuffer_status_str(status)
                );
                false
            }
            Err(err) => {
                error!("Failed to check framebuffer {}. {}", framebuffer, err);
                false
            }
        }
    }

    pub fn blit_framebuffer(&mut self, from: GLuint, to: GLuint, size: IntSize) -> Result<()> {
        unsafe { self.device.blit_framebuffer(from, to, size) }
    }

    pub fn discard_framebuffer(&mut self, framebuffer: GLuint, attachments: &[GLenum]) {
        if attachments.is_empty() {
            return;
        }

        self.bind_framebuffer(framebuffer);
        if let Err(err) = unsafe { self.device.discard_framebuffer(attachments) } {
            warn!("Failed to discard attachments of {}. {}", framebuffer, err);
        }
    }

    pub fn clear(&mut self, mask: GLbitfield) {
        if let Err(err) = unsafe { self.device.clear(mask) } {
            warn!("Failed to clear buffers {:#x}. {}", mask, err);
        }
    }

    /// Reads RGBA pixels of the bound framebuffer.
    pub fn read_pixels(&mut self, rect: Viewport, out: &mut [u8]) -> Result<()> {
        unsafe {
            self.device.pixel_store_i(PACK_ALIGNMENT, 1)?;
            self.device.read_pixels(rect, out)
        }
    }

    // Draws.

    pub fn draw_arrays(&mut self, mode: GLenum, first: usize, count: usize) {
        if count == 0 {
            return;
        }

        if let Err(err) = unsafe {
            self.device
                .draw_arrays(mode, first as GLint, count as GLsizei)
        } {
            warn!("Failed to draw {} vertices. {}", count, err);
        }
    }

    /// Draws indexed vertices. `offset` is a byte offset into the bound element buffer,
    /// or the address of client memory.
    pub fn draw_elements(&mut self, mode: GLenum, count: usize, ty: GLenum, offset: usize) {
        if count == 0 {
            return;
        }

        if let Err(err) = unsafe {
            self.device
                .draw_elements(mode, count as GLsizei, ty, offset)
        } {
            warn!("Failed to draw {} indices. {}", count, err);
        }
    }

    pub fn uniform_matrices(&mut self, location: GLint, values: &[f32]) {
        if let Err(err) = unsafe { self.device.uniform_matrix4fv(location, values) } {
            warn!("Failed to upload matrices to {}. {}", location, err);
        }
    }

    pub fn uniform_vectors(&mut self, location: GLint, values: &[f32]) {
        if let Err(err) = unsafe { self.device.uniform4fv(location, values) } {
            warn!("Failed to upload vectors to {}. {}", location, err);
        }
    }

    pub fn finish(&mut self) {
        if let Err(err) = unsafe { self.device.finish() } {
            warn!("Failed to finish. {}", err);
        }
    }

    // Platform limits.

    pub fn max_lights(&mut self) -> u32 {
        self.limits.max_lights(&mut *self.device)
    }

    pub fn max_clip_planes(&mut self) -> u32 {
        self.limits.max_clip_planes(&mut *self.device)
    }

    pub fn max_palette_matrices(&mut self) -> u32 {
        self.limits.max_palette_matrices(&mut *self.device)
    }

    pub fn max_texture_units(&mut self) -> u32 {
        self.limits.max_texture_units(&mut *self.device)
    }

    pub fn max_vertex_units(&mut self) -> u32 {
        self.limits.max_vertex_units(&mut *self.device)
    }

    pub fn max_samples(&mut self) -> u32 {
        self.limits.max_samples(&mut *self.device)
    }

    pub fn max_texture_size(&mut self) -> u32 {
        self.limits.max_texture_size(&mut *self.device)
    }
}

impl Drop for GLEngine {
    fn drop(&mut self) {
        if self.is_open {
            self.close();
        }
    }
}

/// The cube faces bind through `TEXTURE_CUBE_MAP`.
pub fn binding_target(face: GLenum) -> GLenum {
    if face >= TEXTURE_CUBE_MAP_POSITIVE_X && face <= TEXTURE_CUBE_MAP_NEGATIVE_Z {
        TEXTURE_CUBE_MAP
    } else {
        face
    }
}

/// Borrows the trackers of one light.
pub struct LightHandle<'a> {
    device: &'a mut dyn Device,
    light: &'a mut LightState,
}

impl<'a> LightHandle<'a> {
    pub fn set_ambient(&mut self, color: Color4F) -> &mut Self {
        self.light.ambient.set(self.device, color);
        self
    }

    pub fn set_diffuse(&mut self, color: Color4F) -> &mut Self {
        self.light.diffuse.set(self.device, color);
        self
    }

    pub fn set_specular(&mut self, color: Color4F) -> &mut Self {
        self.light.specular.set(self.device, color);
        self
    }

    /// Sets the homogeneous position; `w == 0` makes a directional light.
    pub fn set_position(&mut self, position: Vector4<f32>) -> &mut Self {
        self.light.position.set(self.device, position);
        self
    }

    pub fn set_spot(&mut self, direction: Vector3<f32>, exponent: f32, cutoff: f32) -> &mut Self {
        self.light.spot_direction.set(self.device, direction);
        self.light.spot_exponent.set(self.device, exponent);
        self.light.spot_cutoff.set(self.device, cutoff);
        self
    }

    pub fn set_attenuation(&mut self, constant: f32, linear: f32, quadratic: f32) -> &mut Self {
        self.light.constant_attenuation.set(self.device, constant);
        self.light.linear_attenuation.set(self.device, linear);
        self.light.quadratic_attenuation.set(self.device, quadratic);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn restores_overlay_state() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        probe.set_capability(DEPTH_TEST, true);

        engine.open();
        engine.enable(DEPTH_TEST, false);
        engine.enable(BLEND, true);
        engine.set_viewport(Viewport::new(0, 0, 16, 16));
        engine.set_color(Color4F::new(1.0, 0.0, 0.0, 1.0));
        engine.bind_texture(1, TEXTURE_2D, 7);
        engine.bind_texture(0, TEXTURE_2D, 5);
        engine.activate_texture_unit(1);
        engine.close();

        assert!(probe.is_enabled(DEPTH_TEST));
        assert!(!probe.is_enabled(BLEND));
        assert_eq!(probe.viewport(), Viewport::new(0, 0, 64, 64));
        assert_eq!(probe.current_color(), Color4F::white());
        assert_eq!(probe.texture_binding(TEXTURE0, TEXTURE_2D), 0);
        assert_eq!(probe.active_texture(), TEXTURE0);

        // Units other than the first keep their bindings.
        assert_eq!(probe.texture_binding(TEXTURE0 + 1, TEXTURE_2D), 7);
    }

    #[test]
    fn ignores_overlay_state_when_disarmed() {
        let mut params = EngineParams::default();
        params.restore_overlay_state = false;
        let (mut engine, probe) = GLEngine::headless(params);

        engine.open();
        engine.enable(BLEND, true);
        engine.close();
        assert!(probe.is_enabled(BLEND));
        assert_eq!(probe.call_count("is_enabled"), 0);
    }

    #[test]
    fn redundant_state_is_filtered() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        engine.open();
        probe.reset_call_counts();

        for _ in 0..10 {
            engine.set_blend_func(SRC_ALPHA, ONE_MINUS_SRC_ALPHA);
            engine.enable(BLEND, true);
            engine.set_depth_mask(false);
        }

        assert_eq!(probe.call_count("blend_func"), 1);
        assert_eq!(probe.call_count("set_capability"), 1);
        assert_eq!(probe.call_count("depth_mask"), 1);
    }

    #[test]
    fn deleted_textures_are_unbound() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let id = engine.create_texture().unwrap();
        engine.bind_texture(0, TEXTURE_2D, id);
        assert_eq!(engine.texture_binding(0, TEXTURE_2D), Some(id));

        release::release(engine.context(), GLObject::Texture(id));
        engine.open();
        assert_eq!(engine.texture_binding(0, TEXTURE_2D), Some(0));
        assert!(probe.texture(id).is_none());

        // Binding a new texture with a recycled id reaches GL again.
        engine.bind_texture(0, TEXTURE_2D, id);
        assert_eq!(probe.texture_binding(TEXTURE0, TEXTURE_2D), id);
        engine.close();
    }

    #[test]
    fn palette_limit() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let m = Matrix4::from_scale(2.0);
        assert!(engine.load_palette_matrix(3, &m));
        assert!(!engine.load_palette_matrix(11, &m));
        assert_eq!(probe.palette_matrix(3), Some(m));
        assert_eq!(probe.palette_matrix(11), None);
    }

    #[test]
    fn lights_are_bounded() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        engine
            .light(2)
            .unwrap()
            .set_diffuse(Color4F::new(0.5, 0.5, 0.5, 1.0));
        assert_eq!(probe.light(LIGHT0 + 2, DIFFUSE), [0.5, 0.5, 0.5, 1.0]);
        assert!(engine.light(8).is_none());
    }
}
