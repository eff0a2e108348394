use super::super::consts::*;
use super::super::tracker::*;
use super::super::{ArrayPointer, Device};
use crate::errors::*;
use crate::math::prelude::Color4F;

unsafe fn set_active_texture(device: &mut dyn Device, _: GLParam, v: GLenum) -> Result<()> {
    device.active_texture(v)
}

unsafe fn set_client_active_texture(device: &mut dyn Device, _: GLParam, v: GLenum) -> Result<()> {
    device.client_active_texture(v)
}

unsafe fn set_binding(device: &mut dyn Device, p: GLParam, v: GLuint) -> Result<()> {
    device.bind_texture(p.target, v)
}

unsafe fn set_tex_env(device: &mut dyn Device, p: GLParam, v: GLenum) -> Result<()> {
    device.tex_env_i(p.name, v as GLint)
}

unsafe fn set_tex_env_color(device: &mut dyn Device, p: GLParam, v: Color4F) -> Result<()> {
    device.tex_env_fv(p.name, v.rgba())
}

unsafe fn set_texcoord_pointer(device: &mut dyn Device, _: GLParam, v: ArrayPointer) -> Result<()> {
    device.array_pointer(TEXTURE_COORD_ARRAY, v)
}

/// The state of one texture unit. Every setting here applies to the active unit (or
/// the client active unit for coordinate arrays), so `TextureUnits` activates the
/// unit before touching these trackers.
pub struct TextureUnitState {
    pub index: usize,
    pub texture_2d: StateTracker<bool>,
    pub texture_cube: StateTracker<bool>,
    pub binding_2d: StateTracker<GLuint>,
    pub binding_cube: StateTracker<GLuint>,
    pub env_mode: StateTracker<GLenum>,
    pub env_color: StateTracker<Color4F>,
    pub combine_rgb: StateTracker<GLenum>,
    pub src0_rgb: StateTracker<GLenum>,
    pub src1_rgb: StateTracker<GLenum>,
    pub texcoord_array: StateTracker<bool>,
    pub texcoord_pointer: StateTracker<ArrayPointer>,
}

impl TextureUnitState {
    pub fn new(index: usize, binding_policy: OriginalValuePolicy) -> Self {
        let env = |label, name, initial| {
            StateTracker::new(
                label,
                GLParam::with_target(TEXTURE_ENV, name),
                initial,
                Some(set_tex_env),
                None,
            )
        };

        TextureUnitState {
            index,
            texture_2d: StateTracker::new(
                "TEXTURE_2D",
                GLParam::new(TEXTURE_2D),
                false,
                Some(set_capability),
                Some(get_capability),
            ),
            texture_cube: StateTracker::new(
                "TEXTURE_CUBE_MAP",
                GLParam::new(TEXTURE_CUBE_MAP),
                false,
                Some(set_capability),
                Some(get_capability),
            ),
            binding_2d: StateTracker::new(
                "TEXTURE_BINDING_2D",
                GLParam::with_target(TEXTURE_2D, TEXTURE_BINDING_2D),
                0,
                Some(set_binding),
                Some(get_uint),
            )
            .with_policy(binding_policy),
            binding_cube: StateTracker::new(
                "TEXTURE_BINDING_CUBE_MAP",
                GLParam::with_target(TEXTURE_CUBE_MAP, TEXTURE_BINDING_CUBE_MAP),
                0,
                Some(set_binding),
                Some(get_uint),
            ),
            env_mode: env("TEXTURE_ENV_MODE", TEXTURE_ENV_MODE, MODULATE),
            env_color: StateTracker::new(
                "TEXTURE_ENV_COLOR",
                GLParam::with_target(TEXTURE_ENV, TEXTURE_ENV_COLOR),
                Color4F::transparent(),
                Some(set_tex_env_color),
                None,
            ),
            combine_rgb: env("COMBINE_RGB", COMBINE_RGB, MODULATE),
            src0_rgb: env("SRC0_RGB", SRC0_RGB, TEXTURE),
            src1_rgb: env("SRC1_RGB", SRC1_RGB, PREVIOUS),
            texcoord_array: StateTracker::new(
                "TEXTURE_COORD_ARRAY",
                GLParam::new(TEXTURE_COORD_ARRAY),
                false,
                Some(set_client_capability),
                None,
            ),
            texcoord_pointer: StateTracker::new(
                "TEXTURE_COORD_ARRAY_POINTER",
                GLParam::new(TEXTURE_COORD_ARRAY),
                ArrayPointer::default(),
                Some(set_texcoord_pointer),
                None,
            ),
        }
    }

    #[inline]
    pub fn unit(&self) -> GLenum {
        TEXTURE0 + self.index as GLenum
    }

    fn needs_read(&self) -> bool {
        self.binding_2d
            .policy()
            .should_read(self.binding_2d.is_original_known())
    }

    fn needs_restore(&self) -> bool {
        self.binding_2d.needs_restore()
    }

    /// Forgets cached bindings of the texture, after it has been deleted.
    pub fn unbind(&mut self, id: GLuint) {
        if self.binding_2d.value() == id {
            self.binding_2d.record(0);
        }

        if self.binding_cube.value() == id {
            self.binding_cube.record(0);
        }
    }

    fn open(&mut self, device: &mut dyn Device) {
        self.binding_2d.open(device);
    }

    fn close(&mut self, device: &mut dyn Device) {
        self.texture_2d.close(device);
        self.texture_cube.close(device);
        self.binding_2d.close(device);
        self.binding_cube.close(device);
        self.env_mode.close(device);
        self.env_color.close(device);
        self.combine_rgb.close(device);
        self.src0_rgb.close(device);
        self.src1_rgb.close(device);
        self.texcoord_array.close(device);
        self.texcoord_pointer.close(device);
    }
}

/// The texture units, plus the active and client active unit selectors.
pub struct TextureUnits {
    pub active: StateTracker<GLenum>,
    pub client_active: StateTracker<GLenum>,
    units: Vec<TextureUnitState>,
    restore: OriginalValuePolicy,
}

impl TextureUnits {
    pub fn new(restore: OriginalValuePolicy) -> Self {
        TextureUnits {
            active: StateTracker::new(
                "ACTIVE_TEXTURE",
                GLParam::new(ACTIVE_TEXTURE),
                TEXTURE0,
                Some(set_active_texture),
                Some(get_enum),
            )
            .with_policy(restore),
            client_active: StateTracker::new(
                "CLIENT_ACTIVE_TEXTURE",
                GLParam::new(CLIENT_ACTIVE_TEXTURE),
                TEXTURE0,
                Some(set_client_active_texture),
                Some(get_enum),
            ),
            units: vec![TextureUnitState::new(0, restore)],
            restore,
        }
    }

    /// Returns the number of units created so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn get(&self, index: usize) -> Option<&TextureUnitState> {
        self.units.get(index)
    }

    /// Makes the unit active for server side state, and returns its trackers.
    pub fn activate(&mut self, device: &mut dyn Device, index: usize) -> &mut TextureUnitState {
        self.ensure(index);
        self.active.set(device, TEXTURE0 + index as GLenum);
        &mut self.units[index]
    }

    /// Makes the unit active for client side arrays, and returns its trackers.
    pub fn activate_client(
        &mut self,
        device: &mut dyn Device,
        index: usize,
    ) -> &mut TextureUnitState {
        self.ensure(index);
        self.client_active.set(device, TEXTURE0 + index as GLenum);
        &mut self.units[index]
    }

    fn ensure(&mut self, index: usize) {
        while self.units.len() <= index {
            let i = self.units.len();
            self.units.push(TextureUnitState::new(i, OriginalValuePolicy::Ignore));
        }
    }

    pub fn unbind(&mut self, id: GLuint) {
        for v in &mut self.units {
            v.unbind(id);
        }
    }

    pub fn open(&mut self, device: &mut dyn Device) {
        self.active.open(device);
        self.client_active.open(device);

        for i in 0..self.units.len() {
            if self.units[i].needs_read() {
                self.active.set(device, TEXTURE0 + i as GLenum);
                self.units[i].open(device);
            }
        }
    }

    pub fn close(&mut self, device: &mut dyn Device) {
        for i in 0..self.units.len() {
            if self.units[i].needs_restore() {
                self.active.set(device, TEXTURE0 + i as GLenum);
            }

            self.units[i].close(device);
        }

        self.client_active.close(device);
        self.active.close(device);
        trace!("Closes {} texture units ({:?}).", self.units.len(), self.restore);
    }
}
