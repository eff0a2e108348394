use super::super::consts::*;
use super::super::tracker::*;
use super::super::{Device, Pipeline};

/// Limits of the GL implementation, read once on first query.
///
/// With the programmable pipeline, lights, clip planes and palette matrices are shader
/// conventions rather than platform limits, so fixed values are answered instead.
pub struct PlatformLimits {
    pipeline: Pipeline,
    max_texture_units_hint: Option<u32>,
    max_lights: StateTracker<GLint>,
    max_clip_planes: StateTracker<GLint>,
    max_palette_matrices: StateTracker<GLint>,
    max_texture_units: StateTracker<GLint>,
    max_vertex_units: StateTracker<GLint>,
    max_samples: StateTracker<GLint>,
    max_texture_size: StateTracker<GLint>,
}

pub const PROGRAMMABLE_MAX_LIGHTS: GLint = 8;
pub const PROGRAMMABLE_MAX_CLIP_PLANES: GLint = 6;
pub const PROGRAMMABLE_MAX_PALETTE_MATRICES: GLint = 32;
pub const PROGRAMMABLE_MAX_VERTEX_UNITS: GLint = 4;

fn limit(label: &'static str, name: GLenum) -> StateTracker<GLint> {
    StateTracker::new(label, GLParam::new(name), 0, None, Some(get_int))
        .with_policy(OriginalValuePolicy::ReadOnce)
}

impl PlatformLimits {
    pub fn new(pipeline: Pipeline, max_texture_units_hint: Option<u32>) -> Self {
        let texture_units = match pipeline {
            Pipeline::FixedFunction => MAX_TEXTURE_UNITS,
            Pipeline::Programmable => MAX_TEXTURE_IMAGE_UNITS,
        };

        PlatformLimits {
            pipeline,
            max_texture_units_hint,
            max_lights: limit("MAX_LIGHTS", MAX_LIGHTS),
            max_clip_planes: limit("MAX_CLIP_PLANES", MAX_CLIP_PLANES),
            max_palette_matrices: limit("MAX_PALETTE_MATRICES_OES", MAX_PALETTE_MATRICES_OES),
            max_texture_units: limit("MAX_TEXTURE_UNITS", texture_units),
            max_vertex_units: limit("MAX_VERTEX_UNITS_OES", MAX_VERTEX_UNITS_OES),
            max_samples: limit("MAX_SAMPLES", MAX_SAMPLES),
            max_texture_size: limit("MAX_TEXTURE_SIZE", MAX_TEXTURE_SIZE),
        }
    }

    fn query(tracker: &mut StateTracker<GLint>, device: &mut dyn Device) -> u32 {
        tracker.open(device);
        tracker.value().max(0) as u32
    }

    pub fn max_lights(&mut self, device: &mut dyn Device) -> u32 {
        match self.pipeline {
            Pipeline::FixedFunction => Self::query(&mut self.max_lights, device),
            Pipeline::Programmable => PROGRAMMABLE_MAX_LIGHTS as u32,
        }
    }

    pub fn max_clip_planes(&mut self, device: &mut dyn Device) -> u32 {
        match self.pipeline {
            Pipeline::FixedFunction => Self::query(&mut self.max_clip_planes, device),
            Pipeline::Programmable => PROGRAMMABLE_MAX_CLIP_PLANES as u32,
        }
    }

    pub fn max_palette_matrices(&mut self, device: &mut dyn Device) -> u32 {
        match self.pipeline {
            Pipeline::FixedFunction => Self::query(&mut self.max_palette_matrices, device),
            Pipeline::Programmable => PROGRAMMABLE_MAX_PALETTE_MATRICES as u32,
        }
    }

    pub fn max_vertex_units(&mut self, device: &mut dyn Device) -> u32 {
        match self.pipeline {
            Pipeline::FixedFunction => Self::query(&mut self.max_vertex_units, device),
            Pipeline::Programmable => PROGRAMMABLE_MAX_VERTEX_UNITS as u32,
        }
    }

    /// The number of texture units, capped by `max_texture_units_hint`.
    pub fn max_texture_units(&mut self, device: &mut dyn Device) -> u32 {
        let v = Self::query(&mut self.max_texture_units, device);
        match self.max_texture_units_hint {
            Some(hint) => v.min(hint),
            None => v,
        }
    }

    pub fn max_samples(&mut self, device: &mut dyn Device) -> u32 {
        Self::query(&mut self.max_samples, device)
    }

    pub fn max_texture_size(&mut self, device: &mut dyn Device) -> u32 {
        Self::query(&mut self.max_texture_size, device)
    }
}

#[cfg(test)]
mod test {
    use super::super::super::headless::HeadlessDevice;
    use super::*;

    #[test]
    fn read_once() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();

        let mut limits = PlatformLimits::new(Pipeline::FixedFunction, Some(2));
        assert_eq!(limits.max_lights(&mut device), 8);
        assert_eq!(limits.max_lights(&mut device), 8);
        assert_eq!(limits.max_texture_units(&mut device), 2);
        assert_eq!(probe.call_count("get_integer_v"), 2);
    }
}
