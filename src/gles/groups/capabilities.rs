use super::super::consts::*;
use super::super::tracker::{get_capability, set_capability, GLParam, OriginalValuePolicy, StateTracker};
use super::super::{Device, Pipeline};
use crate::utils::hash::FastHashMap;

const COMMON: &[(GLenum, &str)] = &[
    (BLEND, "BLEND"),
    (CULL_FACE, "CULL_FACE"),
    (DEPTH_TEST, "DEPTH_TEST"),
    (DITHER, "DITHER"),
    (MULTISAMPLE, "MULTISAMPLE"),
    (POLYGON_OFFSET_FILL, "POLYGON_OFFSET_FILL"),
    (SAMPLE_ALPHA_TO_COVERAGE, "SAMPLE_ALPHA_TO_COVERAGE"),
    (SAMPLE_COVERAGE, "SAMPLE_COVERAGE"),
    (SCISSOR_TEST, "SCISSOR_TEST"),
    (STENCIL_TEST, "STENCIL_TEST"),
];

const FIXED_FUNCTION: &[(GLenum, &str)] = &[
    (ALPHA_TEST, "ALPHA_TEST"),
    (COLOR_LOGIC_OP, "COLOR_LOGIC_OP"),
    (COLOR_MATERIAL, "COLOR_MATERIAL"),
    (FOG, "FOG"),
    (LIGHTING, "LIGHTING"),
    (LINE_SMOOTH, "LINE_SMOOTH"),
    (MATRIX_PALETTE_OES, "MATRIX_PALETTE_OES"),
    (NORMALIZE, "NORMALIZE"),
    (POINT_SMOOTH, "POINT_SMOOTH"),
    (POINT_SPRITE_OES, "POINT_SPRITE_OES"),
    (RESCALE_NORMAL, "RESCALE_NORMAL"),
    (SAMPLE_ALPHA_TO_ONE, "SAMPLE_ALPHA_TO_ONE"),
];

/// Returns true if the capability only exists in the fixed-function pipeline.
pub fn is_fixed_function_only(cap: GLenum) -> bool {
    FIXED_FUNCTION.iter().any(|v| v.0 == cap)
        || (cap >= LIGHT0 && cap < LIGHT0 + 8)
        || (cap >= CLIP_PLANE0 && cap < CLIP_PLANE0 + 6)
}

fn label(cap: GLenum) -> &'static str {
    if cap >= LIGHT0 && cap < LIGHT0 + 8 {
        return "LIGHT";
    }

    if cap >= CLIP_PLANE0 && cap < CLIP_PLANE0 + 6 {
        return "CLIP_PLANE";
    }

    COMMON
        .iter()
        .chain(FIXED_FUNCTION.iter())
        .find(|v| v.0 == cap)
        .map(|v| v.1)
        .unwrap_or("capability")
}

/// The `glEnable`/`glDisable` switches, one tracker per capability.
///
/// Capabilities read their original value once and restore it at `close`. Trackers
/// of lights and clip planes are created on first use; if the frame is already open
/// at that moment, their original value is read right away.
pub struct Capabilities {
    pipeline: Pipeline,
    policy: OriginalValuePolicy,
    trackers: FastHashMap<GLenum, StateTracker<bool>>,
}

impl Capabilities {
    pub fn new(pipeline: Pipeline, policy: OriginalValuePolicy) -> Self {
        let mut caps = Capabilities {
            pipeline,
            policy,
            trackers: FastHashMap::default(),
        };

        for &(cap, _) in COMMON {
            caps.insert(cap);
        }

        if pipeline == Pipeline::FixedFunction {
            for &(cap, _) in FIXED_FUNCTION {
                caps.insert(cap);
            }
        }

        caps
    }

    fn insert(&mut self, cap: GLenum) -> &mut StateTracker<bool> {
        let policy = self.policy;
        self.trackers.entry(cap).or_insert_with(|| {
            StateTracker::new(
                label(cap),
                GLParam::new(cap),
                false,
                Some(set_capability),
                Some(get_capability),
            )
            .with_policy(policy)
        })
    }

    /// Whether the capability can be used with the current pipeline.
    pub fn is_supported(&self, cap: GLenum) -> bool {
        self.pipeline == Pipeline::FixedFunction || !is_fixed_function_only(cap)
    }

    /// Returns the tracker of a capability, if it has been created.
    pub fn get(&self, cap: GLenum) -> Option<&StateTracker<bool>> {
        self.trackers.get(&cap)
    }

    pub fn get_mut(&mut self, cap: GLenum) -> Option<&mut StateTracker<bool>> {
        self.trackers.get_mut(&cap)
    }

    /// Returns the cached state of a capability, if known.
    pub fn is_enabled(&self, cap: GLenum) -> Option<bool> {
        self.trackers
            .get(&cap)
            .filter(|v| v.is_value_known())
            .map(|v| v.value())
    }

    pub fn set(&mut self, device: &mut dyn Device, is_open: bool, cap: GLenum, enabled: bool) {
        if !self.is_supported(cap) {
            trace!("Skips {} since it is not part of the pipeline.", label(cap));
            return;
        }

        let created = !self.trackers.contains_key(&cap);
        let tracker = self.insert(cap);
        if created && is_open {
            tracker.open(device);
        }

        tracker.set(device, enabled);
    }

    pub fn open(&mut self, device: &mut dyn Device) {
        for v in self.trackers.values_mut() {
            v.open(device);
        }
    }

    pub fn close(&mut self, device: &mut dyn Device) {
        for v in self.trackers.values_mut() {
            v.close(device);
        }
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }
}

#[cfg(test)]
mod test {
    use super::super::super::headless::HeadlessDevice;
    use super::*;

    #[test]
    fn lazy_lights() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();
        probe.set_capability(LIGHT0 + 2, true);

        let mut caps = Capabilities::new(
            Pipeline::FixedFunction,
            OriginalValuePolicy::ReadOnceAndRestore,
        );
        caps.open(&mut device);
        assert!(caps.get(LIGHT0 + 2).is_none());

        caps.set(&mut device, true, LIGHT0 + 2, false);
        assert_eq!(caps.get(LIGHT0 + 2).unwrap().original(), true);
        assert!(!probe.is_enabled(LIGHT0 + 2));

        caps.close(&mut device);
        assert!(probe.is_enabled(LIGHT0 + 2));
    }

    #[test]
    fn programmable_skips_fixed_function() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();

        let mut caps = Capabilities::new(Pipeline::Programmable, OriginalValuePolicy::Ignore);
        caps.set(&mut device, false, LIGHTING, true);
        caps.set(&mut device, false, BLEND, true);
        assert!(!probe.is_enabled(LIGHTING));
        assert!(probe.is_enabled(BLEND));
    }
}
