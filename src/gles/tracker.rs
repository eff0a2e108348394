//! Primitive and composite state trackers.

use std::fmt::Debug;

use super::consts::*;
use super::Device;
use crate::errors::*;
use crate::math::prelude::{Color4F, Vector3, Vector4, Viewport};

/// Determines whether a tracker reads the original value of its GL setting at `open`,
/// and whether it writes that value back at `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginalValuePolicy {
    /// Never read, never restored.
    Ignore,
    /// Read on the first `open` only.
    ReadOnce,
    /// Read on every `open`.
    ReadAlways,
    ReadOnceAndRestore,
    ReadAlwaysAndRestore,
    /// Restored on `close`, with an original value assigned by hand since GL offers no
    /// getter for it.
    RestoreOnly,
}

impl Default for OriginalValuePolicy {
    fn default() -> Self {
        OriginalValuePolicy::Ignore
    }
}

impl OriginalValuePolicy {
    /// Whether the original value is read from GL during `open`, given it is already
    /// known or not.
    #[inline]
    pub fn should_read(self, original_is_known: bool) -> bool {
        match self {
            OriginalValuePolicy::ReadAlways | OriginalValuePolicy::ReadAlwaysAndRestore => true,
            OriginalValuePolicy::ReadOnce | OriginalValuePolicy::ReadOnceAndRestore => {
                !original_is_known
            }
            _ => false,
        }
    }

    #[inline]
    pub fn should_restore(self) -> bool {
        match self {
            OriginalValuePolicy::ReadOnceAndRestore
            | OriginalValuePolicy::ReadAlwaysAndRestore
            | OriginalValuePolicy::RestoreOnly => true,
            _ => false,
        }
    }
}

/// Names the GL setting a tracker wraps. `target` is used by the settings that are
/// addressed with two enums, like `glLightfv(GL_LIGHT0, GL_DIFFUSE, ...)`, and is zero
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GLParam {
    pub target: GLenum,
    pub name: GLenum,
}

impl GLParam {
    #[inline]
    pub fn new(name: GLenum) -> Self {
        GLParam { target: 0, name }
    }

    #[inline]
    pub fn with_target(target: GLenum, name: GLenum) -> Self {
        GLParam { target, name }
    }
}

pub type Setter<T> = unsafe fn(&mut dyn Device, GLParam, T) -> Result<()>;
pub type Getter<T> = unsafe fn(&mut dyn Device, GLParam) -> Result<T>;

/// Wraps a single GL setting.
///
/// The tracker caches the last value it wrote, and only calls into GL if the new value
/// differs, the cached value is unknown or `should_always_set_gl` is set.
pub struct StateTracker<T> {
    label: &'static str,
    param: GLParam,
    value: T,
    original: T,
    value_is_known: bool,
    original_is_known: bool,
    policy: OriginalValuePolicy,
    should_always_set_gl: bool,
    is_dirty: bool,
    setter: Option<Setter<T>>,
    getter: Option<Getter<T>>,
}

impl<T> Debug for StateTracker<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        write!(f, "{} ", self.label)?;
        if self.value_is_known {
            write!(f, "{:?}", self.value)?;
        } else {
            write!(f, "(unknown)")?;
        }

        if self.original_is_known {
            write!(f, " [original {:?}, {:?}]", self.original, self.policy)
        } else {
            write!(f, " [{:?}]", self.policy)
        }
    }
}

impl<T> StateTracker<T>
where
    T: Copy + PartialEq + Debug,
{
    pub fn new(
        label: &'static str,
        param: GLParam,
        initial: T,
        setter: Option<Setter<T>>,
        getter: Option<Getter<T>>,
    ) -> Self {
        StateTracker {
            label,
            param,
            value: initial,
            original: initial,
            value_is_known: false,
            original_is_known: false,
            policy: OriginalValuePolicy::Ignore,
            should_always_set_gl: false,
            is_dirty: false,
            setter,
            getter,
        }
    }

    /// Builder style `set_policy`.
    pub fn with_policy(mut self, policy: OriginalValuePolicy) -> Self {
        self.set_policy(policy);
        self
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[inline]
    pub fn param(&self) -> GLParam {
        self.param
    }

    /// The cached value. Meaningless if `is_value_known` is false.
    #[inline]
    pub fn value(&self) -> T {
        self.value
    }

    #[inline]
    pub fn original(&self) -> T {
        self.original
    }

    #[inline]
    pub fn is_value_known(&self) -> bool {
        self.value_is_known
    }

    #[inline]
    pub fn is_original_known(&self) -> bool {
        self.original_is_known
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    #[inline]
    pub fn policy(&self) -> OriginalValuePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: OriginalValuePolicy) {
        if policy.should_read(false) && self.getter.is_none() {
            warn!(
                "{} has no getter, {:?} falls back to {:?}.",
                self.label,
                policy,
                OriginalValuePolicy::Ignore
            );
            self.policy = OriginalValuePolicy::Ignore;
            return;
        }

        self.policy = policy;
    }

    #[inline]
    pub fn should_always_set_gl(&self) -> bool {
        self.should_always_set_gl
    }

    #[inline]
    pub fn set_should_always_set_gl(&mut self, v: bool) {
        self.should_always_set_gl = v;
    }

    /// Assigns the original value by hand. This is how `RestoreOnly` trackers learn
    /// what to restore.
    pub fn set_original(&mut self, v: T) {
        self.original = v;
        self.original_is_known = true;
    }

    /// Marks the cached value as unknown, so the next `set` reaches GL.
    #[inline]
    pub fn forget(&mut self) {
        self.value_is_known = false;
    }

    /// Reads the original value if the policy asks for it.
    pub fn open(&mut self, device: &mut dyn Device) {
        if self.policy.should_read(self.original_is_known) {
            self.read_original(device);
        }
    }

    /// Reads the current GL value synchronously, and takes it as both the cached and the
    /// original value.
    pub fn read_original(&mut self, device: &mut dyn Device) -> Option<T> {
        let getter = self.getter?;
        match unsafe { getter(device, self.param) } {
            Ok(v) => {
                self.original = v;
                self.value = v;
                self.original_is_known = true;
                self.value_is_known = true;
                Some(v)
            }
            Err(err) => {
                warn!("Failed to read {}. {}", self.label, err);
                self.original_is_known = false;
                self.value_is_known = false;
                None
            }
        }
    }

    /// Sets the value, calling into GL only if required. Returns true if GL was called
    /// successfully.
    pub fn set(&mut self, device: &mut dyn Device, v: T) -> bool {
        if !self.should_always_set_gl && self.value_is_known && self.value == v {
            return false;
        }

        self.value = v;
        self.is_dirty = true;

        let setter = match self.setter {
            Some(setter) => setter,
            None => {
                self.value_is_known = true;
                return false;
            }
        };

        match unsafe { setter(device, self.param, v) } {
            Ok(_) => {
                self.value_is_known = true;
                true
            }
            Err(err) => {
                warn!("Failed to set {} to {:?}. {}", self.label, v, err);
                self.value_is_known = false;
                false
            }
        }
    }

    /// Updates the cached value without calling GL, as done by composite trackers whose
    /// components are written with one call. Returns true if the value changed.
    pub fn record(&mut self, v: T) -> bool {
        let changed = !self.value_is_known || self.value != v;
        self.value = v;
        self.value_is_known = true;
        self.is_dirty = true;
        changed
    }

    /// Returns true if `close` would write the original value back.
    #[inline]
    pub fn needs_restore(&self) -> bool {
        self.is_dirty
            && self.policy.should_restore()
            && self.original_is_known
            && (!self.value_is_known || self.value != self.original)
    }

    /// Writes the original value back if the policy asks for it.
    pub fn close(&mut self, device: &mut dyn Device) {
        if self.needs_restore() {
            let original = self.original;
            trace!("Restores {} to {:?}.", self.label, original);
            self.set(device, original);
        }

        self.is_dirty = false;
    }
}

/// Wraps two settings that GL writes with one call, like `glBlendFunc`.
pub struct CompositeTracker<A, B> {
    label: &'static str,
    pub first: StateTracker<A>,
    pub second: StateTracker<B>,
    should_always_set_gl: bool,
    setter: unsafe fn(&mut dyn Device, A, B) -> Result<()>,
}

impl<A, B> CompositeTracker<A, B>
where
    A: Copy + PartialEq + Debug,
    B: Copy + PartialEq + Debug,
{
    pub fn new(
        label: &'static str,
        first: StateTracker<A>,
        second: StateTracker<B>,
        setter: unsafe fn(&mut dyn Device, A, B) -> Result<()>,
    ) -> Self {
        CompositeTracker {
            label,
            first,
            second,
            should_always_set_gl: false,
            setter,
        }
    }

    pub fn with_policy(mut self, policy: OriginalValuePolicy) -> Self {
        self.first.set_policy(policy);
        self.second.set_policy(policy);
        self
    }

    #[inline]
    pub fn value(&self) -> (A, B) {
        (self.first.value(), self.second.value())
    }

    #[inline]
    pub fn is_value_known(&self) -> bool {
        self.first.is_value_known() && self.second.is_value_known()
    }

    #[inline]
    pub fn set_should_always_set_gl(&mut self, v: bool) {
        self.should_always_set_gl = v;
    }

    pub fn open(&mut self, device: &mut dyn Device) {
        self.first.open(device);
        self.second.open(device);
    }

    pub fn set(&mut self, device: &mut dyn Device, a: A, b: B) -> bool {
        let known = self.is_value_known();
        if !self.should_always_set_gl && known && self.value() == (a, b) {
            return false;
        }

        self.first.record(a);
        self.second.record(b);

        match unsafe { (self.setter)(device, a, b) } {
            Ok(_) => true,
            Err(err) => {
                warn!("Failed to set {} to {:?}. {}", self.label, (a, b), err);
                self.first.forget();
                self.second.forget();
                false
            }
        }
    }

    pub fn forget(&mut self) {
        self.first.forget();
        self.second.forget();
    }

    pub fn needs_restore(&self) -> bool {
        self.first.needs_restore() || self.second.needs_restore()
    }

    pub fn close(&mut self, device: &mut dyn Device) {
        if self.needs_restore() {
            let (a, b) = (self.first.original(), self.second.original());
            trace!("Restores {} to {:?}.", self.label, (a, b));
            self.set(device, a, b);
        }

        self.first.close(device);
        self.second.close(device);
    }
}

// Getters shared by the tracker groups.

pub unsafe fn get_capability(device: &mut dyn Device, p: GLParam) -> Result<bool> {
    device.is_enabled(p.name)
}

pub unsafe fn get_bool(device: &mut dyn Device, p: GLParam) -> Result<bool> {
    let mut v = [0];
    device.get_integer_v(p.name, &mut v)?;
    Ok(v[0] != 0)
}

pub unsafe fn get_int(device: &mut dyn Device, p: GLParam) -> Result<GLint> {
    let mut v = [0];
    device.get_integer_v(p.name, &mut v)?;
    Ok(v[0])
}

pub unsafe fn get_uint(device: &mut dyn Device, p: GLParam) -> Result<GLuint> {
    Ok(get_int(device, p)?.max(0) as GLuint)
}

pub unsafe fn get_enum(device: &mut dyn Device, p: GLParam) -> Result<GLenum> {
    Ok(get_int(device, p)? as GLenum)
}

pub unsafe fn get_float(device: &mut dyn Device, p: GLParam) -> Result<GLfloat> {
    let mut v = [0.0];
    device.get_float_v(p.name, &mut v)?;
    Ok(v[0])
}

pub unsafe fn get_color(device: &mut dyn Device, p: GLParam) -> Result<Color4F> {
    let mut v = [0.0; 4];
    device.get_float_v(p.name, &mut v)?;
    Ok(v.into())
}

pub unsafe fn get_viewport(device: &mut dyn Device, p: GLParam) -> Result<Viewport> {
    let mut v = [0; 4];
    device.get_integer_v(p.name, &mut v)?;
    Ok(Viewport::new(v[0], v[1], v[2], v[3]))
}

pub unsafe fn get_light_color(device: &mut dyn Device, p: GLParam) -> Result<Color4F> {
    let mut v = [0.0; 4];
    device.get_light_fv(p.target, p.name, &mut v)?;
    Ok(v.into())
}

pub unsafe fn get_light_vector4(device: &mut dyn Device, p: GLParam) -> Result<Vector4<f32>> {
    let mut v = [0.0; 4];
    device.get_light_fv(p.target, p.name, &mut v)?;
    Ok(Vector4::new(v[0], v[1], v[2], v[3]))
}

pub unsafe fn get_light_vector3(device: &mut dyn Device, p: GLParam) -> Result<Vector3<f32>> {
    let mut v = [0.0; 4];
    device.get_light_fv(p.target, p.name, &mut v)?;
    Ok(Vector3::new(v[0], v[1], v[2]))
}

pub unsafe fn get_light_float(device: &mut dyn Device, p: GLParam) -> Result<GLfloat> {
    let mut v = [0.0; 4];
    device.get_light_fv(p.target, p.name, &mut v)?;
    Ok(v[0])
}

// Setters shared by the tracker groups.

pub unsafe fn set_capability(device: &mut dyn Device, p: GLParam, v: bool) -> Result<()> {
    device.set_capability(p.name, v)
}

pub unsafe fn set_client_capability(device: &mut dyn Device, p: GLParam, v: bool) -> Result<()> {
    device.set_client_capability(p.name, v)
}

pub unsafe fn set_hint(device: &mut dyn Device, p: GLParam, v: GLenum) -> Result<()> {
    device.hint(p.name, v)
}

#[cfg(test)]
mod test {
    use super::super::headless::HeadlessDevice;
    use super::*;

    fn depth_test() -> StateTracker<bool> {
        StateTracker::new(
            "DEPTH_TEST",
            GLParam::new(DEPTH_TEST),
            false,
            Some(set_capability),
            Some(get_capability),
        )
    }

    #[test]
    fn filters_redundant_calls() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();

        let mut tracker = depth_test();
        assert!(tracker.set(&mut device, true));
        assert!(!tracker.set(&mut device, true));
        assert!(tracker.set(&mut device, false));
        assert_eq!(probe.call_count("set_capability"), 2);

        tracker.set_should_always_set_gl(true);
        assert!(tracker.set(&mut device, false));
        assert_eq!(probe.call_count("set_capability"), 3);
    }

    #[test]
    fn read_once_and_restore() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();
        probe.set_capability(DEPTH_TEST, true);

        let mut tracker = depth_test().with_policy(OriginalValuePolicy::ReadOnceAndRestore);
        tracker.open(&mut device);
        assert!(tracker.is_original_known());
        assert_eq!(tracker.original(), true);

        tracker.set(&mut device, false);
        assert!(!probe.is_enabled(DEPTH_TEST));
        tracker.close(&mut device);
        assert!(probe.is_enabled(DEPTH_TEST));

        // The original is not read again on the second open.
        probe.set_capability(DEPTH_TEST, false);
        tracker.open(&mut device);
        assert_eq!(tracker.original(), true);
        assert_eq!(probe.call_count("is_enabled"), 1);
    }

    #[test]
    fn read_always() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();

        let mut tracker = depth_test().with_policy(OriginalValuePolicy::ReadAlways);
        tracker.open(&mut device);
        tracker.open(&mut device);
        assert_eq!(probe.call_count("is_enabled"), 2);

        tracker.set(&mut device, true);
        tracker.close(&mut device);
        assert!(probe.is_enabled(DEPTH_TEST));
    }

    #[test]
    fn restore_only() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();

        let mut tracker = StateTracker::new(
            "DEPTH_TEST",
            GLParam::new(DEPTH_TEST),
            false,
            Some(set_capability),
            None,
        )
        .with_policy(OriginalValuePolicy::RestoreOnly);

        tracker.set_original(true);
        tracker.open(&mut device);
        assert_eq!(probe.call_count("is_enabled"), 0);

        tracker.set(&mut device, false);
        tracker.close(&mut device);
        assert!(probe.is_enabled(DEPTH_TEST));
    }

    #[test]
    fn read_policy_without_getter() {
        let tracker = StateTracker::new(
            "DEPTH_TEST",
            GLParam::new(DEPTH_TEST),
            false,
            Some(set_capability),
            None,
        )
        .with_policy(OriginalValuePolicy::ReadOnce);

        assert_eq!(tracker.policy(), OriginalValuePolicy::Ignore);
    }

    #[test]
    fn failed_set_forgets_value() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();

        let mut tracker = depth_test();
        probe.fail_next("set_capability");
        assert!(!tracker.set(&mut device, true));
        assert!(!tracker.is_value_known());

        // The next attempt reaches GL again.
        assert!(tracker.set(&mut device, true));
        assert!(probe.is_enabled(DEPTH_TEST));
    }

    unsafe fn blend_func(device: &mut dyn Device, src: GLenum, dst: GLenum) -> Result<()> {
        device.blend_func(src, dst)
    }

    #[test]
    fn composite() {
        let mut device = HeadlessDevice::new();
        let probe = device.probe();

        let src = StateTracker::new("BLEND_SRC", GLParam::new(BLEND_SRC), ONE, None, Some(get_enum));
        let dst = StateTracker::new("BLEND_DST", GLParam::new(BLEND_DST), ZERO, None, Some(get_enum));
        let mut tracker = CompositeTracker::new("blend func", src, dst, blend_func)
            .with_policy(OriginalValuePolicy::ReadOnceAndRestore);

        tracker.open(&mut device);
        assert_eq!(tracker.value(), (ONE, ZERO));

        assert!(tracker.set(&mut device, SRC_ALPHA, ONE_MINUS_SRC_ALPHA));
        assert!(!tracker.set(&mut device, SRC_ALPHA, ONE_MINUS_SRC_ALPHA));
        assert!(tracker.set(&mut device, ONE, ONE_MINUS_SRC_ALPHA));
        assert_eq!(probe.call_count("blend_func"), 2);

        tracker.close(&mut device);
        assert_eq!(probe.blend_func(), (ONE, ZERO));
        assert_eq!(probe.call_count("blend_func"), 3);
    }
}
