//! Process-unique tags, names and the caches that look entities up by name.
//!
//! Every cacheable entity owns an `Identity`: a numeric tag drawn from a monotonic,
//! process-wide allocator, plus an optional name. Names are unique inside one `Cache`,
//! but not globally.

pub mod cache;

pub use self::cache::{Cache, Shared};

pub mod prelude {
    pub use super::cache::{Cache, Shared};
    pub use super::{Identifiable, Identity, Tag};
}

use std::sync::atomic::{AtomicUsize, Ordering};

use inlinable_string::InlinableString;

/// A process-unique identifier.
pub type Tag = u32;

static LAST_TAG: AtomicUsize = AtomicUsize::new(0);

/// Returns the next unused tag. Tags start from 1; zero is never allocated and can be
/// used to mean "nothing" (for example, the background in picking).
pub fn next_tag() -> Tag {
    (LAST_TAG.fetch_add(1, Ordering::Relaxed) + 1) as Tag
}

/// Resets the tag allocator so the next allocation returns 1 again.
pub fn reset_tag_allocation() {
    LAST_TAG.store(0, Ordering::Relaxed);
}

/// The tag and name carried by every identifiable object.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    tag: Tag,
    name: Option<InlinableString>,
}

/// Cloning allocates a new tag, so two live objects never share one.
impl Clone for Identity {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl Default for Identity {
    fn default() -> Self {
        Identity::new(None::<&str>)
    }
}

impl Identity {
    pub fn new<T: AsRef<str>>(name: Option<T>) -> Self {
        Identity {
            tag: next_tag(),
            name: name.map(|v| v.as_ref().into()),
        }
    }

    pub fn named<T: AsRef<str>>(name: T) -> Self {
        Identity::new(Some(name))
    }

    /// Creates a copy of this identity, with the same name and a new tag.
    pub fn copy(&self) -> Self {
        Identity {
            tag: next_tag(),
            name: self.name.clone(),
        }
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|v| v.as_ref())
    }

    pub fn set_name<T: AsRef<str>>(&mut self, name: Option<T>) {
        self.name = name.map(|v| v.as_ref().into());
    }
}

/// Objects with a tag and an optional name.
pub trait Identifiable {
    fn identity(&self) -> &Identity;

    #[inline]
    fn tag(&self) -> Tag {
        self.identity().tag()
    }

    #[inline]
    fn name(&self) -> Option<&str> {
        self.identity().name()
    }

    /// Whether this object should be copied when its owner is deep-copied. Auxiliary
    /// objects, such as debug visualizations, opt out by returning false.
    fn should_include_in_deep_copy(&self) -> bool {
        true
    }

    /// Returns a short "name (tag)" description.
    fn describe(&self) -> String {
        format!("{} ({})", self.name().unwrap_or("Unnamed"), self.tag())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tags() {
        let a = Identity::named("a");
        let b = Identity::default();
        assert!(b.tag() > a.tag());
        assert_eq!(a.name(), Some("a"));
        assert_eq!(b.name(), None);

        let c = a.copy();
        assert_ne!(c.tag(), a.tag());
        assert_eq!(c.name(), Some("a"));
    }
}
