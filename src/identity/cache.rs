use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{Identifiable, Tag};
use crate::utils::hash::FastHashMap;

/// Shared, mutable ownership used for everything that lives in a cache.
pub type Shared<T> = Rc<RefCell<T>>;

enum Entry<T> {
    Strong(Shared<T>),
    Weak(Weak<RefCell<T>>),
}

impl<T> Entry<T> {
    fn upgrade(&self) -> Option<Shared<T>> {
        match *self {
            Entry::Strong(ref v) => Some(v.clone()),
            Entry::Weak(ref v) => v.upgrade(),
        }
    }
}

/// A cache of identifiable objects keyed by name.
///
/// Each entry is held either strongly or weakly, depending on `is_weak` at the time
/// the entry was added. Weak entries vanish once the last external strong reference
/// is dropped; strong entries stay until removed explicitly.
pub struct Cache<T: Identifiable> {
    type_name: &'static str,
    is_weak: bool,
    entries: FastHashMap<String, Entry<T>>,
}

impl<T: Identifiable> Cache<T> {
    pub fn new(type_name: &'static str, is_weak: bool) -> Self {
        Cache {
            type_name,
            is_weak,
            entries: FastHashMap::default(),
        }
    }

    /// Creates a cache whose entries do not keep their objects alive.
    pub fn weak(type_name: &'static str) -> Self {
        Cache::new(type_name, true)
    }

    /// Creates a cache that pins its entries until they are removed.
    pub fn strong(type_name: &'static str) -> Self {
        Cache::new(type_name, false)
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn is_weak(&self) -> bool {
        self.is_weak
    }

    /// Determines how entries added from now on are held. Existing entries keep the
    /// mode they were added with.
    #[inline]
    pub fn set_is_weak(&mut self, is_weak: bool) {
        self.is_weak = is_weak;
    }

    /// Adds an object to the cache.
    ///
    /// # Panics
    ///
    /// Panics if the object has no name, or an object with the same name is present.
    pub fn add(&mut self, v: &Shared<T>) {
        let name = {
            let object = v.borrow();
            match object.name() {
                Some(name) => name.to_owned(),
                None => panic!("Can not cache a {} without name.", self.type_name),
            }
        };

        self.prune();
        assert!(
            !self.entries.contains_key(&name),
            "A {} named {} is already in the cache.",
            self.type_name,
            name
        );

        let entry = if self.is_weak {
            Entry::Weak(Rc::downgrade(v))
        } else {
            Entry::Strong(v.clone())
        };

        trace!("Adds {} {} into cache.", self.type_name, name);
        self.entries.insert(name, entry);
    }

    /// Returns the object with the specified name, if it is cached and alive.
    pub fn get<N: AsRef<str>>(&self, name: N) -> Option<Shared<T>> {
        self.entries.get(name.as_ref()).and_then(|v| v.upgrade())
    }

    /// Returns true if an alive object with the name is cached.
    #[inline]
    pub fn contains<N: AsRef<str>>(&self, name: N) -> bool {
        self.get(name).is_some()
    }

    /// Removes the object with the specified name. Removing an absent name is a no-op.
    pub fn remove<N: AsRef<str>>(&mut self, name: N) -> Option<Shared<T>> {
        self.entries.remove(name.as_ref()).and_then(|v| v.upgrade())
    }

    /// Removes the entry that holds the object, looked up by its tag.
    pub fn remove_object(&mut self, v: &T) -> Option<Shared<T>> {
        let tag = v.tag();
        let name = self
            .entries
            .iter()
            .find(|(_, e)| e.upgrade().map(|o| o.borrow().tag() == tag).unwrap_or(false))
            .map(|(n, _)| n.clone())?;
        self.remove(name)
    }

    pub fn remove_all(&mut self) {
        self.entries.clear();
    }

    /// Drops weak entries whose objects are gone.
    pub fn prune(&mut self) {
        self.entries.retain(|_, v| match *v {
            Entry::Strong(_) => true,
            Entry::Weak(ref w) => w.strong_count() > 0,
        });
    }

    /// Returns the number of alive entries.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|v| v.upgrade().is_some()).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the names of alive entries, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, v)| v.upgrade().is_some())
            .map(|(k, _)| k.clone())
            .collect();
        names.sort();
        names
    }

    /// Returns all alive entries.
    pub fn entries(&self) -> Vec<Shared<T>> {
        self.entries.values().filter_map(|v| v.upgrade()).collect()
    }

    /// Returns the tags of alive entries.
    pub fn tags(&self) -> Vec<Tag> {
        self.entries().iter().map(|v| v.borrow().tag()).collect()
    }
}

#[cfg(test)]
mod test {
    use super::super::Identity;
    use super::*;

    struct Asset {
        identity: Identity,
    }

    impl Identifiable for Asset {
        fn identity(&self) -> &Identity {
            &self.identity
        }
    }

    fn asset(name: &str) -> Shared<Asset> {
        Rc::new(RefCell::new(Asset {
            identity: Identity::named(name),
        }))
    }

    #[test]
    fn weak_and_strong() {
        let mut cache = Cache::weak("asset");

        let a = asset("a");
        cache.add(&a);
        assert!(cache.contains("a"));
        drop(a);
        assert!(!cache.contains("a"));
        assert_eq!(cache.len(), 0);

        cache.set_is_weak(false);
        cache.add(&asset("b"));
        assert!(cache.contains("b"));
        assert_eq!(cache.names(), vec!["b".to_owned()]);

        // Entries keep the mode they were added with.
        cache.set_is_weak(true);
        assert!(cache.contains("b"));

        assert!(cache.remove("b").is_some());
        assert!(cache.remove("b").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn reuse_name_after_drop() {
        let mut cache = Cache::weak("asset");
        cache.add(&asset("a"));
        let a = asset("a");
        cache.add(&a);
        assert_eq!(cache.get("a").unwrap().borrow().tag(), a.borrow().tag());
    }

    #[test]
    #[should_panic]
    fn duplicated_name() {
        let mut cache = Cache::strong("asset");
        cache.add(&asset("a"));
        cache.add(&asset("a"));
    }
}
