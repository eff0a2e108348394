use std::marker::PhantomData;

use super::handle::{HandleIndex, HandleLike};

/// `HandlePool` hands out handles with recycled indices. A slot is alive while its
/// version is odd, freeing it bumps the version to the next even number.
pub struct HandlePool<H: HandleLike> {
    versions: Vec<HandleIndex>,
    frees: Vec<HandleIndex>,
    _phantom: PhantomData<H>,
}

impl<H: HandleLike> Default for HandlePool<H> {
    fn default() -> Self {
        HandlePool::new()
    }
}

impl<H: HandleLike> HandlePool<H> {
    pub fn new() -> Self {
        HandlePool {
            versions: Vec::new(),
            frees: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Creates an unused handle, reusing the lowest freed index first.
    pub fn create(&mut self) -> H {
        if let Some(index) = self.frees.pop() {
            let version = &mut self.versions[index as usize];
            *version += 1;
            H::new(index, *version)
        } else {
            self.versions.push(1);
            H::new(self.versions.len() as HandleIndex - 1, 1)
        }
    }

    /// Returns true if the handle was created by this pool and has not been freed yet.
    #[inline]
    pub fn is_alive(&self, handle: H) -> bool {
        let index = handle.index() as usize;
        index < self.versions.len()
            && self.versions[index] & 0x1 == 1
            && self.versions[index] == handle.version()
    }

    /// Recycles the index of the handle. Returns false if it was not alive.
    pub fn free(&mut self, handle: H) -> bool {
        if !self.is_alive(handle) {
            return false;
        }

        self.versions[handle.index() as usize] += 1;

        // Keep the free list sorted descending so `pop` yields the lowest index.
        let index = handle.index();
        let at = self
            .frees
            .iter()
            .position(|&v| v < index)
            .unwrap_or_else(|| self.frees.len());
        self.frees.insert(at, index);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len() - self.frees.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over alive handles in index order.
    pub fn iter(&self) -> impl Iterator<Item = H> + '_ {
        self.versions
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v & 0x1 == 1)
            .map(|(i, &v)| H::new(i as HandleIndex, v))
    }
}

/// A pool of objects addressed by handles. Every time a handle is created or freed,
/// the attached `T` is created or dropped with it.
pub struct ObjectPool<H: HandleLike, T> {
    handles: HandlePool<H>,
    entries: Vec<Option<T>>,
}

impl<H: HandleLike, T> Default for ObjectPool<H, T> {
    fn default() -> Self {
        ObjectPool::new()
    }
}

impl<H: HandleLike, T> ObjectPool<H, T> {
    pub fn new() -> Self {
        ObjectPool {
            handles: HandlePool::new(),
            entries: Vec::new(),
        }
    }

    pub fn create(&mut self, value: T) -> H {
        let handle = self.handles.create();
        let index = handle.index() as usize;

        if index >= self.entries.len() {
            self.entries.push(Some(value));
        } else {
            self.entries[index] = Some(value);
        }

        handle
    }

    #[inline]
    pub fn get(&self, handle: H) -> Option<&T> {
        if self.handles.is_alive(handle) {
            self.entries[handle.index() as usize].as_ref()
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        if self.handles.is_alive(handle) {
            self.entries[handle.index() as usize].as_mut()
        } else {
            None
        }
    }

    #[inline]
    pub fn is_alive(&self, handle: H) -> bool {
        self.handles.is_alive(handle)
    }

    pub fn free(&mut self, handle: H) -> Option<T> {
        if self.handles.free(handle) {
            self.entries[handle.index() as usize].take()
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = H> + '_ {
        self.handles.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::handle::test::TestHandle;

    #[test]
    fn recycle() {
        let mut pool: HandlePool<TestHandle> = HandlePool::new();
        let h1 = pool.create();
        let h2 = pool.create();
        let h3 = pool.create();
        assert_eq!(pool.len(), 3);

        assert!(pool.free(h3));
        assert!(pool.free(h1));
        assert!(!pool.free(h1));
        assert!(!pool.is_alive(h1));
        assert!(pool.is_alive(h2));

        let h4 = pool.create();
        assert_eq!(h4.index(), h1.index());
        assert_eq!(h4.version(), 3);
        assert!(!pool.is_alive(h1));
        assert!(pool.is_alive(h4));

        let alive: Vec<_> = pool.iter().collect();
        assert_eq!(alive, vec![h4, h2]);
    }

    #[test]
    fn objects() {
        let mut pool: ObjectPool<TestHandle, &'static str> = ObjectPool::new();
        let a = pool.create("a");
        let b = pool.create("b");
        assert_eq!(pool.get(a), Some(&"a"));
        assert_eq!(pool.free(a), Some("a"));
        assert_eq!(pool.get(a), None);

        let c = pool.create("c");
        assert_eq!(c.index(), a.index());
        assert_eq!(pool.get(c), Some(&"c"));
        assert_eq!(pool.get(b), Some(&"b"));
        assert_eq!(pool.len(), 2);
    }
}
