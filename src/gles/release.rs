//! Deferred deletion of GL objects.
//!
//! Owners of GL objects usually get dropped far away from the engine, so their `Drop`
//! implementations only enqueue the ids here, tagged with the context that created them.
//! Each engine deletes its own objects the next time a frame is opened or closed, on the
//! rendering thread.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::consts::GLuint;

/// Identifies the GL context of one engine. The default id belongs to no engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextId(usize);

impl ContextId {
    /// Returns an id that was never handed out before.
    pub fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GLObject {
    Buffer(GLuint),
    Texture(GLuint),
    Framebuffer(GLuint),
    Renderbuffer(GLuint),
}

impl GLObject {
    #[inline]
    pub fn id(&self) -> GLuint {
        match *self {
            GLObject::Buffer(id)
            | GLObject::Texture(id)
            | GLObject::Framebuffer(id)
            | GLObject::Renderbuffer(id) => id,
        }
    }
}

thread_local! {
    static RELEASED: RefCell<Vec<(ContextId, GLObject)>> = RefCell::new(Vec::new());
}

/// Enqueues an object of `context` for deletion. Zero ids are ignored.
pub fn release(context: ContextId, v: GLObject) {
    if v.id() != 0 {
        RELEASED.with(|q| q.borrow_mut().push((context, v)));
    }
}

/// Takes every object of `context` enqueued so far. Objects of other contexts stay.
pub fn drain(context: ContextId) -> Vec<GLObject> {
    RELEASED.with(|q| {
        let mut q = q.borrow_mut();
        let mut taken = Vec::new();
        q.retain(|&(c, v)| {
            if c == context {
                taken.push(v);
                false
            } else {
                true
            }
        });

        taken
    })
}

/// Returns the number of objects of `context` waiting for deletion.
pub fn pending(context: ContextId) -> usize {
    RELEASED.with(|q| q.borrow().iter().filter(|&&(c, _)| c == context).count())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn queue() {
        let context = ContextId::next();
        release(context, GLObject::Texture(0));
        release(context, GLObject::Texture(3));
        release(context, GLObject::Buffer(4));
        assert_eq!(pending(context), 2);
        assert_eq!(drain(context), vec![GLObject::Texture(3), GLObject::Buffer(4)]);
        assert_eq!(pending(context), 0);
    }

    #[test]
    fn contexts_keep_their_own_objects() {
        let (a, b) = (ContextId::next(), ContextId::next());
        assert_ne!(a, b);

        release(a, GLObject::Texture(1));
        release(b, GLObject::Texture(1));
        release(a, GLObject::Buffer(2));
        assert_eq!(drain(b), vec![GLObject::Texture(1)]);
        assert_eq!(pending(b), 0);
        assert_eq!(pending(a), 2);
        assert_eq!(drain(a), vec![GLObject::Texture(1), GLObject::Buffer(2)]);
    }
}
