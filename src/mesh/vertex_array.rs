//! Per-vertex attribute arrays, kept in client memory and optionally in a GL buffer.

use std::fmt::Debug;
use std::mem;
use std::ops::Range;
use std::slice;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::gles::consts::*;
use crate::gles::engine::GLEngine;
use crate::gles::release::{self, ContextId, GLObject};
use crate::gles::ArrayPointer;

bitflags! {
    /// The attribute channels present in a mesh.
    #[derive(Default, Serialize, Deserialize)]
    pub struct VertexContent: u32 {
        const LOCATION = 0x1;
        const NORMAL = 0x2;
        const COLOR = 0x4;
        const TEXCOORD = 0x8;
        const MATRIX_INDICES = 0x10;
        const WEIGHTS = 0x20;
    }
}

impl VertexContent {
    /// The content mesh generators populate unless told otherwise.
    pub fn standard() -> Self {
        VertexContent::LOCATION | VertexContent::NORMAL | VertexContent::TEXCOORD
    }
}

/// Scalar types a vertex array can hold.
pub trait Component: Copy + Default + Debug + PartialEq + Serialize + DeserializeOwned {
    const GL_TYPE: GLenum;
}

impl Component for f32 {
    const GL_TYPE: GLenum = FLOAT;
}

impl Component for u8 {
    const GL_TYPE: GLenum = UNSIGNED_BYTE;
}

impl Component for u16 {
    const GL_TYPE: GLenum = UNSIGNED_SHORT;
}

#[inline]
fn as_bytes<T: Component>(v: &[T]) -> &[u8] {
    unsafe { slice::from_raw_parts(v.as_ptr() as *const u8, v.len() * mem::size_of::<T>()) }
}

/// An array of `len` elements, each made of `components` scalars.
///
/// The array lives in client memory, and in a GL buffer once `create_buffer` is called.
/// A buffered array may drop its client copy with `release_redundant_data` unless it is
/// told to retain it. Arrays that are not buffered always keep their client copy.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct VertexArray<T: Component> {
    /// The client array this binds to, or `ELEMENT_ARRAY_BUFFER` for indices.
    semantic: GLenum,
    components: usize,
    len: usize,
    data: Vec<T>,
    is_released: bool,
    should_retain: bool,
    should_buffer: bool,
    usage: GLenum,
    #[serde(skip)]
    context: ContextId,
    #[serde(skip)]
    buffer: GLuint,
    #[serde(skip)]
    dirty: Option<Range<usize>>,
}

impl<T: Component> Clone for VertexArray<T> {
    /// Clones the client data. The clone has no GL buffer.
    fn clone(&self) -> Self {
        VertexArray {
            semantic: self.semantic,
            components: self.components,
            len: self.len,
            data: self.data.clone(),
            is_released: self.is_released,
            should_retain: self.should_retain,
            should_buffer: self.should_buffer,
            usage: self.usage,
            context: ContextId::default(),
            buffer: 0,
            dirty: None,
        }
    }
}

impl<T: Component> Drop for VertexArray<T> {
    fn drop(&mut self) {
        release::release(self.context, GLObject::Buffer(self.buffer));
    }
}

impl<T: Component> VertexArray<T> {
    pub fn new(semantic: GLenum, components: usize) -> Self {
        assert!(components > 0, "Vertex array elements need at least one component.");
        VertexArray {
            semantic,
            components,
            len: 0,
            data: Vec::new(),
            is_released: false,
            should_retain: false,
            should_buffer: true,
            usage: STATIC_DRAW,
            context: ContextId::default(),
            buffer: 0,
            dirty: None,
        }
    }

    #[inline]
    pub fn semantic(&self) -> GLenum {
        self.semantic
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The size of one element in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.components * mem::size_of::<T>()
    }

    /// Resizes the array. New elements are zeroed.
    pub fn set_len(&mut self, len: usize) {
        self.assert_retained();
        self.data.resize(len * self.components, T::default());
        self.len = len;
    }

    /// Changes the number of components of each element, dropping the content.
    pub fn set_components(&mut self, components: usize) {
        assert!(components > 0, "Vertex array elements need at least one component.");
        self.components = components;
        self.data = vec![T::default(); self.len * components];
        self.is_released = false;
    }

    #[inline]
    pub fn is_retained(&self) -> bool {
        !self.is_released
    }

    fn assert_retained(&self) {
        assert!(
            !self.is_released,
            "Vertex data of array {:#x} has been released.",
            self.semantic
        );
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        self.assert_retained();
        &self.data
    }

    /// Mutable access to the whole array. The whole buffer is marked dirty.
    pub fn data_mut(&mut self) -> &mut [T] {
        self.assert_retained();
        self.mark_dirty(0..self.len);
        &mut self.data
    }

    /// Returns the components of element `i`.
    #[inline]
    pub fn element(&self, i: usize) -> &[T] {
        self.assert_retained();
        assert!(i < self.len, "Vertex {} is out of bounds {}.", i, self.len);
        &self.data[i * self.components..(i + 1) * self.components]
    }

    pub fn set_element(&mut self, i: usize, v: &[T]) {
        self.assert_retained();
        assert!(i < self.len, "Vertex {} is out of bounds {}.", i, self.len);
        let n = self.components.min(v.len());
        let start = i * self.components;
        self.data[start..start + n].copy_from_slice(&v[..n]);
        self.mark_dirty(i..i + 1);
    }

    /// Copies elements of another array into this one, starting at element `dst`.
    pub fn copy_from(&mut self, src: &VertexArray<T>, src_range: Range<usize>, dst: usize) {
        self.assert_retained();
        assert_eq!(self.components, src.components);
        let count = src_range.end - src_range.start;
        assert!(dst + count <= self.len, "Copy overflows the vertex array.");

        let c = self.components;
        self.data[dst * c..(dst + count) * c]
            .copy_from_slice(&src.data()[src_range.start * c..src_range.end * c]);
        self.mark_dirty(dst..dst + count);
    }

    fn mark_dirty(&mut self, range: Range<usize>) {
        self.dirty = Some(match self.dirty.take() {
            Some(v) => v.start.min(range.start)..v.end.max(range.end),
            None => range,
        });
    }

    /// The elements changed since the buffer was last updated.
    #[inline]
    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    /// Whether the client copy survives `release_redundant_data`.
    #[inline]
    pub fn should_retain(&self) -> bool {
        self.should_retain || !self.should_buffer
    }

    #[inline]
    pub fn set_should_retain(&mut self, v: bool) {
        self.should_retain = v;
    }

    /// Whether `create_buffer` loads the array into a GL buffer.
    #[inline]
    pub fn should_buffer(&self) -> bool {
        self.should_buffer
    }

    /// Keeps the array in client memory only. Must be set before the buffer is created.
    #[inline]
    pub fn set_should_buffer(&mut self, v: bool) {
        self.should_buffer = v;
    }

    #[inline]
    pub fn usage(&self) -> GLenum {
        self.usage
    }

    #[inline]
    pub fn set_usage(&mut self, usage: GLenum) {
        self.usage = usage;
    }

    /// The GL buffer, or zero if the array is not buffered.
    #[inline]
    pub fn buffer(&self) -> GLuint {
        self.buffer
    }

    #[inline]
    fn target(&self) -> GLenum {
        if self.semantic == ELEMENT_ARRAY_BUFFER {
            ELEMENT_ARRAY_BUFFER
        } else {
            ARRAY_BUFFER
        }
    }

    /// Loads the array into a GL buffer. Failures are logged, and leave the array
    /// unbuffered so the next call retries.
    pub fn create_buffer(&mut self, engine: &mut GLEngine) {
        if !self.should_buffer || self.buffer != 0 || self.len == 0 || self.is_released {
            return;
        }

        match engine.create_buffer(self.target(), as_bytes(&self.data), self.usage) {
            Ok(id) => {
                self.context = engine.context();
                self.buffer = id;
                self.dirty = None;
            }
            Err(err) => warn!("Failed to buffer vertex array {:#x}. {}", self.semantic, err),
        }
    }

    /// Copies the dirty elements into the GL buffer.
    pub fn update_buffer(&mut self, engine: &mut GLEngine) {
        let range = match self.dirty.take() {
            Some(v) => v,
            None => return,
        };

        self.update_buffer_range(engine, range);
    }

    /// Copies `range` of the elements into the GL buffer.
    pub fn update_buffer_range(&mut self, engine: &mut GLEngine, range: Range<usize>) {
        if self.buffer == 0 || self.is_released || range.start >= range.end {
            return;
        }

        let c = self.components;
        let end = range.end.min(self.len);
        let bytes = as_bytes(&self.data[range.start * c..end * c]);
        let offset = range.start * self.stride();

        if let Err(err) = engine.update_buffer(self.target(), self.buffer, offset, bytes) {
            warn!("Failed to update vertex array {:#x}. {}", self.semantic, err);
        }
    }

    pub fn delete_buffer(&mut self, engine: &mut GLEngine) {
        if self.buffer != 0 {
            engine.delete_buffer(self.buffer);
            self.buffer = 0;
        }
    }

    /// Frees the client copy if it lives in a GL buffer and need not be retained.
    pub fn release_redundant_data(&mut self) {
        if self.buffer == 0 || self.should_retain() || self.is_released {
            return;
        }

        self.data = Vec::new();
        self.is_released = true;
    }

    /// Describes where GL finds the element at `first`.
    pub fn pointer(&self, first: usize) -> ArrayPointer {
        let offset = if self.buffer != 0 {
            first * self.stride()
        } else {
            self.assert_retained();
            self.data.as_ptr() as usize + first * self.stride()
        };

        ArrayPointer {
            buffer: self.buffer,
            size: self.components as GLint,
            ty: T::GL_TYPE,
            stride: 0,
            offset,
        }
    }

    /// Points the client array of the semantic at this array, and enables it.
    pub fn bind(&self, engine: &mut GLEngine) {
        engine.bind_buffer(ARRAY_BUFFER, self.buffer);
        engine.set_array_pointer(self.semantic, self.pointer(0));
        engine.enable_client_array(self.semantic, true);
    }

    /// Points the texture coordinates of `unit` at this array.
    pub fn bind_texcoords(&self, engine: &mut GLEngine, unit: usize) {
        engine.bind_buffer(ARRAY_BUFFER, self.buffer);
        engine.set_texcoord_pointer(unit, self.pointer(0));
        engine.enable_texcoord_array(unit, true);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gles::EngineParams;

    #[test]
    fn elements() {
        let mut array: VertexArray<f32> = VertexArray::new(VERTEX_ARRAY, 3);
        array.set_len(4);
        assert_eq!(array.len(), 4);
        assert_eq!(array.stride(), 12);

        array.set_element(2, &[1.0, 2.0, 3.0]);
        assert_eq!(array.element(2), &[1.0, 2.0, 3.0]);
        assert_eq!(array.element(1), &[0.0, 0.0, 0.0]);
        assert_eq!(array.dirty_range(), Some(2..3));

        array.set_element(0, &[1.0, 1.0, 1.0]);
        assert_eq!(array.dirty_range(), Some(0..3));
    }

    #[test]
    fn buffering_and_release() {
        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        let mut array: VertexArray<f32> = VertexArray::new(VERTEX_ARRAY, 2);
        array.set_len(3);
        array.create_buffer(&mut engine);
        assert_ne!(array.buffer(), 0);
        assert_eq!(probe.buffer(array.buffer()).unwrap().len(), 24);

        array.set_element(1, &[5.0, 6.0]);
        array.update_buffer(&mut engine);
        assert_eq!(probe.call_count("buffer_sub_data"), 1);
        assert_eq!(array.pointer(1).offset, 8);

        array.release_redundant_data();
        assert!(!array.is_retained());
        assert_eq!(array.len(), 3);

        let mut kept: VertexArray<u8> = VertexArray::new(COLOR_ARRAY, 4);
        kept.set_len(1);
        kept.set_should_buffer(false);
        kept.create_buffer(&mut engine);
        kept.release_redundant_data();
        assert_eq!(kept.buffer(), 0);
        assert!(kept.is_retained());
    }

    #[test]
    #[should_panic]
    fn released_access() {
        let (mut engine, _) = GLEngine::headless(EngineParams::default());
        let mut array: VertexArray<u16> = VertexArray::new(ELEMENT_ARRAY_BUFFER, 1);
        array.set_len(3);
        array.create_buffer(&mut engine);
        array.release_redundant_data();
        array.element(0);
    }
}
