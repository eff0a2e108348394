use super::super::consts::*;
use super::super::tracker::*;
use super::super::{ArrayPointer, Device};
use crate::errors::*;
use crate::utils::hash::FastHashMap;

unsafe fn set_buffer_binding(device: &mut dyn Device, p: GLParam, v: GLuint) -> Result<()> {
    device.bind_buffer(p.target, v)
}

unsafe fn set_pointer(device: &mut dyn Device, p: GLParam, v: ArrayPointer) -> Result<()> {
    device.array_pointer(p.name, v)
}

/// One client vertex array: its on/off switch and its pointer.
pub struct ClientArray {
    pub enabled: StateTracker<bool>,
    pub pointer: StateTracker<ArrayPointer>,
}

impl ClientArray {
    fn new(label: &'static str, array: GLenum) -> Self {
        ClientArray {
            enabled: StateTracker::new(
                label,
                GLParam::new(array),
                false,
                Some(set_client_capability),
                None,
            ),
            pointer: StateTracker::new(
                label,
                GLParam::new(array),
                ArrayPointer::default(),
                Some(set_pointer),
                None,
            ),
        }
    }
}

/// Buffer bindings and the client vertex arrays, except texture coordinates which
/// live with their texture unit.
pub struct VertexArrays {
    pub array_buffer: StateTracker<GLuint>,
    pub element_buffer: StateTracker<GLuint>,
    arrays: FastHashMap<GLenum, ClientArray>,
}

impl VertexArrays {
    pub fn new(fixed_function: bool) -> Self {
        let mut arrays = FastHashMap::default();
        arrays.insert(VERTEX_ARRAY, ClientArray::new("VERTEX_ARRAY", VERTEX_ARRAY));
        arrays.insert(NORMAL_ARRAY, ClientArray::new("NORMAL_ARRAY", NORMAL_ARRAY));
        arrays.insert(COLOR_ARRAY, ClientArray::new("COLOR_ARRAY", COLOR_ARRAY));
        if fixed_function {
            arrays.insert(
                POINT_SIZE_ARRAY_OES,
                ClientArray::new("POINT_SIZE_ARRAY_OES", POINT_SIZE_ARRAY_OES),
            );
            arrays.insert(
                MATRIX_INDEX_ARRAY_OES,
                ClientArray::new("MATRIX_INDEX_ARRAY_OES", MATRIX_INDEX_ARRAY_OES),
            );
            arrays.insert(
                WEIGHT_ARRAY_OES,
                ClientArray::new("WEIGHT_ARRAY_OES", WEIGHT_ARRAY_OES),
            );
        }

        VertexArrays {
            array_buffer: StateTracker::new(
                "ARRAY_BUFFER_BINDING",
                GLParam::with_target(ARRAY_BUFFER, ARRAY_BUFFER_BINDING),
                0,
                Some(set_buffer_binding),
                Some(get_uint),
            ),
            element_buffer: StateTracker::new(
                "ELEMENT_ARRAY_BUFFER_BINDING",
                GLParam::with_target(ELEMENT_ARRAY_BUFFER, ELEMENT_ARRAY_BUFFER_BINDING),
                0,
                Some(set_buffer_binding),
                Some(get_uint),
            ),
            arrays,
        }
    }

    pub fn binding_mut(&mut self, target: GLenum) -> &mut StateTracker<GLuint> {
        if target == ELEMENT_ARRAY_BUFFER {
            &mut self.element_buffer
        } else {
            &mut self.array_buffer
        }
    }

    pub fn get(&self, array: GLenum) -> Option<&ClientArray> {
        self.arrays.get(&array)
    }

    pub fn get_mut(&mut self, array: GLenum) -> Option<&mut ClientArray> {
        self.arrays.get_mut(&array)
    }

    /// Forgets cached bindings of the buffer, after it has been deleted.
    pub fn unbind(&mut self, id: GLuint) {
        if self.array_buffer.value() == id {
            self.array_buffer.record(0);
        }

        if self.element_buffer.value() == id {
            self.element_buffer.record(0);
        }
    }

    pub fn close(&mut self, device: &mut dyn Device) {
        self.array_buffer.close(device);
        self.element_buffer.close(device);
        for v in self.arrays.values_mut() {
            v.enabled.close(device);
            v.pointer.close(device);
        }
    }
}
