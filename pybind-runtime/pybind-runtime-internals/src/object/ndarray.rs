//! `NDArray`: a buffer-protocol view façade, an illustrative numpy-adjacent
//! extension point. Gated behind the `numpy` feature since it needs no
//! numpy-specific ABI — just the runtime's generic buffer protocol
//! (`Py_buffer`).

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::Error;
use crate::handle::Handle;
use crate::object::{runtime_check, Object};

/// A read-only strided view over a buffer-protocol-exporting object's data,
/// exposed as `f64` elements.
pub struct NDArray {
    object: Object,
    buffer: ffi::Py_buffer,
}

impl NDArray {
    pub fn type_name() -> &'static str {
        "ndarray"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyObject_CheckBuffer(obj.as_ptr()) != 0 }
    }

    /// Acquire a buffer view over `obj`. Precondition: `obj` exports the
    /// buffer protocol and its underlying storage is `f64`-compatible.
    pub fn expect(obj: &Object) -> Result<Self, Error> {
        let mut buffer: ffi::Py_buffer = unsafe { std::mem::zeroed() };
        let r = unsafe {
            ffi::PyObject_GetBuffer(obj.as_ptr(), &mut buffer, ffi::PyBUF_ND | ffi::PyBUF_FORMAT)
        };
        if r < 0 {
            return Err(crate::error::Error::Exception(
                crate::error::ErrorException::capture(),
            ));
        }
        Ok(NDArray {
            object: obj.clone(),
            buffer,
        })
    }

    pub fn shape(&self) -> &[isize] {
        if self.buffer.shape.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.buffer.shape, self.buffer.ndim as usize) }
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product::<isize>().max(0) as usize
    }

    /// Borrow the underlying data as `f64` elements, assuming a
    /// contiguous, natively-aligned buffer.
    pub fn as_slice(&self) -> &[f64] {
        let count = (self.buffer.len as usize) / std::mem::size_of::<f64>();
        unsafe { std::slice::from_raw_parts(self.buffer.buf as *const f64, count) }
    }

    /// Wrap the view back into a fresh host-side memoryview object: returns
    /// the memoryview paired with a capsule that owns the underlying host
    /// vector.
    pub fn from_owned_f64(data: Vec<f64>) -> Result<(Object, crate::object::capsule::Capsule), Error> {
        let ptr = data.as_ptr() as *mut std::os::raw::c_void;
        let len = (data.len() * std::mem::size_of::<f64>()) as ffi::Py_ssize_t;
        let view = unsafe { ffi::PyMemoryView_FromMemory(ptr as *mut std::os::raw::c_char, len, ffi::PyBUF_READ) };
        let view_handle = runtime_check(view)?;
        let capsule = crate::object::capsule::Capsule::new(data)?;
        Ok((Object::from_handle(view_handle), capsule))
    }
}

impl Drop for NDArray {
    fn drop(&mut self) {
        unsafe { ffi::PyBuffer_Release(&mut self.buffer) };
    }
}

impl Convert for NDArray {
    fn object(&self) -> Handle {
        self.object.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}
