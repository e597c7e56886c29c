//! The memory bridge: `MemoryView` and `make_memory`. `Capsule` itself lives
//! in [`crate::object::capsule`]; this module is just the pairing of a
//! read-only view with the capsule that keeps its backing bytes alive.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::Handle;
use crate::object::capsule::Capsule;
use crate::object::{fully_qualified_name, runtime_check, Object};

/// A read-only view over a byte buffer.
#[derive(Clone, Debug)]
pub struct MemoryView(Object);

impl MemoryView {
    pub fn type_name() -> &'static str {
        "memoryview"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyMemoryView_Check(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(raise_type_error(format!(
                "expected 'memoryview', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(MemoryView(obj.clone()))
    }

    /// Wrap `data` in a new read-only memory view. The view borrows `data`'s
    /// bytes directly, so it is only valid as long as `data` is kept alive --
    /// see [`make_memory`], which pairs the view with the capsule that does
    /// exactly that.
    fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let ptr = data.as_ptr() as *mut std::os::raw::c_char;
        let len = data.len() as ffi::Py_ssize_t;
        let p = unsafe { ffi::PyMemoryView_FromMemory(ptr, len, ffi::PyBUF_READ) };
        runtime_check(p).map(|h| MemoryView(Object::from_handle(h)))
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Convert for MemoryView {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

/// Hand `data`'s ownership to a capsule and return a memory view over its
/// bytes paired with that capsule, so the view's borrowed bytes outlive it
/// for as long as the caller holds the capsule.
pub fn make_memory(data: Vec<u8>) -> Result<(MemoryView, Capsule), Error> {
    let capsule = Capsule::new(data)?;
    let data: &Vec<u8> = unsafe { capsule.get::<Vec<u8>>()? };
    let view = MemoryView::from_bytes(data)?;
    Ok((view, capsule))
}

#[cfg(test)]
mod tests {
    // `make_memory`/`MemoryView::expect` require a live interpreter to
    // construct and check runtime objects; see
    // `pybind-runtime/tests/binding.rs`.
}
