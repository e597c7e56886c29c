//! The `Iterator` façade.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error, ErrorException};
use crate::handle::Handle;
use crate::object::{fully_qualified_name, Object};

/// A runtime iterator. `next()` yields `None` at end of iteration; any other
/// runtime-raised error during iteration propagates as a host exception.
#[derive(Clone, Debug)]
pub struct Iterator(Object);

impl Iterator {
    pub fn type_name() -> &'static str {
        "iterator"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyIter_Check(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(raise_type_error(format!(
                "expected 'iterator', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(Iterator(obj.clone()))
    }

    pub(crate) fn from_handle(handle: Handle) -> Self {
        Iterator(Object::from_handle(handle))
    }

    /// `Some(value)` for the next item, `None` at end of iteration.
    pub fn next(&self) -> Result<Option<Object>, Error> {
        let p = unsafe { ffi::PyIter_Next(self.0.as_ptr()) };
        if !p.is_null() {
            return Ok(Some(Object::from_handle(crate::handle::steal(p))));
        }
        if crate::error::is_error_set() {
            return Err(Error::Exception(ErrorException::capture()));
        }
        Ok(None)
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Convert for Iterator {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}
