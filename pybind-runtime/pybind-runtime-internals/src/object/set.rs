//! The `Set` façade.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::Handle;
use crate::object::{fully_qualified_name, runtime_check, status_check, Object};

/// A runtime set. Not a sequence: membership and set-algebra, not ordering.
#[derive(Clone, Debug)]
pub struct Set(Object);

impl Set {
    pub fn type_name() -> &'static str {
        "set"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PySet_Check(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(raise_type_error(format!(
                "expected 'set', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(Set(obj.clone()))
    }

    pub fn new() -> Result<Self, Error> {
        let p = unsafe { ffi::PySet_New(std::ptr::null_mut()) };
        runtime_check(p).map(|h| Set(Object::from_handle(h)))
    }

    pub fn add(&self, value: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PySet_Add(self.0.as_ptr(), value.as_ptr()) };
        status_check(r)
    }

    pub fn discard(&self, value: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PySet_Discard(self.0.as_ptr(), value.as_ptr()) };
        if r < 0 {
            return Err(Error::Exception(crate::error::ErrorException::capture()));
        }
        Ok(())
    }

    pub fn pop(&self) -> Result<Object, Error> {
        let p = unsafe { ffi::PySet_Pop(self.0.as_ptr()) };
        runtime_check(p).map(Object::from_handle)
    }

    pub fn has(&self, value: &Object) -> Result<bool, Error> {
        let r = unsafe { ffi::PySet_Contains(self.0.as_ptr(), value.as_ptr()) };
        if r < 0 {
            return Err(Error::Exception(crate::error::ErrorException::capture()));
        }
        Ok(r != 0)
    }

    pub fn clear(&self) -> Result<(), Error> {
        let r = unsafe { ffi::PySet_Clear(self.0.as_ptr()) };
        status_check(r)
    }

    pub fn len(&self) -> Result<usize, Error> {
        self.0.len()
    }

    // Set-algebra is exposed through the generic bitwise surface on
    // `Object`: `set.as_object().and(other)` for intersection, `.or(other)`
    // for union, `.xor(other)` for symmetric difference, `.sub(other)` for
    // difference.
    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Convert for Set {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}
