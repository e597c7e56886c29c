//! The `Str` façade.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::Handle;
use crate::object::sequence::Sequence;
use crate::object::{fully_qualified_name, runtime_check, Object};

/// A runtime unicode string.
#[derive(Clone, Debug)]
pub struct Str(Object);

impl Str {
    pub fn type_name() -> &'static str {
        "str"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyUnicode_CheckExact(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(raise_type_error(format!(
                "expected 'str', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(Str(obj.clone()))
    }

    pub fn from_value(s: &str) -> Result<Self, Error> {
        let c = std::ffi::CString::new(s).unwrap_or_default();
        let p = unsafe { ffi::PyUnicode_FromString(c.as_ptr()) };
        runtime_check(p).map(|h| Str(Object::from_handle(h)))
    }

    pub fn val(&self) -> Result<String, Error> {
        String::extract(self.0.handle())
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Sequence for Str {
    fn as_object(&self) -> &Object {
        &self.0
    }

    fn repeat_inplace(&mut self, n: isize) -> Result<(), Error> {
        self.0 = self.repeat(n)?;
        Ok(())
    }
}

impl Convert for Str {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}
