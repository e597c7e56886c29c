//! `BaseException` and `Traceback` façades wrapping runtime error values.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::Error;
use crate::handle::Handle;
use crate::object::{fully_qualified_name, Object};

/// A runtime exception value (not the `ErrorException` host-exception
/// wrapper in `error.rs` — this is a façade over an ordinary runtime object
/// that happens to be an exception instance).
#[derive(Clone, Debug)]
pub struct BaseException(Object);

impl BaseException {
    pub fn type_name() -> &'static str {
        "BaseException"
    }

    /// Whether `obj` is an instance of some exception type.
    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyExceptionInstance_Check(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(crate::error::raise_type_error(format!(
                "expected 'BaseException', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(BaseException(obj.clone()))
    }

    pub fn str(&self) -> Result<String, Error> {
        self.0.str()
    }

    /// `"<fully-qualified type>: <str(value)>"`.
    pub fn render(&self) -> Result<String, Error> {
        let ty_name = fully_qualified_name(unsafe { ffi::Py_TYPE(self.0.as_ptr()) as *mut ffi::PyObject });
        let value_str = self.str()?;
        Ok(format!("{}: {}", ty_name, value_str))
    }

    pub fn traceback(&self) -> Result<Option<Traceback>, Error> {
        let attr = self.0.get_attr("__traceback__")?;
        if attr.is(&Object::none()) {
            return Ok(None);
        }
        Traceback::expect(&attr).map(Some)
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Convert for BaseException {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

/// A runtime traceback value.
#[derive(Clone, Debug)]
pub struct Traceback(Object);

impl Traceback {
    pub fn type_name() -> &'static str {
        "traceback"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyTraceBack_Check(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(crate::error::raise_type_error(format!(
                "expected 'traceback', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(Traceback(obj.clone()))
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Convert for Traceback {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

/// Render a `(type, value, traceback)` triplet the way `BaseException::render`
/// does for a live instance, used by the interpreter's `exec`/`exec_file`
/// failure path where no exception instance is held.
pub fn render_parts(type_name: &str, value_str: &str, traceback_text: Option<&str>) -> String {
    match traceback_text {
        Some(tb) if !tb.is_empty() => format!("{}: {}\n\n{}", type_name, value_str, tb),
        _ => format!("{}: {}", type_name, value_str),
    }
}
