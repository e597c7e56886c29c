//! The `Type` façade, wrapping a runtime type object.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::Handle;
use crate::object::{fully_qualified_name, Object};

/// A runtime type object.
#[derive(Clone, Debug)]
pub struct Type(Object);

impl Type {
    pub fn type_name() -> &'static str {
        "type"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyType_Check(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(raise_type_error(format!(
                "expected 'type', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(Type(obj.clone()))
    }

    /// `type(obj)`, the exact runtime type of `obj`.
    pub fn of(obj: &Object) -> Type {
        let type_ptr = unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject };
        Type(Object::from_handle(crate::handle::borrow(type_ptr)))
    }

    /// The bare type name (`__name__`), e.g. `"int"` or `"Point"`.
    pub fn name(&self) -> Result<String, Error> {
        String::extract(self.0.get_attr("__name__")?.handle())
    }

    /// The qualified name (`__qualname__`), e.g. `"Outer.Inner"` for a
    /// nested class.
    pub fn qualname(&self) -> Result<String, Error> {
        String::extract(self.0.get_attr("__qualname__")?.handle())
    }

    /// The defining module's name (`__module__`).
    pub fn module_name(&self) -> Result<String, Error> {
        String::extract(self.0.get_attr("__module__")?.handle())
    }

    /// The fully-qualified name: `"<module>.<qualname>"`, with the module
    /// prefix dropped when it is `builtins` (matching the runtime's own
    /// `repr` convention for builtin types).
    pub fn fully_qualified_name(&self) -> Result<String, Error> {
        let module = self.module_name()?;
        let qualname = self.qualname()?;
        if module == "builtins" {
            Ok(qualname)
        } else {
            Ok(format!("{}.{}", module, qualname))
        }
    }

    /// Whether `self` is `other` or a subtype of it.
    pub fn is_subtype(&self, other: &Type) -> bool {
        unsafe {
            ffi::PyType_IsSubtype(
                self.0.as_ptr() as *mut ffi::PyTypeObject,
                other.0.as_ptr() as *mut ffi::PyTypeObject,
            ) != 0
        }
    }

    /// Whether `obj` is an instance of `self` (exact type or a subtype).
    pub fn instance_check(&self, obj: &Object) -> Result<bool, Error> {
        let r = unsafe { ffi::PyObject_IsInstance(obj.as_ptr(), self.0.as_ptr()) };
        if r < 0 {
            return Err(Error::Exception(crate::error::ErrorException::capture()));
        }
        Ok(r != 0)
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Convert for Type {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}
