//! Numeric façades: `Int`, `Float`, `Bool`.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::{borrow, steal, Handle};
use crate::object::{fully_qualified_name, Object};

macro_rules! numeric_facade {
    ($name:ident, $type_name:expr, $check:path, $value:ty) => {
        /// Concrete facade narrowing `Object` to instances of its runtime
        /// numeric counterpart.
        #[derive(Clone, Debug)]
        pub struct $name(Handle);

        impl $name {
            pub fn type_name() -> &'static str {
                $type_name
            }

            pub fn isinstance(obj: &Object) -> bool {
                unsafe { $check(obj.as_ptr()) != 0 }
            }

            /// Narrow a borrowed object to this façade. Fails with `TypeError`
            /// unless `isinstance(obj)`.
            pub fn expect(obj: &Object) -> Result<Self, Error> {
                if !Self::isinstance(obj) {
                    return Err(raise_type_error(format!(
                        "expected '{}', got '{}'",
                        $type_name,
                        fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
                    )));
                }
                Ok($name(obj.handle().clone()))
            }

            pub fn val(&self) -> Result<$value, Error> {
                <$value as Convert>::extract(&self.0)
            }

            pub fn as_object(&self) -> Object {
                Object::from_handle(self.0.clone())
            }
        }
    };
}

numeric_facade!(Int, "int", ffi::PyLong_CheckExact, i64);
numeric_facade!(Float, "float", ffi::PyFloat_CheckExact, f64);
numeric_facade!(Bool, "bool", ffi::PyBool_Check, bool);

impl Int {
    pub fn from_value(v: i64) -> Self {
        Int(steal(unsafe { ffi::PyLong_FromLongLong(v) }))
    }
}

impl Float {
    pub fn from_value(v: f64) -> Self {
        Float(steal(unsafe { ffi::PyFloat_FromDouble(v) }))
    }
}

impl Bool {
    pub fn from_value(v: bool) -> Self {
        unsafe {
            let p = if v { ffi::Py_True() } else { ffi::Py_False() };
            Bool(borrow(p))
        }
    }
}

impl Convert for Int {
    fn object(&self) -> Handle {
        self.0.clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

impl Convert for Float {
    fn object(&self) -> Handle {
        self.0.clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

impl Convert for Bool {
    fn object(&self) -> Handle {
        self.0.clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}
