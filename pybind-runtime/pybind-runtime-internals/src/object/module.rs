//! The `Module` façade.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::Handle;
use crate::object::mapping::Dict;
use crate::object::{fully_qualified_name, runtime_check, Object};

/// A runtime module object.
#[derive(Clone, Debug)]
pub struct Module(Object);

impl Module {
    pub fn type_name() -> &'static str {
        "module"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyModule_Check(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(raise_type_error(format!(
                "expected 'module', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(Module(obj.clone()))
    }

    pub(crate) fn from_handle(handle: Handle) -> Self {
        Module(Object::from_handle(handle))
    }

    pub fn name(&self) -> Result<String, Error> {
        let p = unsafe { ffi::PyModule_GetNameObject(self.0.as_ptr()) };
        let handle = runtime_check(p)?;
        String::extract(&handle)
    }

    pub fn dict(&self) -> Result<Dict, Error> {
        let p = unsafe { ffi::PyModule_GetDict(self.0.as_ptr()) };
        // Borrowed per the runtime's own convention (module owns the dict).
        let handle = crate::handle::borrow(p);
        Dict::expect(&Object::from_handle(handle))
    }

    pub fn add(&self, name: &str, value: &Object) -> Result<(), Error> {
        let dict = self.dict()?;
        let key = crate::object::string::Str::from_value(name)?;
        dict.set_item(key.as_object(), value)
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Convert for Module {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

/// Import a module by name, the way `import name` would from script code.
pub fn import(name: &str) -> Result<Module, Error> {
    let c = std::ffi::CString::new(name).unwrap_or_default();
    let p = unsafe { ffi::PyImport_ImportModule(c.as_ptr()) };
    runtime_check(p).map(Module::from_handle)
}

