//! Mapping protocol and the `Dict` façade.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::Handle;
use crate::object::sequence::List;
use crate::object::{fully_qualified_name, runtime_check, status_check, Object};

/// Operations shared by every mapping-protocol façade.
pub trait Mapping {
    fn as_object(&self) -> &Object;

    fn has_key(&self, key: &Object) -> Result<bool, Error> {
        let r = unsafe { ffi::PyMapping_HasKey(self.as_object().as_ptr(), key.as_ptr()) };
        Ok(r != 0)
    }

    fn keys(&self) -> Result<List, Error> {
        let p = unsafe { ffi::PyMapping_Keys(self.as_object().as_ptr()) };
        let handle = runtime_check(p)?;
        List::expect(&Object::from_handle(handle))
    }

    fn values(&self) -> Result<List, Error> {
        let p = unsafe { ffi::PyMapping_Values(self.as_object().as_ptr()) };
        let handle = runtime_check(p)?;
        List::expect(&Object::from_handle(handle))
    }

    fn items(&self) -> Result<List, Error> {
        let p = unsafe { ffi::PyMapping_Items(self.as_object().as_ptr()) };
        let handle = runtime_check(p)?;
        List::expect(&Object::from_handle(handle))
    }
}

/// A runtime dictionary, iteration order preserved (the runtime convention
/// this crate assumes, matching CPython 3.7+).
#[derive(Clone, Debug)]
pub struct Dict(Object);

impl Dict {
    pub fn type_name() -> &'static str {
        "dict"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyDict_CheckExact(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(raise_type_error(format!(
                "expected 'dict', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(Dict(obj.clone()))
    }

    pub fn new() -> Result<Self, Error> {
        let p = unsafe { ffi::PyDict_New() };
        runtime_check(p).map(|h| Dict(Object::from_handle(h)))
    }

    /// Build a dict from an ordered sequence of key-value pairs, preserving
    /// insertion order.
    pub fn from_pairs(pairs: &[(Object, Object)]) -> Result<Self, Error> {
        let dict = Self::new()?;
        for (k, v) in pairs {
            dict.set_item(k, v)?;
        }
        Ok(dict)
    }

    pub fn get_item(&self, key: &Object) -> Result<Object, Error> {
        self.0.get_item(key)
    }

    pub fn set_item(&self, key: &Object, value: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PyDict_SetItem(self.0.as_ptr(), key.as_ptr(), value.as_ptr()) };
        status_check(r)
    }

    pub fn del_item(&self, key: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PyDict_DelItem(self.0.as_ptr(), key.as_ptr()) };
        status_check(r)
    }

    pub fn clear(&self) {
        unsafe { ffi::PyDict_Clear(self.0.as_ptr()) };
    }

    pub fn len(&self) -> Result<usize, Error> {
        self.0.len()
    }

    /// `self.update(other)`: merges key-value pairs from another mapping,
    /// overwriting existing keys.
    pub fn update(&self, other: &Dict) -> Result<(), Error> {
        let r = unsafe { ffi::PyDict_Update(self.0.as_ptr(), other.0.as_ptr()) };
        status_check(r)
    }

    /// `self.update(pairs)`: merges an iterable of key-value pairs.
    pub fn update_pairs(&self, pairs: &[(Object, Object)]) -> Result<(), Error> {
        for (k, v) in pairs {
            self.set_item(k, v)?;
        }
        Ok(())
    }

    /// Visit each `(key, value)` pair in iteration order, as borrowed
    /// objects.
    pub fn for_each(&self, mut visit: impl FnMut(&Object, &Object) -> Result<(), Error>) -> Result<(), Error> {
        let mut pos: ffi::Py_ssize_t = 0;
        let mut key: *mut ffi::PyObject = std::ptr::null_mut();
        let mut value: *mut ffi::PyObject = std::ptr::null_mut();
        loop {
            let has_next = unsafe { ffi::PyDict_Next(self.0.as_ptr(), &mut pos, &mut key, &mut value) };
            if has_next == 0 {
                break;
            }
            let key_obj = Object::from_handle(crate::handle::borrow(key));
            let value_obj = Object::from_handle(crate::handle::borrow(value));
            visit(&key_obj, &value_obj)?;
        }
        Ok(())
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Mapping for Dict {
    fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Convert for Dict {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

