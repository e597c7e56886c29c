//! Sequence protocol and the `Tuple`/`List` façades.

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::Handle;
use crate::object::{fully_qualified_name, runtime_check, status_check, Object};

/// Operations shared by every sequence-protocol façade: count,
/// membership, index-of, and repetition. Implemented once against the
/// generic `Object` the façade wraps.
pub trait Sequence {
    fn as_object(&self) -> &Object;

    fn count(&self, value: &Object) -> Result<usize, Error> {
        let r = unsafe { ffi::PySequence_Count(self.as_object().as_ptr(), value.as_ptr()) };
        if r < 0 {
            return Err(runtime_err());
        }
        Ok(r as usize)
    }

    fn contains(&self, value: &Object) -> Result<bool, Error> {
        let r = unsafe { ffi::PySequence_Contains(self.as_object().as_ptr(), value.as_ptr()) };
        if r < 0 {
            return Err(runtime_err());
        }
        Ok(r != 0)
    }

    fn index(&self, value: &Object) -> Result<usize, Error> {
        let r = unsafe { ffi::PySequence_Index(self.as_object().as_ptr(), value.as_ptr()) };
        if r < 0 {
            return Err(runtime_err());
        }
        Ok(r as usize)
    }

    /// `n * self`.
    fn repeat(&self, n: isize) -> Result<Object, Error> {
        let p = unsafe { ffi::PySequence_Repeat(self.as_object().as_ptr(), n as ffi::Py_ssize_t) };
        runtime_check(p).map(Object::from_handle)
    }

    /// `self *= n`.
    fn repeat_inplace(&mut self, n: isize) -> Result<(), Error>;
}

fn runtime_err() -> Error {
    Error::Exception(crate::error::ErrorException::capture())
}

/// An immutable, fixed-length runtime sequence.
#[derive(Clone, Debug)]
pub struct Tuple(Object);

impl Tuple {
    pub fn type_name() -> &'static str {
        "tuple"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyTuple_CheckExact(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(expected_error(Self::type_name(), obj));
        }
        Ok(Tuple(obj.clone()))
    }

    /// Build a tuple from owned host items.
    pub fn from_items(items: &[Object]) -> Result<Self, Error> {
        let tuple = unsafe { ffi::PyTuple_New(items.len() as ffi::Py_ssize_t) };
        let handle = runtime_check(tuple)?;
        for (i, item) in items.iter().enumerate() {
            item.handle().incref();
            let r = unsafe {
                ffi::PyTuple_SetItem(handle.get(), i as ffi::Py_ssize_t, item.as_ptr())
            };
            status_check(r)?;
        }
        Ok(Tuple(Object::from_handle(handle)))
    }

    pub fn len(&self) -> Result<usize, Error> {
        self.0.len()
    }

    pub fn get(&self, i: isize) -> Result<Object, Error> {
        let p = unsafe { ffi::PyTuple_GetItem(self.0.as_ptr(), i as ffi::Py_ssize_t) };
        runtime_check(p).map(|h| {
            h.incref();
            Object::from_handle(h)
        })
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Sequence for Tuple {
    fn as_object(&self) -> &Object {
        &self.0
    }

    fn repeat_inplace(&mut self, n: isize) -> Result<(), Error> {
        // Tuples are immutable; `*=` produces a new tuple, per the runtime's
        // own semantics.
        self.0 = self.repeat(n)?;
        Ok(())
    }
}

impl Convert for Tuple {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

/// A mutable runtime list.
#[derive(Clone, Debug)]
pub struct List(Object);

impl List {
    pub fn type_name() -> &'static str {
        "list"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyList_CheckExact(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(expected_error(Self::type_name(), obj));
        }
        Ok(List(obj.clone()))
    }

    pub fn new() -> Result<Self, Error> {
        let p = unsafe { ffi::PyList_New(0) };
        runtime_check(p).map(|h| List(Object::from_handle(h)))
    }

    pub fn from_items(items: &[Object]) -> Result<Self, Error> {
        let list = Self::new()?;
        for item in items {
            list.append(item)?;
        }
        Ok(list)
    }

    pub fn len(&self) -> Result<usize, Error> {
        self.0.len()
    }

    pub fn get(&self, i: isize) -> Result<Object, Error> {
        self.0.get_item(&Object::new(&i))
    }

    pub fn set(&self, i: isize, value: &Object) -> Result<(), Error> {
        self.0.set_item(&Object::new(&i), value)
    }

    pub fn append(&self, value: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PyList_Append(self.0.as_ptr(), value.as_ptr()) };
        status_check(r)
    }

    pub fn insert(&self, i: isize, value: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PyList_Insert(self.0.as_ptr(), i as ffi::Py_ssize_t, value.as_ptr()) };
        status_check(r)
    }

    pub fn sort(&self) -> Result<(), Error> {
        let r = unsafe { ffi::PyList_Sort(self.0.as_ptr()) };
        status_check(r)
    }

    pub fn reverse(&self) -> Result<(), Error> {
        let r = unsafe { ffi::PyList_Reverse(self.0.as_ptr()) };
        status_check(r)
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

impl Sequence for List {
    fn as_object(&self) -> &Object {
        &self.0
    }

    fn repeat_inplace(&mut self, n: isize) -> Result<(), Error> {
        let mut object = self.0.clone();
        object.imul(&Object::new(&n))?;
        self.0 = object;
        Ok(())
    }
}

impl Convert for List {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}

fn expected_error(expected: &str, obj: &Object) -> Error {
    raise_type_error(format!(
        "expected '{}', got '{}'",
        expected,
        fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
    ))
}
