//! The `Capsule` façade: an owning host pointer wrapped as a runtime object.

use std::any::Any;
use std::os::raw::c_void;

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{raise_type_error, Error};
use crate::handle::Handle;
use crate::object::{fully_qualified_name, runtime_check, Object};

/// A capsule owning an arbitrary boxed host value, released by the runtime
/// when the capsule's refcount reaches zero.
///
/// The destructor callback below is invoked by the runtime *after* the
/// capsule object's own refcount has already dropped to zero.
/// It must not construct any new reference to the capsule object itself —
/// only reclaim the boxed payload behind `PyCapsule_GetPointer` and drop it.
/// A naive "steal the capsule, then let a handle drop" double-frees the
/// capsule; the payload, not the capsule, is what this destructor owns.
#[derive(Clone, Debug)]
pub struct Capsule(Object);

impl Capsule {
    pub fn type_name() -> &'static str {
        "capsule"
    }

    pub fn isinstance(obj: &Object) -> bool {
        unsafe { ffi::PyCapsule_CheckExact(obj.as_ptr()) != 0 }
    }

    pub fn expect(obj: &Object) -> Result<Self, Error> {
        if !Self::isinstance(obj) {
            return Err(raise_type_error(format!(
                "expected 'capsule', got '{}'",
                fully_qualified_name(unsafe { ffi::Py_TYPE(obj.as_ptr()) as *mut ffi::PyObject })
            )));
        }
        Ok(Capsule(obj.clone()))
    }

    /// Wrap `data` in a new capsule; `data` is dropped by `destructor` once
    /// the capsule's refcount reaches zero.
    pub fn new<T: Any>(data: T) -> Result<Self, Error> {
        let payload: *mut c_void = Box::into_raw(Box::new(data)) as *mut c_void;
        let p = unsafe { ffi::PyCapsule_New(payload, std::ptr::null(), Some(destructor::<T>)) };
        if p.is_null() {
            // Constructing the capsule failed; reclaim the payload ourselves
            // since the runtime never took ownership of it.
            unsafe { drop(Box::from_raw(payload as *mut T)) };
            return Err(Error::Exception(crate::error::ErrorException::capture()));
        }
        runtime_check(p).map(|h| Capsule(Object::from_handle(h)))
    }

    /// Borrow the payload, asserting it was constructed with type `T`.
    ///
    /// # Safety
    /// The caller must know the capsule was constructed via
    /// [`Capsule::new::<T>`]; there is no runtime type tag beyond the
    /// destructor function pointer identity that `PyCapsule_GetPointer`
    /// already checks.
    pub unsafe fn get<T>(&self) -> Result<&T, Error> {
        let p = ffi::PyCapsule_GetPointer(self.0.as_ptr(), std::ptr::null());
        if p.is_null() {
            return Err(Error::Exception(crate::error::ErrorException::capture()));
        }
        Ok(&*(p as *const T))
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }
}

unsafe extern "C" fn destructor<T>(capsule: *mut ffi::PyObject) {
    let payload = ffi::PyCapsule_GetPointer(capsule, std::ptr::null());
    if payload.is_null() {
        return;
    }
    drop(Box::from_raw(payload as *mut T));
}

impl Convert for Capsule {
    fn object(&self) -> Handle {
        self.0.handle().clone()
    }
    fn extract(handle: &Handle) -> Result<Self, Error> {
        Self::expect(&Object::from_handle(handle.clone()))
    }
}
