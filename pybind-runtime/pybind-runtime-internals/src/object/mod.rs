//! The generic `Object` façade and the protocol/concrete façades built on it.
//!
//! Façades are capability tags: a façade newtype wraps a [`Handle`] and a
//! compile-time witness that the referent satisfies some predicate
//! (`isinstance`). `Object` itself witnesses nothing beyond "is a runtime
//! object" and exposes the full operator surface; concrete façades narrow
//! it, rendered as plain newtypes rather than an inheritance chain.

pub mod capsule;
pub mod exception;
pub mod iterator;
pub mod mapping;
#[cfg(feature = "numpy")]
pub mod ndarray;
pub mod module;
pub mod number;
pub mod sequence;
pub mod set;
pub mod string;
pub mod typeobj;

use std::os::raw::c_char;

use pyo3_ffi as ffi;

use crate::convert::Convert;
use crate::error::{Error, ErrorException};
use crate::handle::{borrow, steal, Handle};

/// A reference to an arbitrary runtime object.
#[derive(Clone, Debug)]
pub struct Object(pub(crate) Handle);

impl Object {
    pub fn from_handle(handle: Handle) -> Self {
        Object(handle)
    }

    pub fn handle(&self) -> &Handle {
        &self.0
    }

    pub fn into_handle(self) -> Handle {
        self.0
    }

    pub fn as_ptr(&self) -> *mut ffi::PyObject {
        self.0.get()
    }

    pub fn valid(&self) -> bool {
        self.0.valid()
    }

    /// `None`, the runtime's unit value.
    pub fn none() -> Object {
        Object(unsafe { borrow(ffi::Py_None()) })
    }

    /// The fixed protocol/runtime label for this façade; `"object"` for the
    /// generic façade.
    pub fn type_name() -> &'static str {
        "object"
    }

    /// Whether `obj` satisfies this façade (trivially true for `Object`).
    pub fn isinstance(_obj: &Object) -> bool {
        true
    }

    /// Wrap a host value convertible via [`Convert`].
    pub fn new<T: Convert>(value: &T) -> Self {
        Object(value.object())
    }

    /// Whether `self` and `other` are the exact same runtime object.
    pub fn is(&self, other: &Object) -> bool {
        self.as_ptr() == other.as_ptr()
    }

    /// The runtime type object of this object.
    pub fn type_of(&self) -> Object {
        Object(steal(unsafe { ffi::Py_TYPE(self.as_ptr()) as *mut ffi::PyObject }))
            .incref_and_self()
    }

    fn incref_and_self(self) -> Self {
        self.0.incref();
        self
    }

    pub fn has_attr(&self, name: &str) -> Result<bool, Error> {
        let c = std::ffi::CString::new(name).unwrap_or_default();
        let r = unsafe { ffi::PyObject_HasAttrString(self.as_ptr(), c.as_ptr()) };
        Ok(r != 0)
    }

    pub fn has_attr_obj(&self, name: &Object) -> Result<bool, Error> {
        let r = unsafe { ffi::PyObject_HasAttr(self.as_ptr(), name.as_ptr()) };
        Ok(r != 0)
    }

    pub fn get_attr(&self, name: &str) -> Result<Object, Error> {
        let c = std::ffi::CString::new(name).unwrap_or_default();
        let p = unsafe { ffi::PyObject_GetAttrString(self.as_ptr(), c.as_ptr()) };
        runtime_check(p).map(Object)
    }

    pub fn get_attr_obj(&self, name: &Object) -> Result<Object, Error> {
        let p = unsafe { ffi::PyObject_GetAttr(self.as_ptr(), name.as_ptr()) };
        runtime_check(p).map(Object)
    }

    pub fn set_attr(&self, name: &str, value: &Object) -> Result<(), Error> {
        let c = std::ffi::CString::new(name).unwrap_or_default();
        let r = unsafe { ffi::PyObject_SetAttrString(self.as_ptr(), c.as_ptr(), value.as_ptr()) };
        status_check(r)
    }

    pub fn set_attr_obj(&self, name: &Object, value: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PyObject_SetAttr(self.as_ptr(), name.as_ptr(), value.as_ptr()) };
        status_check(r)
    }

    pub fn del_attr(&self, name: &str) -> Result<(), Error> {
        let c = std::ffi::CString::new(name).unwrap_or_default();
        let r = unsafe { ffi::PyObject_DelAttrString(self.as_ptr(), c.as_ptr()) };
        status_check(r)
    }

    pub fn del_attr_obj(&self, name: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PyObject_DelAttr(self.as_ptr(), name.as_ptr()) };
        status_check(r)
    }

    /// `self[key]`.
    pub fn get_item(&self, key: &Object) -> Result<Object, Error> {
        let p = unsafe { ffi::PyObject_GetItem(self.as_ptr(), key.as_ptr()) };
        runtime_check(p).map(Object)
    }

    pub fn set_item(&self, key: &Object, value: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PyObject_SetItem(self.as_ptr(), key.as_ptr(), value.as_ptr()) };
        status_check(r)
    }

    pub fn del_item(&self, key: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PyObject_DelItem(self.as_ptr(), key.as_ptr()) };
        status_check(r)
    }

    /// `self[lo:hi]`, the half-open slice (sequences only).
    pub fn get_slice(&self, lo: isize, hi: isize) -> Result<Object, Error> {
        let p = unsafe { ffi::PySequence_GetSlice(self.as_ptr(), lo, hi) };
        runtime_check(p).map(Object)
    }

    pub fn set_slice(&self, lo: isize, hi: isize, value: &Object) -> Result<(), Error> {
        let r = unsafe { ffi::PySequence_SetSlice(self.as_ptr(), lo, hi, value.as_ptr()) };
        status_check(r)
    }

    pub fn del_slice(&self, lo: isize, hi: isize) -> Result<(), Error> {
        let r = unsafe { ffi::PySequence_DelSlice(self.as_ptr(), lo, hi) };
        status_check(r)
    }

    /// `obj[key]`, returning a proxy assignable via `=` and readable via
    /// `Object::from`/`Convert`.
    pub fn index<'a>(&'a self, key: Object) -> ItemAt<'a> {
        ItemAt { container: self, key }
    }

    pub fn call0(&self) -> Result<Object, Error> {
        let p = unsafe { ffi::PyObject_CallNoArgs(self.as_ptr()) };
        runtime_check(p).map(Object)
    }

    pub fn call(&self, posargs: &[Object]) -> Result<Object, Error> {
        let tuple = pack_tuple(posargs)?;
        let p = unsafe { ffi::PyObject_CallObject(self.as_ptr(), tuple.as_ptr()) };
        runtime_check(p).map(Object)
    }

    pub fn call_kw(&self, posargs: &[Object], kwargs: &[(&str, Object)]) -> Result<Object, Error> {
        let tuple = pack_tuple(posargs)?;
        let dict = unsafe { ffi::PyDict_New() };
        let dict = runtime_check(dict)?;
        for (name, value) in kwargs {
            let c = std::ffi::CString::new(*name).unwrap_or_default();
            let r = unsafe { ffi::PyDict_SetItemString(dict.as_ptr(), c.as_ptr(), value.as_ptr()) };
            status_check(r)?;
        }
        let p = unsafe { ffi::PyObject_Call(self.as_ptr(), tuple.as_ptr(), dict.as_ptr()) };
        runtime_check(p).map(Object)
    }

    pub fn is_truthy(&self) -> Result<bool, Error> {
        let r = unsafe { ffi::PyObject_IsTrue(self.as_ptr()) };
        if r < 0 {
            return Err(capture_exception());
        }
        Ok(r != 0)
    }

    pub fn not_(&self) -> Result<bool, Error> {
        let r = unsafe { ffi::PyObject_Not(self.as_ptr()) };
        if r < 0 {
            return Err(capture_exception());
        }
        Ok(r != 0)
    }

    pub fn len(&self) -> Result<usize, Error> {
        let r = unsafe { ffi::PyObject_Length(self.as_ptr()) };
        if r < 0 {
            return Err(capture_exception());
        }
        Ok(r as usize)
    }

    pub fn hash(&self) -> Result<i64, Error> {
        let r = unsafe { ffi::PyObject_Hash(self.as_ptr()) };
        if r == -1 {
            return Err(capture_exception());
        }
        Ok(r)
    }

    pub fn str(&self) -> Result<String, Error> {
        let p = unsafe { ffi::PyObject_Str(self.as_ptr()) };
        let handle = runtime_check(p)?;
        unicode_to_string(handle.get())
    }

    pub fn repr(&self) -> Result<String, Error> {
        let p = unsafe { ffi::PyObject_Repr(self.as_ptr()) };
        let handle = runtime_check(p)?;
        unicode_to_string(handle.get())
    }

    pub fn iter(&self) -> Result<iterator::Iterator, Error> {
        let p = unsafe { ffi::PyObject_GetIter(self.as_ptr()) };
        runtime_check(p).map(|h| iterator::Iterator::from_handle(h))
    }

    /// Fully-qualified type name, for diagnostics and `TypeError` messages.
    pub fn fully_qualified_type_name(&self) -> String {
        fully_qualified_name(unsafe { ffi::Py_TYPE(self.as_ptr()) as *mut ffi::PyObject })
    }

    // -- Arithmetic (forwarded verbatim) --------------------------------

    pub fn add(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Add(self.as_ptr(), other.as_ptr()) })
    }
    pub fn sub(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Subtract(self.as_ptr(), other.as_ptr()) })
    }
    pub fn mul(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Multiply(self.as_ptr(), other.as_ptr()) })
    }
    pub fn truediv(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_TrueDivide(self.as_ptr(), other.as_ptr()) })
    }
    pub fn floordiv(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_FloorDivide(self.as_ptr(), other.as_ptr()) })
    }
    pub fn rem(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Remainder(self.as_ptr(), other.as_ptr()) })
    }
    pub fn pow(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe {
            ffi::PyNumber_Power(self.as_ptr(), other.as_ptr(), ffi::Py_None())
        })
    }
    pub fn matmul(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_MatrixMultiply(self.as_ptr(), other.as_ptr()) })
    }
    pub fn pos(&self) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Positive(self.as_ptr()) })
    }
    pub fn neg(&self) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Negative(self.as_ptr()) })
    }
    pub fn abs(&self) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Absolute(self.as_ptr()) })
    }

    pub fn and(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_And(self.as_ptr(), other.as_ptr()) })
    }
    pub fn or(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Or(self.as_ptr(), other.as_ptr()) })
    }
    pub fn xor(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Xor(self.as_ptr(), other.as_ptr()) })
    }
    pub fn invert(&self) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Invert(self.as_ptr()) })
    }
    pub fn lshift(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Lshift(self.as_ptr(), other.as_ptr()) })
    }
    pub fn rshift(&self, other: &Object) -> Result<Object, Error> {
        binary(unsafe { ffi::PyNumber_Rshift(self.as_ptr(), other.as_ptr()) })
    }

    pub fn iadd(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceAdd(self.as_ptr(), other.as_ptr()) })
    }
    pub fn isub(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceSubtract(self.as_ptr(), other.as_ptr()) })
    }
    pub fn imul(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceMultiply(self.as_ptr(), other.as_ptr()) })
    }
    pub fn itruediv(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceTrueDivide(self.as_ptr(), other.as_ptr()) })
    }
    pub fn ifloordiv(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceFloorDivide(self.as_ptr(), other.as_ptr()) })
    }
    pub fn irem(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceRemainder(self.as_ptr(), other.as_ptr()) })
    }
    pub fn ipow(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe {
            ffi::PyNumber_InPlacePower(self.as_ptr(), other.as_ptr(), ffi::Py_None())
        })
    }
    pub fn iand(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceAnd(self.as_ptr(), other.as_ptr()) })
    }
    pub fn ior(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceOr(self.as_ptr(), other.as_ptr()) })
    }
    pub fn ixor(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceXor(self.as_ptr(), other.as_ptr()) })
    }
    pub fn ilshift(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceLshift(self.as_ptr(), other.as_ptr()) })
    }
    pub fn irshift(&mut self, other: &Object) -> Result<(), Error> {
        self.inplace(unsafe { ffi::PyNumber_InPlaceRshift(self.as_ptr(), other.as_ptr()) })
    }

    fn inplace(&mut self, raw: *mut ffi::PyObject) -> Result<(), Error> {
        let handle = runtime_check(raw)?;
        self.0 = handle;
        Ok(())
    }

    // -- Comparison -------------------------------------------------------

    pub fn eq(&self, other: &Object) -> Result<bool, Error> {
        self.rich_compare(other, ffi::Py_EQ)
    }
    pub fn ne(&self, other: &Object) -> Result<bool, Error> {
        self.rich_compare(other, ffi::Py_NE)
    }
    pub fn lt(&self, other: &Object) -> Result<bool, Error> {
        self.rich_compare(other, ffi::Py_LT)
    }
    pub fn le(&self, other: &Object) -> Result<bool, Error> {
        self.rich_compare(other, ffi::Py_LE)
    }
    pub fn gt(&self, other: &Object) -> Result<bool, Error> {
        self.rich_compare(other, ffi::Py_GT)
    }
    pub fn ge(&self, other: &Object) -> Result<bool, Error> {
        self.rich_compare(other, ffi::Py_GE)
    }

    fn rich_compare(&self, other: &Object, op: std::os::raw::c_int) -> Result<bool, Error> {
        let p = unsafe { ffi::PyObject_RichCompare(self.as_ptr(), other.as_ptr(), op) };
        let handle = runtime_check(p)?;
        let r = unsafe { ffi::PyObject_IsTrue(handle.get()) };
        if r < 0 {
            return Err(capture_exception());
        }
        Ok(r != 0)
    }
}

impl Convert for Object {
    fn object(&self) -> Handle {
        self.0.clone()
    }

    fn extract(handle: &Handle) -> Result<Self, Error> {
        Ok(Object(handle.clone()))
    }
}

/// A proxy returned by [`Object::index`] standing in for `container[key]`,
/// implicitly readable and assignable so `obj[k] = v` reads like native
/// indexing.
pub struct ItemAt<'a> {
    container: &'a Object,
    key: Object,
}

impl<'a> ItemAt<'a> {
    pub fn get(&self) -> Result<Object, Error> {
        self.container.get_item(&self.key)
    }

    pub fn set(&self, value: &Object) -> Result<(), Error> {
        self.container.set_item(&self.key, value)
    }

    pub fn set_value<T: Convert>(&self, value: &T) -> Result<(), Error> {
        let object = Object(value.object());
        self.set(&object)
    }
}

fn pack_tuple(items: &[Object]) -> Result<Handle, Error> {
    let tuple = unsafe { ffi::PyTuple_New(items.len() as ffi::Py_ssize_t) };
    let tuple = runtime_check(tuple)?;
    for (i, item) in items.iter().enumerate() {
        item.0.incref();
        let r = unsafe {
            ffi::PyTuple_SetItem(tuple.get(), i as ffi::Py_ssize_t, item.as_ptr())
        };
        status_check(r)?;
    }
    Ok(tuple)
}

fn unicode_to_string(p: *mut ffi::PyObject) -> Result<String, Error> {
    let mut size: ffi::Py_ssize_t = 0;
    let data = unsafe { ffi::PyUnicode_AsUTF8AndSize(p, &mut size) };
    if data.is_null() {
        return Err(capture_exception());
    }
    let slice = unsafe { std::slice::from_raw_parts(data as *const u8, size as usize) };
    Ok(String::from_utf8_lossy(slice).into_owned())
}

pub(crate) fn fully_qualified_name(type_obj: *mut ffi::PyObject) -> String {
    unsafe {
        let ty = type_obj as *mut ffi::PyTypeObject;
        let name_ptr = (*ty).tp_name;
        if name_ptr.is_null() {
            return String::from("<unknown>");
        }
        std::ffi::CStr::from_ptr(name_ptr as *const c_char)
            .to_string_lossy()
            .into_owned()
    }
}

/// Convert a raw result pointer from a non-arithmetic ABI call into a
/// `Handle`, mapping a null sentinel to whatever the runtime actually raised:
/// `IndexError`, `KeyError`, `AttributeError`, and the rest are forwarded
/// verbatim, not relabeled.
pub(crate) fn runtime_check(p: *mut ffi::PyObject) -> Result<Handle, Error> {
    if p.is_null() {
        Err(capture_exception())
    } else {
        Ok(steal(p))
    }
}

pub(crate) fn status_check(r: std::os::raw::c_int) -> Result<(), Error> {
    if r < 0 {
        Err(capture_exception())
    } else {
        Ok(())
    }
}

/// Convert a raw result pointer from an arithmetic ABI call, preserving the
/// runtime's actual raised exception type: arithmetic operations are
/// forwarded verbatim.
fn binary(p: *mut ffi::PyObject) -> Result<Object, Error> {
    if p.is_null() {
        Err(capture_exception())
    } else {
        Ok(Object(steal(p)))
    }
}

/// Capture whatever exception the runtime's error slot currently holds and
/// carry it across the host call boundary unchanged.
fn capture_exception() -> Error {
    Error::Exception(ErrorException::capture())
}
