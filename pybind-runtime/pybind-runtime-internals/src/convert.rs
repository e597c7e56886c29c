//! Conversion between host types and runtime objects.
//!
//! `Convert` is an open registry: a host type opts in by implementing
//! `object()`/`extract()` directly, resolved through the trait-impl table at
//! compile time rather than a runtime lookup. The impls below cover the
//! primitive types; façade types (`Int`, `Str`, `List`, ...) implement
//! `Convert` themselves next to their definitions in the `object` module.

use std::ffi::CString;
use std::os::raw::c_char;

use pyo3_ffi as ffi;

use crate::error::{raise_type_error, raise_value_error, Error};
use crate::handle::{borrow, steal, Handle};

/// Bidirectional conversion between a host type and a runtime object.
///
/// `extract` takes a borrowed handle (it must not consume a reference) and
/// returns a host value or a `TypeError`-shaped [`Error`]; `object` produces
/// a brand-new, owned runtime object.
pub trait Convert: Sized {
    fn object(&self) -> Handle;
    fn extract(handle: &Handle) -> Result<Self, Error>;
}

fn c_string(s: &str) -> CString {
    CString::new(s).unwrap_or_else(|_| CString::new("<invalid utf-8>").unwrap())
}

fn type_name(handle: &Handle) -> String {
    unsafe {
        let ty = (*handle.get()).ob_type;
        let name_ptr = (*ty).tp_name;
        if name_ptr.is_null() {
            return String::from("<unknown>");
        }
        std::ffi::CStr::from_ptr(name_ptr as *const c_char)
            .to_string_lossy()
            .into_owned()
    }
}

fn wrong_type(expected: &str, handle: &Handle) -> Error {
    raise_type_error(format!(
        "expected '{}', got '{}'",
        expected,
        type_name(handle)
    ))
}

impl Convert for bool {
    fn object(&self) -> Handle {
        unsafe {
            let p = if *self { ffi::Py_True() } else { ffi::Py_False() };
            borrow(p)
        }
    }

    fn extract(handle: &Handle) -> Result<Self, Error> {
        let p = handle.get();
        let is_bool = unsafe { ffi::PyBool_Check(p) != 0 };
        if !is_bool {
            return Err(wrong_type("bool", handle));
        }
        Ok(unsafe { ffi::PyObject_IsTrue(p) } != 0)
    }
}

macro_rules! impl_convert_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Convert for $t {
                fn object(&self) -> Handle {
                    steal(unsafe { ffi::PyLong_FromLongLong(*self as i64) })
                }

                fn extract(handle: &Handle) -> Result<Self, Error> {
                    let p = handle.get();
                    let is_int = unsafe { ffi::PyLong_Check(p) != 0 };
                    if !is_int {
                        return Err(wrong_type("int", handle));
                    }
                    let v = unsafe { ffi::PyLong_AsLongLong(p) };
                    if v == -1 && crate::error::is_error_set() {
                        return Err(raise_value_error(format!(
                            "integer value out of range for {}",
                            stringify!($t)
                        )));
                    }
                    <$t>::try_from(v).map_err(|_| {
                        raise_value_error(format!(
                            "integer value out of range for {}",
                            stringify!($t)
                        ))
                    })
                }
            }
        )*
    };
}

impl_convert_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_convert_float {
    ($($t:ty),* $(,)?) => {
        $(
            impl Convert for $t {
                fn object(&self) -> Handle {
                    steal(unsafe { ffi::PyFloat_FromDouble(*self as f64) })
                }

                fn extract(handle: &Handle) -> Result<Self, Error> {
                    let p = handle.get();
                    let is_number = unsafe { ffi::PyFloat_Check(p) != 0 || ffi::PyLong_Check(p) != 0 };
                    if !is_number {
                        return Err(wrong_type("float", handle));
                    }
                    let v = unsafe { ffi::PyFloat_AsDouble(p) };
                    if v == -1.0 && crate::error::is_error_set() {
                        return Err(raise_value_error("could not convert to float"));
                    }
                    Ok(v as $t)
                }
            }
        )*
    };
}

impl_convert_float!(f32, f64);

impl Convert for String {
    fn object(&self) -> Handle {
        let c = c_string(self);
        steal(unsafe { ffi::PyUnicode_FromString(c.as_ptr()) })
    }

    fn extract(handle: &Handle) -> Result<Self, Error> {
        let p = handle.get();
        let is_str = unsafe { ffi::PyUnicode_Check(p) != 0 };
        if !is_str {
            return Err(wrong_type("str", handle));
        }
        let mut size: ffi::Py_ssize_t = 0;
        let data = unsafe { ffi::PyUnicode_AsUTF8AndSize(p, &mut size) };
        if data.is_null() {
            return Err(raise_value_error("string is not valid UTF-8"));
        }
        let slice = unsafe { std::slice::from_raw_parts(data as *const u8, size as usize) };
        Ok(String::from_utf8_lossy(slice).into_owned())
    }
}

impl<T: Convert> Convert for Option<T> {
    fn object(&self) -> Handle {
        match self {
            Some(v) => v.object(),
            None => unsafe { borrow(ffi::Py_None()) },
        }
    }

    fn extract(handle: &Handle) -> Result<Self, Error> {
        let p = handle.get();
        let is_none = unsafe { p == ffi::Py_None() };
        if is_none {
            Ok(None)
        } else {
            T::extract(handle).map(Some)
        }
    }
}

/// Convert a value implementing [`Convert`] to an owned runtime object.
pub fn to_object<T: Convert>(value: &T) -> Handle {
    value.object()
}

/// Extract a host value from a borrowed runtime object handle.
pub fn from_object<T: Convert>(handle: &Handle) -> Result<T, Error> {
    T::extract(handle)
}

#[cfg(test)]
mod tests {
    // Exercising `Convert` impls requires a live interpreter (Py_Initialize)
    // to construct real `PyLong`/`PyUnicode`/`PyBool` objects; see
    // `pybind-runtime/tests/binding.rs` for the round-trip coverage across
    // the primitive set.
}
