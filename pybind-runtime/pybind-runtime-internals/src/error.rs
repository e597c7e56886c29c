//! Error scope, host exception type, and the trampoline translator.
//!
//! A `thiserror` enum of error kinds plus a catch-all internal variant,
//! layered on top of an [`ErrorScope`] that owns the runtime's captured
//! (type, value, traceback) triplet.

use std::fmt;

use pyo3_ffi as ffi;
use thiserror::Error;
use tracing::trace;

use crate::handle::{borrow, steal, Handle};

/// Errors raised by the binding layer itself, as opposed to errors forwarded
/// verbatim from the runtime (those travel as [`ErrorException`]).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("assertion error: {0}")]
    AssertionError(String),

    #[error("runtime error: {0}")]
    RuntimeError(String),

    /// A runtime exception carried across a host call boundary. Restoring
    /// this into the runtime's error slot is the inverse of
    /// [`ErrorScope::capture`].
    #[error("{0}")]
    Exception(#[from] ErrorException),

    /// Catch-all for host-side failures that have no closer analogue above
    /// (I/O errors opening a script file, `anyhow::Error` from elsewhere in
    /// the crate).
    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Internal(e.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Error {
        Error::Internal(e)
    }
}

/// A captured, owning snapshot of the runtime error's (type, value,
/// traceback) triplet. Non-copyable: constructing one clears the runtime's
/// error slot, and dropping one without calling [`restore`](Self::restore)
/// discards the error permanently.
pub struct ErrorScope {
    ty: Option<Handle>,
    value: Option<Handle>,
    traceback: Option<Handle>,
}

impl ErrorScope {
    /// Capture the runtime's currently-set error. Precondition: a runtime
    /// error is set. Postcondition: the runtime's error slot is cleared and
    /// this scope holds the triplet, normalized.
    ///
    /// This crate normalizes eagerly here (rather than deferring to first
    /// access), since every caller that captures a scope wants a normalized
    /// exception instance to read its type name or prefix its message.
    pub fn capture() -> ErrorScope {
        assert!(is_error_set(), "ErrorScope::capture: no error is set");
        let mut ty: *mut ffi::PyObject = std::ptr::null_mut();
        let mut value: *mut ffi::PyObject = std::ptr::null_mut();
        let mut traceback: *mut ffi::PyObject = std::ptr::null_mut();
        unsafe { ffi::PyErr_Fetch(&mut ty, &mut value, &mut traceback) };
        let mut scope = ErrorScope {
            ty: non_null_handle(ty),
            value: non_null_handle(value),
            traceback: non_null_handle(traceback),
        };
        scope.normalize();
        trace!("captured runtime error");
        scope
    }

    /// Whether this scope currently holds an error.
    pub fn holds_error(&self) -> bool {
        self.ty.is_some()
    }

    /// Re-install the triplet into the runtime's error slot. Precondition:
    /// holding. Postcondition: empty.
    pub fn restore(mut self) {
        assert!(self.holds_error(), "ErrorScope::restore: scope is empty");
        let ty = self.ty.take().unwrap().release();
        // `value`/`traceback` may be legitimately absent even while holding
        // (an exception instance with no explicit traceback); `PyErr_Restore`
        // accepts null for either.
        let value = self
            .value
            .take()
            .map(|mut h| h.release())
            .unwrap_or(std::ptr::null_mut());
        let traceback = self
            .traceback
            .take()
            .map(|mut h| h.release())
            .unwrap_or(std::ptr::null_mut());
        unsafe { ffi::PyErr_Restore(ty, value, traceback) };
    }

    /// Canonicalize the triplet in place (the runtime's own normalization:
    /// ensures `value` is an instance of `type`, not merely convertible to
    /// one).
    pub fn normalize(&mut self) {
        assert!(self.holds_error(), "ErrorScope::normalize: scope is empty");
        let mut ty = self.ty.take().map(|mut h| h.release()).unwrap();
        let mut value = self
            .value
            .take()
            .map(|mut h| h.release())
            .unwrap_or(std::ptr::null_mut());
        let mut traceback = self
            .traceback
            .take()
            .map(|mut h| h.release())
            .unwrap_or(std::ptr::null_mut());
        unsafe { ffi::PyErr_NormalizeException(&mut ty, &mut value, &mut traceback) };
        self.ty = non_null_handle(ty);
        self.value = non_null_handle(value);
        self.traceback = non_null_handle(traceback);
    }

    /// Best-effort clear of the traceback field. The runtime's own semantics
    /// for "set traceback to empty" have changed across versions; this never
    /// panics and simply drops the held traceback, if any.
    pub fn clear_traceback(&mut self) {
        self.traceback = None;
    }

    /// Build a new exception of the same type whose string value is
    /// `"<prefix>: <old>"`, carrying over cause/context/traceback.
    pub fn prefix_message(&mut self, prefix: &str) {
        assert!(
            self.holds_error(),
            "ErrorScope::prefix_message: scope is empty"
        );
        let ty_ptr = self.ty.as_ref().unwrap().get();
        let old_value = self.value.take();
        let old_str = old_value
            .as_ref()
            .map(|h| object_str(h.get()))
            .unwrap_or_default();
        let new_message = format!("{}: {}", prefix, old_str);
        let new_value = unsafe {
            let msg = std::ffi::CString::new(new_message).unwrap_or_default();
            let msg_obj = ffi::PyUnicode_FromString(msg.as_ptr());
            let args = ffi::PyTuple_Pack(1, msg_obj);
            ffi::Py_DecRef(msg_obj);
            let value = ffi::PyObject_CallObject(ty_ptr, args);
            ffi::Py_DecRef(args);
            value
        };
        self.value = non_null_handle(new_value);
        // cause/context/traceback are preserved on `old_value`, which the
        // runtime's exception machinery already chains onto `new_value` via
        // `__context__` once this scope is restored and the old value is
        // dropped inside an active `except` block; here we simply keep the
        // original traceback attached to the scope.
        drop(old_value);
    }
}

impl Drop for ErrorScope {
    fn drop(&mut self) {
        // Destructing a held scope without restoring discards the error;
        // the `Handle` drops release the references.
    }
}

fn non_null_handle(p: *mut ffi::PyObject) -> Option<Handle> {
    if p.is_null() {
        None
    } else {
        Some(steal(p))
    }
}

fn object_str(p: *mut ffi::PyObject) -> String {
    unsafe {
        let s = ffi::PyObject_Str(p);
        if s.is_null() {
            ffi::PyErr_Clear();
            return String::from("<unprintable>");
        }
        let mut size: ffi::Py_ssize_t = 0;
        let data = ffi::PyUnicode_AsUTF8AndSize(s, &mut size);
        let out = if data.is_null() {
            String::from("<unprintable>")
        } else {
            let slice = std::slice::from_raw_parts(data as *const u8, size as usize);
            String::from_utf8_lossy(slice).into_owned()
        };
        ffi::Py_DecRef(s);
        out
    }
}

/// Whether the runtime currently has an error set.
pub fn is_error_set() -> bool {
    unsafe { !ffi::PyErr_Occurred().is_null() }
}

/// The host-side exception carrying an [`ErrorScope`] across host call
/// frames, with a lazily rendered, cached message.
pub struct ErrorException {
    scope: ErrorScope,
    message: std::cell::OnceCell<String>,
}

impl ErrorException {
    /// Capture the current runtime error and wrap it for host-side
    /// propagation. Precondition: a runtime error is set.
    pub fn capture() -> ErrorException {
        ErrorException {
            scope: ErrorScope::capture(),
            message: std::cell::OnceCell::new(),
        }
    }

    pub fn prefix_message(mut self, prefix: &str) -> Self {
        self.scope.prefix_message(prefix);
        self.message = std::cell::OnceCell::new();
        self
    }

    /// Re-install this exception's error into the runtime's error slot,
    /// consuming it.
    pub fn restore(self) {
        self.scope.restore();
    }

    fn render(&self) -> String {
        let ty_name = self
            .scope
            .ty
            .as_ref()
            .map(|h| attr_name(h.get()))
            .unwrap_or_else(|| "Error".to_string());
        let value_str = self
            .scope
            .value
            .as_ref()
            .map(|h| object_str(h.get()))
            .unwrap_or_default();
        format!("{}: {}", ty_name, value_str)
    }
}

fn attr_name(ty: *mut ffi::PyObject) -> String {
    unsafe {
        let name = ffi::PyObject_GetAttrString(ty, c_str(b"__name__\0"));
        if name.is_null() {
            ffi::PyErr_Clear();
            return String::from("Error");
        }
        let mut size: ffi::Py_ssize_t = 0;
        let data = ffi::PyUnicode_AsUTF8AndSize(name, &mut size);
        let out = if data.is_null() {
            String::from("Error")
        } else {
            let slice = std::slice::from_raw_parts(data as *const u8, size as usize);
            String::from_utf8_lossy(slice).into_owned()
        };
        ffi::Py_DecRef(name);
        out
    }
}

fn c_str(bytes: &[u8]) -> *const std::os::raw::c_char {
    bytes.as_ptr() as *const std::os::raw::c_char
}

impl fmt::Debug for ErrorException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorException")
            .field("message", &self.message.get_or_init(|| self.render()))
            .finish()
    }
}

impl fmt::Display for ErrorException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message.get_or_init(|| self.render()))
    }
}

impl std::error::Error for ErrorException {}

/// Raise a `TypeError` in the runtime and return the corresponding host
/// error. Precondition: no runtime error is currently set.
pub fn raise_type_error(message: impl Into<String>) -> Error {
    raise(unsafe { exc_type_error() }, message.into())
}

pub fn raise_value_error(message: impl Into<String>) -> Error {
    raise(unsafe { exc_value_error() }, message.into())
}

pub fn raise_assertion_error(message: impl Into<String>) -> Error {
    raise(unsafe { exc_assertion_error() }, message.into())
}

pub fn raise_system_error(message: impl Into<String>) -> Error {
    raise(unsafe { exc_system_error() }, message.into())
}

pub fn raise_runtime_error(message: impl Into<String>) -> Error {
    raise(unsafe { exc_runtime_error() }, message.into())
}

fn raise(exc: *mut ffi::PyObject, message: String) -> Error {
    assert!(!is_error_set(), "raise_*: a runtime error is already set");
    unsafe {
        let msg = std::ffi::CString::new(message.clone()).unwrap_or_default();
        ffi::PyErr_SetString(exc, msg.as_ptr());
    }
    Error::Exception(ErrorException::capture())
}

unsafe fn exc_type_error() -> *mut ffi::PyObject {
    ffi::PyExc_TypeError
}
unsafe fn exc_value_error() -> *mut ffi::PyObject {
    ffi::PyExc_ValueError
}
unsafe fn exc_assertion_error() -> *mut ffi::PyObject {
    ffi::PyExc_AssertionError
}
unsafe fn exc_system_error() -> *mut ffi::PyObject {
    ffi::PyExc_SystemError
}
unsafe fn exc_runtime_error() -> *mut ffi::PyObject {
    ffi::PyExc_RuntimeError
}

/// Run `body` inside the exception translator used at every trampoline
/// boundary: an `ErrorException` restores the scope and yields `None`; a
/// "logic error" class of host error (here, `Error::AssertionError` and
/// `Error::InvalidArgument`) becomes `AssertionError`; anything else becomes
/// `SystemError`. Returns `Some(r)` on success, `None` on failure, with the
/// runtime error slot set in the failure case -- the caller substitutes the
/// ABI's sentinel value (null pointer or -1) for `None`.
pub fn translate<R>(body: impl FnOnce() -> Result<R, Error>) -> Option<R> {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(body));
    match result {
        Ok(Ok(r)) => {
            debug_assert!(!is_error_set());
            Some(r)
        }
        Ok(Err(Error::Exception(e))) => {
            e.restore();
            debug_assert!(is_error_set());
            None
        }
        Ok(Err(Error::AssertionError(msg))) | Ok(Err(Error::InvalidArgument(msg @ _))) => {
            let _ = raise_assertion_error(msg.to_string());
            None
        }
        Ok(Err(other)) => {
            let _ = raise_system_error(other.to_string());
            None
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown error.".to_string());
            let _ = raise_system_error(msg);
            None
        }
    }
}

/// Attach `prefix` to `err`, preserving the exception's type, cause,
/// context, and traceback when it carries one. The argument binder uses
/// this to layer `argument '<name>': ` then `function '<name>': ` onto the
/// same exception rather than replacing it.
pub fn prefix_error(err: Error, prefix: &str) -> Error {
    match err {
        Error::Exception(e) => Error::Exception(e.prefix_message(prefix)),
        Error::AssertionError(m) => Error::AssertionError(format!("{}: {}", prefix, m)),
        Error::RuntimeError(m) => Error::RuntimeError(format!("{}: {}", prefix, m)),
        Error::InvalidArgument(m) => Error::RuntimeError(format!("{}: {}", prefix, m)),
        Error::Internal(e) => Error::Internal(e.context(prefix.to_string())),
    }
}

#[cfg(test)]
mod tests {
    // `ErrorScope`/`translate` require a live interpreter to exercise
    // against real `PyErr_*` state; see
    // `pybind-runtime/tests/error_translation.rs` for the S3 scenario.
}
