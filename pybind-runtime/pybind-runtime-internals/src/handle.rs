//! Owning/borrowing references to runtime objects.
//!
//! A [`Handle`] owns at most one reference to a runtime object: destruction
//! releases exactly one reference if the handle is holding one, move leaves
//! the source empty, and copy increments the count. Every acquisition of a
//! `Handle` from a raw pointer must name its convention explicitly via
//! [`steal`] or [`borrow`] -- there is deliberately no `From<*mut PyObject>`
//! impl, since that would hide which convention applies.

use std::ptr::NonNull;

use pyo3_ffi as ffi;

/// An owning or empty reference to a runtime object.
///
/// States: *empty* (no reference) or *holding* (one counted reference).
pub struct Handle {
    ptr: Option<NonNull<ffi::PyObject>>,
}

impl Handle {
    /// Construct an empty handle.
    pub fn empty() -> Self {
        Handle { ptr: None }
    }

    /// Whether this handle currently holds a reference.
    pub fn valid(&self) -> bool {
        self.ptr.is_some()
    }

    /// Get the raw pointer. Precondition: holding.
    pub fn get(&self) -> *mut ffi::PyObject {
        self.ptr
            .expect("Handle::get() called on an empty handle")
            .as_ptr()
    }

    /// Release the held reference without decrementing its count, leaving
    /// this handle empty. The caller takes ownership of the one reference
    /// this handle was holding.
    pub fn release(&mut self) -> *mut ffi::PyObject {
        let ptr = self
            .ptr
            .take()
            .expect("Handle::release() called on an empty handle");
        ptr.as_ptr()
    }

    /// Release the prior reference (if any) and adopt `p`, which must be a
    /// non-null pointer to an already-owned reference (the *steal*
    /// convention).
    pub fn reset(&mut self, p: *mut ffi::PyObject) {
        let new = NonNull::new(p).expect("Handle::reset() called with a null pointer");
        self.decref_current();
        self.ptr = Some(new);
    }

    /// Increment the held reference's count. No-op on an empty handle.
    pub fn incref(&self) {
        if let Some(p) = self.ptr {
            unsafe { ffi::Py_IncRef(p.as_ptr()) };
        }
    }

    /// Decrement the held reference's count. No-op on an empty handle; does
    /// not transition this handle to empty (use `reset`/drop for that).
    pub fn decref(&self) {
        if let Some(p) = self.ptr {
            unsafe { ffi::Py_DecRef(p.as_ptr()) };
        }
    }

    fn decref_current(&mut self) {
        if let Some(p) = self.ptr.take() {
            unsafe { ffi::Py_DecRef(p.as_ptr()) };
        }
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        self.incref();
        Handle { ptr: self.ptr }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.decref_current();
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ptr {
            Some(p) => write!(f, "Handle({:p})", p.as_ptr()),
            None => write!(f, "Handle(empty)"),
        }
    }
}

/// Construct a `Handle` that adopts an already-incremented reference, as
/// returned by most of the runtime's own ABI functions (e.g. `PyObject_GetAttr`,
/// `PyNumber_Add`). Asserts `p` is non-null.
pub fn steal(p: *mut ffi::PyObject) -> Handle {
    let ptr = NonNull::new(p).expect("steal() called with a null pointer");
    Handle { ptr: Some(ptr) }
}

/// Construct a `Handle` from a non-owning pointer, incrementing its count.
/// Use this for borrowed references, such as `self` in a trampoline or a
/// pointer returned by `PyTuple_GetItem`. Asserts `p` is non-null.
pub fn borrow(p: *mut ffi::PyObject) -> Handle {
    let ptr = NonNull::new(p).expect("borrow() called with a null pointer");
    unsafe { ffi::Py_IncRef(ptr.as_ptr()) };
    Handle { ptr: Some(ptr) }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests exercise the refcount bookkeeping against fabricated
    // reference counts rather than a live interpreter (no interpreter is
    // initialized in this crate's unit tests; see the `tests/` directory for
    // interpreter-backed integration tests).

    fn make_object(initial_refcount: isize) -> *mut ffi::PyObject {
        // Building a dummy `PyObject` with a controlled refcount field is
        // only sound for a type whose header layout we don't rely on beyond
        // `ob_refcnt`; used here purely to drive `Handle`'s arithmetic.
        let boxed = Box::new(ffi::PyObject {
            ob_refcnt: initial_refcount as ffi::Py_ssize_t,
            ob_type: std::ptr::null_mut(),
        });
        Box::into_raw(boxed)
    }

    fn refcount(p: *mut ffi::PyObject) -> isize {
        unsafe { (*p).ob_refcnt as isize }
    }

    #[test]
    fn steal_then_drop_decrements_once() {
        let p = make_object(1);
        {
            let h = steal(p);
            assert!(h.valid());
            assert_eq!(refcount(p), 1);
        }
        assert_eq!(refcount(p), 0);
        unsafe { drop(Box::from_raw(p)) };
    }

    #[test]
    fn borrow_then_drop_is_a_wash() {
        let p = make_object(1);
        {
            let h = borrow(p);
            assert_eq!(refcount(p), 2);
            drop(h);
        }
        assert_eq!(refcount(p), 1);
        unsafe { drop(Box::from_raw(p)) };
    }

    #[test]
    fn clone_increments_move_does_not() {
        let p = make_object(1);
        let h1 = steal(p);
        let h2 = h1.clone();
        assert_eq!(refcount(p), 2);
        let h3 = h1; // move, no refcount change
        assert_eq!(refcount(p), 2);
        drop(h3);
        assert_eq!(refcount(p), 1);
        drop(h2);
        assert_eq!(refcount(p), 0);
        unsafe { drop(Box::from_raw(p)) };
    }

    #[test]
    fn release_does_not_decrement() {
        let p = make_object(1);
        let mut h = steal(p);
        let released = h.release();
        assert_eq!(released, p);
        assert!(!h.valid());
        assert_eq!(refcount(p), 1);
        unsafe { drop(Box::from_raw(p)) };
    }
}
