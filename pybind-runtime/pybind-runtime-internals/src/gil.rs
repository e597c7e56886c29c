//! GIL release/acquire scopes: a single-threaded cooperative scheduling
//! model with a global interpreter lock held by the executing thread. Every
//! ABI call must occur while the lock is held; these two RAII scopes are
//! the only sanctioned way to cross that boundary.

use pyo3_ffi as ffi;

/// Release the lock for the duration of the scope, invoked from a
/// lock-holding thread surrounding CPU-bound host work that touches no
/// Handle or façade. Re-acquires on drop.
///
/// # Safety
/// The calling thread must currently hold the lock (i.e. be running inside
/// the interpreter's call chain, or inside an [`AcquireScope`]). No Handle
/// or façade may be touched until the scope is dropped.
pub struct ReleaseScope {
    state: *mut ffi::PyThreadState,
}

impl ReleaseScope {
    pub unsafe fn new() -> Self {
        let state = ffi::PyEval_SaveThread();
        ReleaseScope { state }
    }
}

impl Drop for ReleaseScope {
    fn drop(&mut self) {
        unsafe { ffi::PyEval_RestoreThread(self.state) };
    }
}

/// Acquire the lock for the duration of the scope, invoked from a thread
/// that does not currently hold it (e.g. a host-spawned worker thread).
/// Releases on drop.
///
/// # Safety
/// The calling thread must not already hold the lock.
pub struct AcquireScope {
    gstate: ffi::PyGILState_STATE,
}

impl AcquireScope {
    pub unsafe fn new() -> Self {
        let gstate = ffi::PyGILState_Ensure();
        AcquireScope { gstate }
    }
}

impl Drop for AcquireScope {
    fn drop(&mut self) {
        unsafe { ffi::PyGILState_Release(self.gstate) };
    }
}

/// Run `body` with the lock released, re-acquiring it once `body` returns
/// (or panics). Prefer this over constructing [`ReleaseScope`] directly.
///
/// # Safety
/// See [`ReleaseScope::new`].
pub unsafe fn release<R>(body: impl FnOnce() -> R) -> R {
    let _scope = ReleaseScope::new();
    body()
}

/// Run `body` with the lock acquired, releasing it once `body` returns (or
/// panics). Prefer this over constructing [`AcquireScope`] directly.
///
/// # Safety
/// See [`AcquireScope::new`].
pub unsafe fn acquire<R>(body: impl FnOnce() -> R) -> R {
    let _scope = AcquireScope::new();
    body()
}

#[cfg(test)]
mod tests {
    // Exercising these scopes requires a live interpreter with a real
    // thread state to save/restore; see `pybind-runtime/tests/concurrency.rs`.
}
