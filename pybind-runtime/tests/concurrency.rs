//! GIL release/acquire scopes: releasing around CPU-bound host work must
//! not strand the runtime, and a worker thread must be able to acquire
//! the lock independently and hand it back.

use pybind_runtime::internals::gil::{acquire, release};
use pybind_runtime::{Config, Convert, Interpreter};
use pyo3_ffi as ffi;
use serial_test::serial;

#[test]
#[serial]
fn release_then_reacquire_allows_further_calls() {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    unsafe {
        release(|| {
            std::thread::sleep(std::time::Duration::from_millis(1));
        });
    }
    let v = interp.eval("1 + 1").expect("eval after release/reacquire should succeed");
    assert_eq!(i64::extract(v.handle()).unwrap(), 2);
}

#[test]
#[serial]
fn worker_thread_acquires_independently_while_main_has_released() {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let handle = unsafe {
        release(|| {
            std::thread::spawn(|| unsafe {
                acquire(|| {
                    let none = ffi::Py_None();
                    ffi::Py_IncRef(none);
                    ffi::Py_DecRef(none);
                });
            })
        })
    };
    handle.join().expect("worker thread should not panic");

    let v = interp.eval("40 + 2").expect("main thread should still control the interpreter");
    assert_eq!(i64::extract(v.handle()).unwrap(), 42);
}
