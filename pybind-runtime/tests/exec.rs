//! `exec_file` failure modes: a missing file is a host-level error raised
//! before any script ever runs, while a script that fails
//! during execution (e.g. an unresolved import) prints to stderr and
//! returns `false` rather than raising.

use pybind_runtime::{Config, Convert, Interpreter};
use serial_test::serial;
use std::io::Write;

#[test]
#[serial]
fn missing_file_is_a_host_error() {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let result = interp.exec_file("this/path/does/not/exist.py");
    assert!(result.is_err(), "opening a nonexistent file should fail before execution");
}

#[test]
#[serial]
fn failing_script_returns_false_without_raising() {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let mut file = tempfile::NamedTempFile::new().expect("temp file creation should succeed");
    writeln!(file, "import does_not_exist_anywhere").expect("write should succeed");
    let path = file.path().to_str().unwrap().to_string();

    let result = interp.exec_file(&path).expect("exec_file itself should not raise");
    assert!(!result, "a script that fails at runtime should report false, not raise");
}

#[test]
#[serial]
fn successful_script_returns_true_and_runs() {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let mut file = tempfile::NamedTempFile::new().expect("temp file creation should succeed");
    writeln!(file, "marker = 1 + 1").expect("write should succeed");
    let path = file.path().to_str().unwrap().to_string();

    let result = interp.exec_file(&path).expect("exec_file should succeed");
    assert!(result);
    let marker = interp.eval("marker").expect("marker should be visible in globals");
    assert_eq!(i64::extract(marker.handle()).unwrap(), 2);
}
