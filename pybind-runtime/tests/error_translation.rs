//! Exception translation at the trampoline boundary: an `Error::Exception`
//! restores the captured runtime error unchanged,
//! `AssertionError`/`InvalidArgument` become `AssertionError`, everything
//! else becomes `SystemError`, and a panic that isn't a string payload
//! renders as `SystemError: unknown error.`. Also covers the no-init
//! `TypeError` a class raises when no `def_init` was ever called.

use pybind_runtime::internals::error::Error;
use pybind_runtime::internals::object::mapping::Dict;
use pybind_runtime::internals::trampoline::HostFn;
use pybind_runtime::{destructor_for, module_, Config, Interpreter, Object};
use serial_test::serial;

struct RaisesAttributeError;
impl HostFn for RaisesAttributeError {
    fn call(_posargs: &[Object], _kwargs: Option<&Dict>) -> Result<Option<Object>, Error> {
        // Propagates as `Error::Exception`, captured by `?` from a runtime
        // call that already failed -- the translator must restore this
        // unchanged rather than relabeling it.
        Object::new(&1i64).get_attr("does_not_exist")?;
        unreachable!()
    }
}

struct RaisesAssertionError;
impl HostFn for RaisesAssertionError {
    fn call(_posargs: &[Object], _kwargs: Option<&Dict>) -> Result<Option<Object>, Error> {
        Err(Error::AssertionError("index out of bounds".to_string()))
    }
}

struct RaisesInvalidArgument;
impl HostFn for RaisesInvalidArgument {
    fn call(_posargs: &[Object], _kwargs: Option<&Dict>) -> Result<Option<Object>, Error> {
        Err(Error::InvalidArgument("bad argument"))
    }
}

struct RaisesRuntimeError;
impl HostFn for RaisesRuntimeError {
    fn call(_posargs: &[Object], _kwargs: Option<&Dict>) -> Result<Option<Object>, Error> {
        Err(Error::RuntimeError("pool exhausted".to_string()))
    }
}

struct PanicsWithMessage;
impl HostFn for PanicsWithMessage {
    fn call(_posargs: &[Object], _kwargs: Option<&Dict>) -> Result<Option<Object>, Error> {
        panic!("did not expect this");
    }
}

struct PanicsWithoutMessage;
impl HostFn for PanicsWithoutMessage {
    fn call(_posargs: &[Object], _kwargs: Option<&Dict>) -> Result<Option<Object>, Error> {
        std::panic::panic_any(42i32);
    }
}

struct Unconstructible;

fn with_fixture(body: impl FnOnce(&Interpreter, &Object)) {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let module = module_("error_translation_fixture").expect("module creation should succeed");
    module.def::<RaisesAttributeError>("raises_attribute_error").expect("def should succeed");
    module.def::<RaisesAssertionError>("raises_assertion_error").expect("def should succeed");
    module.def::<RaisesInvalidArgument>("raises_invalid_argument").expect("def should succeed");
    module.def::<RaisesRuntimeError>("raises_runtime_error").expect("def should succeed");
    module.def::<PanicsWithMessage>("panics_with_message").expect("def should succeed");
    module.def::<PanicsWithoutMessage>("panics_without_message").expect("def should succeed");
    module
        .class::<Unconstructible>("Unconstructible", destructor_for::<Unconstructible>(), None)
        .expect("class registration should succeed");
    let module = module.build();
    interp
        .globals()
        .set_item(&Object::new(&"m".to_string()), module.as_object())
        .expect("installing module into globals should succeed");
    body(&interp, module.as_object());
}

#[test]
#[serial]
fn runtime_exception_passes_through_unchanged() {
    with_fixture(|interp, _m| {
        let err = interp.eval("m.raises_attribute_error()").unwrap_err();
        assert!(err.to_string().contains("AttributeError"));
        assert!(err.to_string().contains("does_not_exist"));
    });
}

#[test]
#[serial]
fn assertion_error_and_invalid_argument_become_assertion_error() {
    with_fixture(|interp, _m| {
        let err = interp.eval("m.raises_assertion_error()").unwrap_err();
        assert!(err.to_string().starts_with("AssertionError"));
        assert!(err.to_string().contains("index out of bounds"));

        let err = interp.eval("m.raises_invalid_argument()").unwrap_err();
        assert!(err.to_string().starts_with("AssertionError"));
        assert!(err.to_string().contains("bad argument"));
    });
}

#[test]
#[serial]
fn other_host_errors_become_system_error() {
    with_fixture(|interp, _m| {
        let err = interp.eval("m.raises_runtime_error()").unwrap_err();
        assert!(err.to_string().starts_with("SystemError"));
        assert!(err.to_string().contains("pool exhausted"));
    });
}

#[test]
#[serial]
fn panic_with_string_payload_carries_its_message() {
    with_fixture(|interp, _m| {
        let err = interp.eval("m.panics_with_message()").unwrap_err();
        assert!(err.to_string().starts_with("SystemError"));
        assert!(err.to_string().contains("did not expect this"));
    });
}

#[test]
#[serial]
fn panic_without_string_payload_is_unknown_error() {
    with_fixture(|interp, _m| {
        let err = interp.eval("m.panics_without_message()").unwrap_err();
        assert_eq!(err.to_string(), "SystemError: unknown error.");
    });
}

#[test]
#[serial]
fn no_init_class_raises_cannot_create_instances() {
    with_fixture(|interp, _m| {
        let err = interp.eval("m.Unconstructible()").unwrap_err();
        assert!(
            err.to_string().contains("cannot create 'Unconstructible' instances"),
            "unexpected message: {}",
            err
        );
    });
}
