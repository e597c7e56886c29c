//! Function binding: the full `f(a, b=2, c=3)` positional/keyword/default
//! binding table, plus the `#[host_fn]` macro path for all-required
//! parameters. Defaults aren't expressible through a plain Rust function
//! signature, so this fixture binds `HostFn` by hand against
//! `params::bind3` with `Param::with_default` rather than going through
//! `#[host_fn]` (which only ever produces required parameters -- see
//! `host_fn_required_params` below for the macro-driven path).

use pybind_runtime::internals::error::Error;
use pybind_runtime::internals::object::mapping::Dict;
use pybind_runtime::internals::params::{bind3, Param};
use pybind_runtime::internals::trampoline::HostFn;
use pybind_runtime::{host_fn, module_, Config, Convert, Interpreter, Object};
use serial_test::serial;

struct FHost;

impl HostFn for FHost {
    fn call(posargs: &[Object], kwargs: Option<&Dict>) -> Result<Option<Object>, Error> {
        let (a, b, c) = bind3::<i64, i64, i64>(
            "function 'f'",
            (
                &Param::new("a"),
                &Param::with_default("b", || 2i64),
                &Param::with_default("c", || 3i64),
            ),
            posargs,
            kwargs,
        )?;
        Ok(Some(Object::new(&(a + b + c))))
    }
}

fn with_f(body: impl FnOnce(&Interpreter)) {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let module = module_("fn_binding_fixture").expect("module creation should succeed");
    module.def::<FHost>("f").expect("def should succeed");
    let module = module.build();
    interp
        .globals()
        .set_item(
            &Object::new(&"f".to_string()),
            &module.as_object().get_attr("f").expect("attr lookup should succeed"),
        )
        .expect("installing f into globals should succeed");
    body(&interp);
}

#[test]
#[serial]
fn positional_keyword_and_default_binding_table() {
    with_f(|interp| {
        let call = |expr: &str| -> i64 { i64::extract(interp.eval(expr).expect("call should succeed").handle()).unwrap() };
        assert_eq!(call("f(1)"), 6);
        assert_eq!(call("f(1, 3)"), 7);
        assert_eq!(call("f(1, 3, 4)"), 8);
        assert_eq!(call("f(1, c=4)"), 7);

        let err = |expr: &str| -> String { interp.eval(expr).unwrap_err().to_string() };
        assert!(err("f()").contains("function 'f': missing argument 'a'"));
        assert!(err("f(1, 2, 3, 4)").contains("function 'f': function takes at most 3 arguments (4 given)"));
        assert!(err("f(1, 2, d=3)").contains("function 'f': unexpected argument 'd'"));
        assert!(err("f(1, 2, b=3)").contains("function 'f': duplicate argument 'b'"));
    });
}

/// Covers the `#[host_fn]` macro path itself (all-required parameters,
/// positional and keyword), complementing the hand-bound defaults fixture
/// above.
#[host_fn]
fn g(a: i64, b: i64, c: i64) -> i64 {
    a + b + c
}

#[test]
#[serial]
fn host_fn_required_params() {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let module = module_("host_fn_fixture").expect("module creation should succeed");
    module.def::<g_host>("g").expect("def should succeed");
    let module = module.build();
    interp
        .globals()
        .set_item(
            &Object::new(&"g".to_string()),
            &module.as_object().get_attr("g").expect("attr lookup should succeed"),
        )
        .expect("installing g into globals should succeed");

    let r = interp.eval("g(1, c=3, b=2)").expect("call should succeed");
    assert_eq!(i64::extract(r.handle()).unwrap(), 6);

    let err = interp.eval("g(1)").unwrap_err();
    assert!(err.to_string().contains("function 'g': missing argument 'b'"));
}
