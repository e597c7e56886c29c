//! Object conversion, number evaluation, and dict iteration: arithmetic
//! through the interpreter, primitive round-trips, and dict ordering.

use pybind_runtime::object::Dict;
use pybind_runtime::{Config, Convert, Interpreter, Object};
use serial_test::serial;

fn interpreter() -> Interpreter {
    Interpreter::new(Config::new()).expect("interpreter should initialize")
}

#[test]
#[serial]
fn number_conversion_through_eval() {
    let interp = interpreter();

    let three = interp.eval("1 + 2").expect("eval should succeed");
    assert_eq!(i64::extract(three.handle()).unwrap(), 3);

    let err = interp.eval("'abc' - 1").unwrap_err();
    assert!(
        err.to_string().contains("unsupported operand type(s) for -: 'str' and 'int'"),
        "unexpected error message: {}",
        err
    );
}

#[test]
#[serial]
fn conversion_round_trip_primitives() {
    let _interp = interpreter();

    assert_eq!(i64::extract(&Object::new(&42i64).handle().clone()).unwrap(), 42);
    assert!((f64::extract(&Object::new(&1.5f64).handle().clone()).unwrap() - 1.5).abs() < f64::EPSILON);
    assert_eq!(bool::extract(&Object::new(&true).handle().clone()).unwrap(), true);
    assert_eq!(
        String::extract(&Object::new(&"hello".to_string()).handle().clone()).unwrap(),
        "hello"
    );
}

#[test]
#[serial]
fn dict_iteration_preserves_insertion_order() {
    let _interp = interpreter();

    let dict = Dict::from_pairs(&[
        (Object::new(&"a".to_string()), Object::new(&1i64)),
        (Object::new(&"b".to_string()), Object::new(&2i64)),
    ])
    .expect("dict construction should succeed");

    let mut seen: Vec<(String, i64)> = Vec::new();
    dict.for_each(|k, v| {
        seen.push((
            String::extract(k.handle()).unwrap(),
            i64::extract(v.handle()).unwrap(),
        ));
        Ok(())
    })
    .unwrap();
    assert_eq!(seen, vec![("a".to_string(), 1), ("b".to_string(), 2)]);

    dict.update_pairs(&[
        (Object::new(&"b".to_string()), Object::new(&3i64)),
        (Object::new(&"c".to_string()), Object::new(&4i64)),
    ])
    .unwrap();

    let mut after: Vec<(String, i64)> = Vec::new();
    dict.for_each(|k, v| {
        after.push((
            String::extract(k.handle()).unwrap(),
            i64::extract(v.handle()).unwrap(),
        ));
        Ok(())
    })
    .unwrap();
    assert_eq!(
        after,
        vec![("a".to_string(), 1), ("b".to_string(), 3), ("c".to_string(), 4)]
    );
}
