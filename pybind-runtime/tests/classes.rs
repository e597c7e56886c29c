//! Heap-type classes: parented instance refcounting and heap-type reverse
//! lookup, exercising `module_`/`class`/`def_init`/`def`/`prop` together.

use pybind_runtime::internals::class_registry;
use pybind_runtime::internals::error::Error;
use pybind_runtime::internals::object::mapping::Dict;
use pybind_runtime::internals::object::sequence::List;
use pybind_runtime::internals::params::bind2;
use pybind_runtime::internals::trampoline::{HostInit, HostMethod, HostProperty};
use pybind_runtime::{destructor_for, module_, Config, Convert, Interpreter, Object, Param};
use pyo3_ffi as ffi;
use serial_test::serial;

fn install(interp: &Interpreter, name: &str, obj: &Object) {
    interp
        .globals()
        .set_item(&Object::new(&name.to_string()), obj)
        .expect("installing into globals should succeed");
}

struct Child {
    parent: Object,
    label: i64,
}

fn child_parent(c: &Child) -> Object {
    c.parent.clone()
}

struct ChildInit;
impl HostInit<Child> for ChildInit {
    fn call(posargs: &[Object], kwargs: Option<&Dict>) -> Result<Child, Error> {
        let (parent, label) = bind2::<Object, i64>(
            "__init__",
            (&Param::new("parent"), &Param::new("label")),
            posargs,
            kwargs,
        )?;
        Ok(Child { parent, label })
    }
}

struct LabelProperty;
impl HostProperty<Child> for LabelProperty {
    fn get(instance: &Child) -> Result<Object, Error> {
        Ok(Object::new(&instance.label))
    }
}

/// Returns the runtime object for `self`, round-tripped through the heap
/// type's reverse lookup (`HeapType::instance_of`) rather than the raw
/// `self_` pointer the trampoline already has -- exercising the path a
/// method trampoline uses to hand `self` back into a script.
struct SelfRefMethod;
impl HostMethod<Child> for SelfRefMethod {
    fn call(instance: &Child, _posargs: &[Object], _kwargs: Option<&Dict>) -> Result<Option<Object>, Error> {
        let heap_type = class_registry::find::<Child>()?;
        Ok(Some(heap_type.instance_of(instance)))
    }
}

fn refcount(obj: &Object) -> isize {
    unsafe { ffi::Py_REFCNT(obj.as_ptr()) as isize }
}

#[test]
#[serial]
fn parented_instance_refcount_rises_and_falls() {
    let _interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let module = module_("parented_fixture").expect("module creation should succeed");
    let class = module
        .class::<Child>("Child", destructor_for::<Child>(), Some(child_parent))
        .expect("class registration should succeed");
    class.def_init::<ChildInit>().expect("def_init should succeed");
    class.prop::<LabelProperty>("label", false).expect("prop should succeed");
    class.def::<SelfRefMethod>("self_ref").expect("def should succeed");
    let _module = module.build();

    let parent = List::new().expect("list construction should succeed");
    let parent_obj = parent.as_object().clone();
    let before = refcount(&parent_obj);

    let instance = class.heap_type().create(Child {
        parent: parent_obj.clone(),
        label: 5,
    });
    assert_eq!(
        refcount(&parent_obj),
        before + 1,
        "constructing a parented instance should incref the parent once"
    );

    let label = instance.get_attr("label").expect("property read should succeed");
    assert_eq!(i64::extract(label.handle()).unwrap(), 5);

    // The instance pointer recovered from the embedded value by
    // `instance_of` is the same runtime object as `instance` itself.
    let self_ref = instance.get_attr("self_ref").expect("method lookup should succeed");
    let returned = self_ref.call0().expect("method call should succeed");
    assert!(returned.is(&instance), "instance_of should recover the same object");

    drop(instance);
    assert_eq!(
        refcount(&parent_obj),
        before,
        "destroying the instance should decref the parent back to its original count"
    );
}

/// Constructs a `Child` from a script rather than directly via
/// `HeapType::create`, exercising the `__init__` trampoline end to end
/// (the path `parented_instance_refcount_rises_and_falls` sidesteps by
/// calling `create` straight from host code).
#[test]
#[serial]
fn init_trampoline_constructs_and_refcounts() {
    let interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let module = module_("script_fixture").expect("module creation should succeed");
    let class = module
        .class::<Child>("Child", destructor_for::<Child>(), Some(child_parent))
        .expect("class registration should succeed");
    class.def_init::<ChildInit>().expect("def_init should succeed");
    class.prop::<LabelProperty>("label", false).expect("prop should succeed");
    let module = module.build();
    install(&interp, "Child", module.as_object().get_attr("Child").as_ref().unwrap());

    let parent = List::new().expect("list construction should succeed");
    let parent_obj = parent.as_object().clone();
    install(&interp, "parent", &parent_obj);
    let before = refcount(&parent_obj);

    let instance = interp.eval("Child(parent, 7)").expect("construction via script should succeed");
    assert_eq!(refcount(&parent_obj), before + 1);
    let label = instance.get_attr("label").expect("property read should succeed");
    assert_eq!(i64::extract(label.handle()).unwrap(), 7);

    drop(instance);
    assert_eq!(refcount(&parent_obj), before);
}

#[test]
#[serial]
fn unparented_instance_does_not_touch_unrelated_refcounts() {
    let _interp = Interpreter::new(Config::new()).expect("interpreter should initialize");
    let module = module_("unparented_fixture").expect("module creation should succeed");
    let class = module
        .class::<Child>("Child", destructor_for::<Child>(), None)
        .expect("class registration should succeed");
    class.def_init::<ChildInit>().expect("def_init should succeed");
    let _module = module.build();

    let parent = List::new().expect("list construction should succeed");
    let parent_obj = parent.as_object().clone();
    let before = refcount(&parent_obj);

    let instance = class.heap_type().create(Child {
        parent: parent_obj.clone(),
        label: 1,
    });
    assert_eq!(refcount(&parent_obj), before, "no parent accessor means no incref");
    drop(instance);
    assert_eq!(refcount(&parent_obj), before);
}
